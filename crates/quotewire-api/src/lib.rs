//! Library surface of the `qwire` binary.
//!
//! Exposed so integration tests can build the router against an
//! in-process store without spawning the server.

pub mod cli;
pub mod http;
pub mod state;
