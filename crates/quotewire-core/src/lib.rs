//! Relay logic for Quotewire.
//!
//! Everything with real state-machine content lives here: session
//! identity derivation, reply sanitization, the ingest/query semantics
//! (`RelayService`), the poll cursor and cadence, and the per-turn
//! polling state machine. Storage and HTTP concerns are behind the
//! traits in [`store`] and [`feed`]; concrete implementations live in
//! `quotewire-infra`.

pub mod cadence;
pub mod cursor;
pub mod feed;
pub mod relay;
pub mod sanitize;
pub mod session;
pub mod store;
pub mod turn;
