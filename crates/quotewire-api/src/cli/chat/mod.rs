//! Interactive terminal chat client.

pub mod banner;
pub mod commands;
pub mod input;
mod loop_runner;

pub use loop_runner::run_chat;
