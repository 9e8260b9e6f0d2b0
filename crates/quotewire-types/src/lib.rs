//! Shared domain types for Quotewire.
//!
//! This crate contains the types that cross the relay's seams: chat
//! messages and their wire shapes, session/user context, outbound
//! webhook events, configuration, and the error enums.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod session;
