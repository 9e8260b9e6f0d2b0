//! Infrastructure implementations for Quotewire.
//!
//! Concrete backends for the trait seams in `quotewire-core`: the REST
//! message store client, an in-memory store for dev/test deployments,
//! the bounded DashMap fallback cache, the outbound webhook dispatcher,
//! and the HTTP reply feed used by the terminal client. Plus the TOML
//! config loader.

pub mod cache;
pub mod config;
pub mod feed;
pub mod store;
pub mod webhook;
