//! Request handlers for the relay endpoints.

pub mod ingest;
pub mod query;
