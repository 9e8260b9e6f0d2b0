use thiserror::Error;

/// Errors from a message store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store call exceeded its deadline.
    #[error("store call timed out")]
    Timeout,

    /// The store answered with a non-2xx status.
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The HTTP call itself failed (DNS, connect, TLS, ...).
    #[error("store transport error: {0}")]
    Transport(String),

    /// The store answered 2xx but the body was not usable.
    #[error("malformed store response: {0}")]
    Malformed(String),
}

/// Errors from dispatching an outbound event to the automation webhook.
///
/// Dispatch failure means the reply loop will never start for this
/// turn; callers must not begin polling.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("webhook returned status {0}")]
    Status(u16),

    #[error("webhook transport error: {0}")]
    Transport(String),
}

/// Errors from the client-side reply feed (the query endpoint as seen
/// by the poll loop). All variants are transient: the loop logs them
/// and keeps its schedule.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("query endpoint returned status {status}")]
    Status {
        status: u16,
        /// Server-suggested delay before the next attempt, seconds.
        retry_after: Option<u64>,
    },

    #[error("query transport error: {0}")]
    Transport(String),

    #[error("malformed query response: {0}")]
    Malformed(String),
}
