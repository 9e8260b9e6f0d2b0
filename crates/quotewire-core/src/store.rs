//! MessageStore and ReplyCache trait definitions.
//!
//! `MessageStore` is the durable tier: a table of messages filterable
//! by session, sender, and creation instant. `ReplyCache` is the
//! bounded in-process degradation path used when the store is down.
//! Implementations live in quotewire-infra. Uses native async fn in
//! traits (RPITIT, Rust 2024 edition).

use chrono::{DateTime, Utc};
use quotewire_types::error::StoreError;
use quotewire_types::message::{Message, NewMessage};

/// Durable message store.
pub trait MessageStore: Send + Sync {
    /// Persist a message and return it with its store-assigned id and
    /// creation instant filled in.
    fn insert(
        &self,
        msg: &NewMessage,
    ) -> impl std::future::Future<Output = Result<Message, StoreError>> + Send;

    /// Fetch ai replies for a session created at or after `since`,
    /// ascending by creation time, at most `limit` rows.
    ///
    /// The lower bound is inclusive: a row created exactly at `since`
    /// is returned (and re-delivery is absorbed by the client cursor).
    fn replies_since(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, StoreError>> + Send;
}

/// Bounded in-process cache of replies that failed to reach the store.
///
/// Same-process queries merge these so a store outage degrades to a
/// stale-but-live view instead of dropped replies. Explicitly not a
/// substitute for the store under multi-instance deployment.
pub trait ReplyCache: Send + Sync {
    /// Retain a message that could not be persisted.
    fn push(&self, msg: Message);

    /// Cached ai replies for a session created at or after `since`,
    /// ascending by creation time.
    fn replies_since(&self, session_id: &str, since: DateTime<Utc>) -> Vec<Message>;
}
