//! ReplyFeed trait -- the query endpoint as seen by the poll loop.
//!
//! The terminal client polls through this seam so the turn runner can
//! be exercised against an in-memory feed in tests. The HTTP
//! implementation lives in quotewire-infra.

use chrono::{DateTime, Utc};
use quotewire_types::error::FeedError;
use quotewire_types::message::Message;

/// A source of ai replies for a session, filtered by creation instant.
pub trait ReplyFeed: Send + Sync {
    fn fetch(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, FeedError>> + Send;
}
