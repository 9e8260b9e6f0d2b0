//! In-memory message store.
//!
//! Backs `qwire serve --memory` (demo deployments with no durable
//! store) and the integration tests. Same contract as the REST store:
//! server-assigned ids, inclusive `since` lower bound, ascending
//! order, bounded page size.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use quotewire_core::store::MessageStore;
use quotewire_types::error::StoreError;
use quotewire_types::message::{Message, NewMessage, Sender};

#[derive(Default)]
pub struct MemoryMessageStore {
    rows: DashMap<String, Vec<Message>>,
    next_id: AtomicU64,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl MessageStore for MemoryMessageStore {
    async fn insert(&self, msg: &NewMessage) -> Result<Message, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stored = Message {
            id: id.to_string(),
            text: msg.text.clone(),
            sender: msg.sender,
            timestamp: msg.created_at.unwrap_or_else(Utc::now),
            session_id: msg.session_id.clone(),
            status: None,
        };
        self.rows
            .entry(msg.session_id.clone())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn replies_since(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Message>, StoreError> {
        let mut rows: Vec<Message> = match self.rows.get(session_id) {
            Some(entry) => entry
                .iter()
                .filter(|m| m.sender == Sender::Ai && m.timestamp >= since)
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_msg(session: &str, text: &str, at: Option<DateTime<Utc>>) -> NewMessage {
        NewMessage {
            session_id: session.to_string(),
            text: text.to_string(),
            sender: Sender::Ai,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn assigns_monotonic_ids() {
        let store = MemoryMessageStore::new();
        let a = store.insert(&new_msg("quote_session_1", "a", None)).await.unwrap();
        let b = store.insert(&new_msg("quote_session_1", "b", None)).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn filters_by_session_and_since_inclusive() {
        let store = MemoryMessageStore::new();
        let ts: DateTime<Utc> = "2025-08-23T10:00:00Z".parse().unwrap();
        store
            .insert(&new_msg("quote_session_1", "boundary", Some(ts)))
            .await
            .unwrap();
        store
            .insert(&new_msg(
                "quote_session_1",
                "earlier",
                Some(ts - chrono::Duration::seconds(1)),
            ))
            .await
            .unwrap();
        store
            .insert(&new_msg("quote_session_2", "other session", Some(ts)))
            .await
            .unwrap();

        let rows = store.replies_since("quote_session_1", ts, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text, "boundary");
    }

    #[tokio::test]
    async fn respects_page_limit_with_oldest_first() {
        let store = MemoryMessageStore::new();
        let base: DateTime<Utc> = "2025-08-23T10:00:00Z".parse().unwrap();
        for i in 0..15 {
            store
                .insert(&new_msg(
                    "quote_session_1",
                    &format!("m{i}"),
                    Some(base + chrono::Duration::seconds(i)),
                ))
                .await
                .unwrap();
        }

        let rows = store
            .replies_since("quote_session_1", DateTime::<Utc>::UNIX_EPOCH, 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].text, "m0");
        assert_eq!(rows[9].text, "m9");
    }

    #[tokio::test]
    async fn user_messages_never_surface() {
        let store = MemoryMessageStore::new();
        let mut msg = new_msg("quote_session_1", "typed by user", None);
        msg.sender = Sender::User;
        store.insert(&msg).await.unwrap();

        let rows = store
            .replies_since("quote_session_1", DateTime::<Utc>::UNIX_EPOCH, 10)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
