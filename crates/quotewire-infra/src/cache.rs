//! Bounded fallback reply cache.
//!
//! Replies that fail to reach the durable store land here, keyed by
//! session id, so same-process queries can still observe them. Both
//! axes are capped: messages per session and sessions process-wide,
//! with oldest-first eviction on each. This replaces the unbounded
//! process-global list the relay originally degraded into.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use quotewire_core::store::ReplyCache;
use quotewire_types::message::Message;

pub struct DashReplyCache {
    sessions: DashMap<String, VecDeque<Message>>,
    session_order: Mutex<VecDeque<String>>,
    per_session: usize,
    max_sessions: usize,
}

impl DashReplyCache {
    pub fn new(per_session: usize, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            session_order: Mutex::new(VecDeque::new()),
            per_session,
            max_sessions,
        }
    }

    /// Number of sessions currently cached.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl ReplyCache for DashReplyCache {
    fn push(&self, msg: Message) {
        let session_id = msg.session_id.clone();

        // The entry guard must not touch the order mutex: eviction
        // below locks mutex-then-map, so the insert path stays
        // map-only to keep lock acquisition one-directional.
        let mut is_new_session = false;
        {
            let mut entry = self.sessions.entry(session_id.clone()).or_insert_with(|| {
                is_new_session = true;
                VecDeque::new()
            });
            entry.push_back(msg);
            while entry.len() > self.per_session {
                entry.pop_front();
            }
        }

        let mut order = self
            .session_order
            .lock()
            .expect("cache session order lock poisoned");
        if is_new_session {
            order.push_back(session_id);
        }
        while order.len() > self.max_sessions {
            if let Some(evicted) = order.pop_front() {
                self.sessions.remove(&evicted);
            }
        }
    }

    fn replies_since(&self, session_id: &str, since: DateTime<Utc>) -> Vec<Message> {
        let mut rows: Vec<Message> = match self.sessions.get(session_id) {
            Some(entry) => entry
                .iter()
                .filter(|m| m.timestamp >= since)
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotewire_types::message::Sender;

    fn msg(session: &str, id: &str) -> Message {
        Message {
            id: id.to_string(),
            text: format!("cached {id}"),
            sender: Sender::Ai,
            timestamp: Utc::now(),
            session_id: session.to_string(),
            status: None,
        }
    }

    #[test]
    fn caches_and_filters_by_session() {
        let cache = DashReplyCache::new(10, 10);
        cache.push(msg("quote_session_1", "a"));
        cache.push(msg("quote_session_2", "b"));

        let rows = cache.replies_since("quote_session_1", DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "a");
    }

    #[test]
    fn per_session_cap_evicts_oldest() {
        let cache = DashReplyCache::new(3, 10);
        for i in 0..5 {
            cache.push(msg("quote_session_1", &format!("m{i}")));
        }

        let rows = cache.replies_since("quote_session_1", DateTime::<Utc>::UNIX_EPOCH);
        let ids: Vec<&str> = rows.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn session_cap_evicts_oldest_session() {
        let cache = DashReplyCache::new(10, 2);
        cache.push(msg("quote_session_1", "a"));
        cache.push(msg("quote_session_2", "b"));
        cache.push(msg("quote_session_3", "c"));

        assert_eq!(cache.session_count(), 2);
        assert!(cache
            .replies_since("quote_session_1", DateTime::<Utc>::UNIX_EPOCH)
            .is_empty());
        assert_eq!(
            cache
                .replies_since("quote_session_3", DateTime::<Utc>::UNIX_EPOCH)
                .len(),
            1
        );
    }

    #[test]
    fn since_filter_is_inclusive() {
        let cache = DashReplyCache::new(10, 10);
        let mut m = msg("quote_session_1", "a");
        let ts: DateTime<Utc> = "2025-08-23T10:00:00Z".parse().unwrap();
        m.timestamp = ts;
        cache.push(m);

        assert_eq!(cache.replies_since("quote_session_1", ts).len(), 1);
        assert!(cache
            .replies_since("quote_session_1", ts + chrono::Duration::seconds(1))
            .is_empty());
    }
}
