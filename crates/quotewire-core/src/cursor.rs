//! Poll cursor: the `since`/`seenIds` discipline.
//!
//! The query endpoint delivers at-least-once (inclusive `since` lower
//! bound means a row created exactly at the cursor is re-delivered);
//! the cursor's id set converts that into effectively-once rendering.
//! `last_poll_time` advances only when a poll accepted at least one
//! genuinely new message, so a reply that lands between polls can
//! never slip behind the cursor.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use quotewire_types::message::Message;

/// Client-held poll state. Not persisted.
#[derive(Debug, Clone)]
pub struct PollCursor {
    last_poll_time: DateTime<Utc>,
    seen: HashSet<String>,
}

impl PollCursor {
    /// Start a cursor at the given instant (session creation time).
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            last_poll_time: start,
            seen: HashSet::new(),
        }
    }

    /// The `since` value for the next poll.
    pub fn since(&self) -> DateTime<Utc> {
        self.last_poll_time
    }

    /// Whether a message id has already been accepted.
    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Merge a poll result: returns the genuinely new messages, records
    /// their ids, and advances the cursor to `now` only when at least
    /// one was new. An all-duplicates (or empty) response leaves the
    /// cursor untouched.
    pub fn accept(&mut self, polled: Vec<Message>, now: DateTime<Utc>) -> Vec<Message> {
        let fresh: Vec<Message> = polled
            .into_iter()
            .filter(|m| !self.seen.contains(&m.id))
            .collect();

        if !fresh.is_empty() {
            for msg in &fresh {
                self.seen.insert(msg.id.clone());
            }
            debug_assert!(now >= self.last_poll_time);
            self.last_poll_time = now;
        }

        fresh
    }

    /// Mark a locally-appended message (e.g. the user's own) as seen so
    /// it can never be re-rendered if it ever shows up in a poll.
    pub fn mark_seen(&mut self, id: impl Into<String>) {
        self.seen.insert(id.into());
    }
}
