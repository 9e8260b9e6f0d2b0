//! RelayService: ingest and query semantics over a message store.
//!
//! The service owns the parts of the ingest/query contract that are
//! independent of HTTP: sanitization, idempotent redelivery collapse,
//! fallback on store failure, the bounded store deadline, and the
//! merge of fallback-cached replies into query results.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use quotewire_types::config::{IngestConfig, QueryConfig};
use quotewire_types::error::StoreError;
use quotewire_types::message::{IngestRequest, Message, NewMessage, Sender};

use crate::sanitize::clean_reply;
use crate::store::{MessageStore, ReplyCache};

/// Which path an ingested reply took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePath {
    /// Persisted to the durable store.
    Durable,
    /// Store failed; retained in the in-process cache only.
    Fallback,
    /// Redelivery of an already-accepted idempotency token.
    Replayed,
}

/// Result of a successful ingest.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub message_id: String,
    pub path: StorePath,
}

/// Failure modes of a query, per the relay error taxonomy. Validation
/// of the session id happens before the service is reached.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The store call exceeded its deadline (retryable).
    #[error("store query timed out")]
    Timeout,

    /// The store failed (retryable with backoff). `status` is the
    /// store's own status when it answered, `None` on transport errors.
    #[error("store query failed: {details}")]
    Upstream {
        status: Option<u16>,
        details: String,
    },
}

/// Bounded registry of accepted idempotency tokens.
///
/// Keys are `<session_id>:<token>`; values are the message id assigned
/// on first delivery. Oldest entries are evicted once the cap is hit,
/// which degrades redelivery collapse back to at-least-once rather
/// than growing without bound.
struct IdempotencyRegistry {
    entries: DashMap<String, String>,
    order: Mutex<VecDeque<String>>,
    cap: usize,
}

impl IdempotencyRegistry {
    fn new(cap: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            cap,
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn record(&self, key: String, message_id: String) {
        let mut order = self.order.lock().expect("idempotency order lock poisoned");
        if self.entries.insert(key.clone(), message_id).is_none() {
            order.push_back(key);
        }
        while order.len() > self.cap {
            if let Some(evicted) = order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
    }
}

/// Ingest/query semantics, generic over the store and cache backends.
pub struct RelayService<S, C> {
    store: S,
    cache: C,
    query_limit: u32,
    query_timeout: Duration,
    max_text_chars: usize,
    tokens: IdempotencyRegistry,
}

impl<S: MessageStore, C: ReplyCache> RelayService<S, C> {
    /// Tokens retained before the oldest are evicted.
    const TOKEN_CAP: usize = 4_096;

    pub fn new(store: S, cache: C, query: &QueryConfig, ingest: &IngestConfig) -> Self {
        Self {
            store,
            cache,
            query_limit: query.limit,
            query_timeout: Duration::from_secs(query.timeout_secs),
            max_text_chars: ingest.max_text_chars,
            tokens: IdempotencyRegistry::new(Self::TOKEN_CAP),
        }
    }

    /// Accept a reply from the automation workflow.
    ///
    /// Never fails: a store outage degrades to the fallback cache so
    /// the producer sees the same acknowledgement either way. Exactly
    /// one message becomes visible to subsequent queries (durable) or
    /// to same-process queries only (fallback).
    pub async fn ingest(&self, req: &IngestRequest) -> IngestOutcome {
        let token_key = req
            .request_id
            .as_deref()
            .map(|token| format!("{}:{token}", req.session_id));

        if let Some(key) = &token_key {
            if let Some(message_id) = self.tokens.get(key) {
                warn!(
                    session_id = %req.session_id,
                    message_id = %message_id,
                    "duplicate delivery collapsed by idempotency token"
                );
                return IngestOutcome {
                    message_id,
                    path: StorePath::Replayed,
                };
            }
        }

        let text = clean_reply(req.response.as_deref().unwrap_or(""), self.max_text_chars);
        let new_msg = NewMessage {
            session_id: req.session_id.clone(),
            text,
            sender: Sender::Ai,
            created_at: req.timestamp,
        };

        let outcome = match self.store.insert(&new_msg).await {
            Ok(stored) => IngestOutcome {
                message_id: stored.id,
                path: StorePath::Durable,
            },
            Err(err) => {
                warn!(
                    session_id = %req.session_id,
                    error = %err,
                    "store insert failed, retaining reply in fallback cache"
                );
                let fallback = Message {
                    id: format!("fb_{}", Uuid::now_v7()),
                    text: new_msg.text,
                    sender: Sender::Ai,
                    timestamp: new_msg.created_at.unwrap_or_else(Utc::now),
                    session_id: new_msg.session_id,
                    status: None,
                };
                let id = fallback.id.clone();
                self.cache.push(fallback);
                IngestOutcome {
                    message_id: id,
                    path: StorePath::Fallback,
                }
            }
        };

        if let Some(key) = token_key {
            self.tokens.record(key, outcome.message_id.clone());
        }

        outcome
    }

    /// Fetch ai replies created at or after `since`, ascending.
    ///
    /// The store call runs under the configured deadline; fallback-
    /// cached replies for the session are merged into a successful
    /// result. On store failure the error stands -- the poll loop
    /// treats it as transient and keeps its schedule.
    pub async fn query(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, QueryError> {
        let fetch = self
            .store
            .replies_since(session_id, since, self.query_limit);

        let mut rows = match tokio::time::timeout(self.query_timeout, fetch).await {
            Err(_) => return Err(QueryError::Timeout),
            Ok(Err(StoreError::Timeout)) => return Err(QueryError::Timeout),
            Ok(Err(StoreError::Status { status, body })) => {
                return Err(QueryError::Upstream {
                    status: Some(status),
                    details: body,
                });
            }
            Ok(Err(err)) => {
                return Err(QueryError::Upstream {
                    status: None,
                    details: err.to_string(),
                });
            }
            Ok(Ok(rows)) => rows,
        };

        for cached in self.cache.replies_since(session_id, since) {
            if !rows.iter().any(|m| m.id == cached.id) {
                rows.push(cached);
            }
        }
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        // The merge must not grow the page past the store-side bound.
        rows.truncate(self.query_limit as usize);

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// In-memory store used to drive the service in isolation.
    struct MemStore {
        rows: StdMutex<Vec<Message>>,
        next_id: StdMutex<u64>,
    }

    impl MemStore {
        fn new() -> Self {
            Self {
                rows: StdMutex::new(Vec::new()),
                next_id: StdMutex::new(1),
            }
        }
    }

    impl MessageStore for MemStore {
        async fn insert(&self, msg: &NewMessage) -> Result<Message, StoreError> {
            let mut next = self.next_id.lock().unwrap();
            let stored = Message {
                id: next.to_string(),
                text: msg.text.clone(),
                sender: msg.sender,
                timestamp: msg.created_at.unwrap_or_else(Utc::now),
                session_id: msg.session_id.clone(),
                status: None,
            };
            *next += 1;
            self.rows.lock().unwrap().push(stored.clone());
            Ok(stored)
        }

        async fn replies_since(
            &self,
            session_id: &str,
            since: DateTime<Utc>,
            limit: u32,
        ) -> Result<Vec<Message>, StoreError> {
            let mut rows: Vec<Message> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|m| {
                    m.session_id == session_id && m.sender == Sender::Ai && m.timestamp >= since
                })
                .cloned()
                .collect();
            rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
            rows.truncate(limit as usize);
            Ok(rows)
        }
    }

    /// Store that always fails, for exercising the fallback path.
    struct DownStore;

    impl MessageStore for DownStore {
        async fn insert(&self, _msg: &NewMessage) -> Result<Message, StoreError> {
            Err(StoreError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            })
        }

        async fn replies_since(
            &self,
            _session_id: &str,
            _since: DateTime<Utc>,
            _limit: u32,
        ) -> Result<Vec<Message>, StoreError> {
            Err(StoreError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            })
        }
    }

    /// Store whose query never resolves, for the deadline path.
    struct StuckStore;

    impl MessageStore for StuckStore {
        async fn insert(&self, _msg: &NewMessage) -> Result<Message, StoreError> {
            std::future::pending().await
        }

        async fn replies_since(
            &self,
            _session_id: &str,
            _since: DateTime<Utc>,
            _limit: u32,
        ) -> Result<Vec<Message>, StoreError> {
            std::future::pending().await
        }
    }

    #[derive(Default)]
    struct MemCache {
        rows: StdMutex<Vec<Message>>,
    }

    impl ReplyCache for MemCache {
        fn push(&self, msg: Message) {
            self.rows.lock().unwrap().push(msg);
        }

        fn replies_since(&self, session_id: &str, since: DateTime<Utc>) -> Vec<Message> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.session_id == session_id && m.timestamp >= since)
                .cloned()
                .collect()
        }
    }

    fn service<S: MessageStore>(store: S) -> RelayService<S, MemCache> {
        RelayService::new(
            store,
            MemCache::default(),
            &QueryConfig::default(),
            &IngestConfig::default(),
        )
    }

    fn ingest_req(text: &str, session: &str) -> IngestRequest {
        IngestRequest {
            response: Some(text.to_string()),
            session_id: session.to_string(),
            timestamp: None,
            producer_id: None,
            request_id: None,
        }
    }

    #[tokio::test]
    async fn ingest_then_query_from_epoch_returns_decoded_reply() {
        let relay = service(MemStore::new());
        let outcome = relay
            .ingest(&ingest_req("Hello%20there", "quote_session_s1"))
            .await;
        assert_eq!(outcome.path, StorePath::Durable);

        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        let rows = relay.query("quote_session_s1", epoch).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text, "Hello there");
        assert_eq!(rows[0].sender, Sender::Ai);
    }

    #[tokio::test]
    async fn oversized_reply_is_capped_with_marker() {
        let relay = service(MemStore::new());
        let long = "x".repeat(3_000);
        relay.ingest(&ingest_req(&long, "quote_session_s1")).await;

        let rows = relay
            .query("quote_session_s1", DateTime::<Utc>::UNIX_EPOCH)
            .await
            .unwrap();
        assert!(rows[0].text.chars().count() <= 2_001);
        assert!(rows[0].text.ends_with('…'));
    }

    #[tokio::test]
    async fn identical_timestamps_stay_distinct_messages() {
        let relay = service(MemStore::new());
        let ts: DateTime<Utc> = "2025-08-23T10:00:00Z".parse().unwrap();
        for text in ["first", "second"] {
            let req = IngestRequest {
                response: Some(text.to_string()),
                session_id: "quote_session_s1".to_string(),
                timestamp: Some(ts),
                producer_id: None,
                request_id: None,
            };
            relay.ingest(&req).await;
        }

        let rows = relay
            .query("quote_session_s1", DateTime::<Utc>::UNIX_EPOCH)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0].id, rows[1].id);
    }

    #[tokio::test]
    async fn since_lower_bound_is_inclusive() {
        let relay = service(MemStore::new());
        let ts: DateTime<Utc> = "2025-08-23T10:00:00Z".parse().unwrap();
        let req = IngestRequest {
            response: Some("on the boundary".to_string()),
            session_id: "quote_session_s1".to_string(),
            timestamp: Some(ts),
            producer_id: None,
            request_id: None,
        };
        relay.ingest(&req).await;

        let rows = relay.query("quote_session_s1", ts).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn unknown_session_yields_empty_not_error() {
        let relay = service(MemStore::new());
        let rows = relay
            .query("quote_session_nobody", DateTime::<Utc>::UNIX_EPOCH)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn store_failure_degrades_to_fallback_cache() {
        let relay = service(DownStore);
        let outcome = relay
            .ingest(&ingest_req("kept%20anyway", "quote_session_s1"))
            .await;
        assert_eq!(outcome.path, StorePath::Fallback);
        assert!(outcome.message_id.starts_with("fb_"));

        // Query errors out (store is down) but the cached reply is
        // retained for when the store recovers in-process.
        let err = relay
            .query("quote_session_s1", DateTime::<Utc>::UNIX_EPOCH)
            .await
            .unwrap_err();
        match err {
            QueryError::Upstream { status, .. } => assert_eq!(status, Some(503)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cached_replies_merge_into_successful_queries() {
        // Fallback-cache a reply, then query against a healthy store:
        // the cached row must appear exactly once.
        let relay = service(MemStore::new());
        relay.cache.push(Message {
            id: "fb_cached".to_string(),
            text: "degraded-path reply".to_string(),
            sender: Sender::Ai,
            timestamp: Utc::now(),
            session_id: "quote_session_s1".to_string(),
            status: None,
        });
        relay.ingest(&ingest_req("durable", "quote_session_s1")).await;

        let rows = relay
            .query("quote_session_s1", DateTime::<Utc>::UNIX_EPOCH)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.iter().filter(|m| m.id == "fb_cached").count(), 1);
    }

    #[tokio::test]
    async fn merged_results_respect_query_limit() {
        let query = QueryConfig {
            limit: 2,
            ..QueryConfig::default()
        };
        let relay = RelayService::new(
            MemStore::new(),
            MemCache::default(),
            &query,
            &IngestConfig::default(),
        );

        let base: DateTime<Utc> = "2025-08-23T10:00:00Z".parse().unwrap();
        for (i, text) in ["first", "second"].iter().enumerate() {
            let req = IngestRequest {
                response: Some(text.to_string()),
                session_id: "quote_session_s1".to_string(),
                timestamp: Some(base + chrono::Duration::seconds(i as i64)),
                producer_id: None,
                request_id: None,
            };
            relay.ingest(&req).await;
        }
        relay.cache.push(Message {
            id: "fb_extra".to_string(),
            text: "cached overflow".to_string(),
            sender: Sender::Ai,
            timestamp: base + chrono::Duration::seconds(5),
            session_id: "quote_session_s1".to_string(),
            status: None,
        });

        let rows = relay
            .query("quote_session_s1", DateTime::<Utc>::UNIX_EPOCH)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_store_maps_to_timeout() {
        let relay = service(StuckStore);
        let err = relay
            .query("quote_session_s1", DateTime::<Utc>::UNIX_EPOCH)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Timeout));
    }

    #[tokio::test]
    async fn duplicate_request_id_is_collapsed() {
        let relay = service(MemStore::new());
        let req = IngestRequest {
            response: Some("one logical reply".to_string()),
            session_id: "quote_session_s1".to_string(),
            timestamp: None,
            producer_id: None,
            request_id: Some("req_abc".to_string()),
        };

        let first = relay.ingest(&req).await;
        let second = relay.ingest(&req).await;
        assert_eq!(first.message_id, second.message_id);
        assert_eq!(second.path, StorePath::Replayed);

        let rows = relay
            .query("quote_session_s1", DateTime::<Utc>::UNIX_EPOCH)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn same_token_different_sessions_are_distinct() {
        let relay = service(MemStore::new());
        for session in ["quote_session_s1", "quote_session_s2"] {
            let req = IngestRequest {
                response: Some("hello".to_string()),
                session_id: session.to_string(),
                timestamp: None,
                producer_id: None,
                request_id: Some("req_abc".to_string()),
            };
            let outcome = relay.ingest(&req).await;
            assert_eq!(outcome.path, StorePath::Durable);
        }
    }
}
