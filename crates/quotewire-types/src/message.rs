//! Chat message types and the ingest/query wire shapes.
//!
//! `Message` is the shape the query endpoint returns and the poll loop
//! consumes. Field names on the wire are camelCase (`sessionId`) because
//! the widget consumes them from a browser runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Who authored a message.
///
/// Only `ai` messages flow through the ingest/query path; `user`
/// messages are appended to local UI state at send time and are never
/// re-fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Ai => write!(f, "ai"),
        }
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Sender::User),
            "ai" => Ok(Sender::Ai),
            other => Err(format!("invalid sender: '{other}'")),
        }
    }
}

/// Client-side lifecycle of a user-authored message.
///
/// Never persisted server-side; skipped on the wire when unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sending,
    Sent,
    Delivered,
    Error,
}

/// A single chat message as returned by the query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Opaque id, unique within a session's reply stream. Assigned by
    /// the durable store, or `fb_<uuid>` when the fallback path was used.
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    /// Client-only delivery state for user-authored messages.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<DeliveryStatus>,
}

/// Insert shape handed to a message store. The store assigns the id
/// and, when `created_at` is `None`, the creation instant.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub session_id: String,
    pub text: String,
    pub sender: Sender,
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /chat-response`, sent by the automation workflow when
/// a reply is ready.
///
/// `response` is URL-encoded by the producer. `producer_id` is opaque;
/// `request_id` is the idempotency token the dispatcher attached to the
/// outbound event, echoed back so redeliveries can be collapsed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default)]
    pub response: Option<String>,
    pub session_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, alias = "techId")]
    pub producer_id: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Acknowledgement body of a successful ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAck {
    pub message: String,
    pub message_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_round_trips_through_display() {
        assert_eq!(Sender::Ai.to_string(), "ai");
        assert_eq!("user".parse::<Sender>().unwrap(), Sender::User);
        assert!("bot".parse::<Sender>().is_err());
    }

    #[test]
    fn message_serializes_camel_case_without_status() {
        let msg = Message {
            id: "42".to_string(),
            text: "Hello there".to_string(),
            sender: Sender::Ai,
            timestamp: "2025-08-23T10:00:00Z".parse().unwrap(),
            session_id: "quote_session_123".to_string(),
            status: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["sessionId"], "quote_session_123");
        assert_eq!(json["sender"], "ai");
        assert!(json.get("status").is_none());
    }

    #[test]
    fn ingest_request_accepts_tech_id_alias() {
        let body = r#"{"response":"hi","sessionId":"quote_session_1","techId":"tech-9"}"#;
        let req: IngestRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.producer_id.as_deref(), Some("tech-9"));
        assert!(req.timestamp.is_none());
    }
}
