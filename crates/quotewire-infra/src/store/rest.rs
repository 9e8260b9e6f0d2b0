//! REST message store client.
//!
//! Talks to a PostgREST-style table endpoint: rows are filtered with
//! `column=op.value` query parameters and inserts return the stored
//! row via `Prefer: return=representation`. The service key is wrapped
//! in [`SecretString`] and only exposed when building request headers;
//! it never appears in Debug output or logs.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use quotewire_core::store::MessageStore;
use quotewire_types::error::StoreError;
use quotewire_types::message::{Message, NewMessage, Sender};

/// Client for the durable REST message store.
pub struct RestMessageStore {
    client: reqwest::Client,
    base_url: String,
    table: String,
    service_key: SecretString,
}

/// Raw row shape as the store returns it. Every field is optional so a
/// partially-broken row degrades instead of failing the whole page.
#[derive(Debug, Deserialize)]
struct StoreRow {
    id: Option<serde_json::Value>,
    message_text: Option<String>,
    sender: Option<String>,
    created_at: Option<String>,
    session_id: Option<String>,
}

impl RestMessageStore {
    /// HTTP-level ceiling. The relay applies its own tighter deadline
    /// per query; this only guards against a wedged connection.
    const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: String, table: String, service_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Self::CLIENT_TIMEOUT)
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            table,
            service_key,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.service_key.expose_secret();
        req.bearer_auth(key)
            .header("apikey", key)
            .header("Accept", "application/json")
    }

    fn map_transport(err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout
        } else {
            StoreError::Transport(err.to_string())
        }
    }

    /// Map a raw row to the wire shape, defaulting missing fields to
    /// safe placeholders. Returns the message or `None` when the row is
    /// beyond salvage (it is dropped, not fatal).
    fn map_row(row: StoreRow, session_id: &str) -> Option<Message> {
        let id = match row.id {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(_) => return None,
            None => format!("tmp_{}", Uuid::now_v7()),
        };

        let timestamp = row
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let sender = row
            .sender
            .as_deref()
            .and_then(|s| s.parse::<Sender>().ok())
            .unwrap_or(Sender::Ai);

        Some(Message {
            id,
            text: row.message_text.unwrap_or_default(),
            sender,
            timestamp,
            session_id: row.session_id.unwrap_or_else(|| session_id.to_string()),
            status: None,
        })
    }
}

impl MessageStore for RestMessageStore {
    async fn insert(&self, msg: &NewMessage) -> Result<Message, StoreError> {
        let mut body = json!({
            "session_id": msg.session_id,
            "sender": msg.sender.to_string(),
            "message_text": msg.text,
        });
        if let Some(created_at) = msg.created_at {
            body["created_at"] =
                json!(created_at.to_rfc3339_opts(SecondsFormat::Millis, true));
        }

        let response = self
            .authed(self.client.post(self.table_url()))
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut rows: Vec<StoreRow> = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        let row = rows
            .pop()
            .ok_or_else(|| StoreError::Malformed("insert returned no row".to_string()))?;

        Self::map_row(row, &msg.session_id)
            .ok_or_else(|| StoreError::Malformed("insert returned unusable row".to_string()))
    }

    async fn replies_since(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Message>, StoreError> {
        let since_str = since.to_rfc3339_opts(SecondsFormat::Millis, true);
        let response = self
            .authed(self.client.get(self.table_url()))
            .query(&[
                ("session_id", format!("eq.{session_id}")),
                ("sender", "eq.ai".to_string()),
                ("created_at", format!("gte.{since_str}")),
                ("order", "created_at.asc".to_string()),
                ("limit", limit.to_string()),
                (
                    "select",
                    "id,message_text,sender,created_at,session_id".to_string(),
                ),
            ])
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .map_err(Self::map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Deserialize rows individually so one malformed row is
        // dropped instead of poisoning the page.
        let raw: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        let messages = raw
            .into_iter()
            .filter_map(|value| serde_json::from_value::<StoreRow>(value).ok())
            .filter_map(|row| Self::map_row(row, session_id))
            .collect();

        Ok(messages)
    }
}
