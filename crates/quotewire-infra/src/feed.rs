//! HTTP reply feed -- the query endpoint as the terminal client sees it.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use quotewire_core::feed::ReplyFeed;
use quotewire_types::error::FeedError;
use quotewire_types::message::Message;

/// Polls `GET /chat-messages/{sessionId}?since=` on a relay server.
pub struct HttpReplyFeed {
    client: reqwest::Client,
    base_url: String,
}

/// Error body shape returned by the query endpoint on 408/5xx.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    retry_after: Option<u64>,
}

impl HttpReplyFeed {
    const TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ReplyFeed for HttpReplyFeed {
    async fn fetch(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, FeedError> {
        let url = format!("{}/chat-messages/{session_id}", self.base_url);
        let since_str = since.to_rfc3339_opts(SecondsFormat::Millis, true);

        let response = self
            .client
            .get(&url)
            .query(&[("since", since_str)])
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.retry_after);
            return Err(FeedError::Status {
                status: status.as_u16(),
                retry_after,
            });
        }

        response
            .json::<Vec<Message>>()
            .await
            .map_err(|e| FeedError::Malformed(e.to_string()))
    }
}
