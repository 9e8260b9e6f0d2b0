//! Outbound webhook dispatcher.
//!
//! Fire-and-forget POSTs to the automation workflow ("user said X")
//! and to the feedback hook. No retry here: a failed dispatch means
//! the reply loop never starts for that turn, and the retry affordance
//! belongs to the UI, not this layer. An unconfigured destination is a
//! deliberate deployment choice and dispatches become logged no-ops.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use quotewire_types::error::DispatchError;
use quotewire_types::event::{FeedbackEvent, OutboundEvent};
use quotewire_types::session::UserContext;

pub struct WebhookDispatcher {
    client: reqwest::Client,
    url: Option<String>,
    feedback_url: Option<String>,
    source: String,
}

impl WebhookDispatcher {
    const TIMEOUT: Duration = Duration::from_secs(15);

    pub fn new(url: Option<String>, feedback_url: Option<String>, source: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            url,
            feedback_url,
            source,
        }
    }

    /// Whether an automation destination is configured at all.
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Build the outbound event for a user message. The generated
    /// `request_id` doubles as the ingest idempotency token when the
    /// workflow echoes it back.
    pub fn build_event(
        &self,
        session_id: &str,
        text: &str,
        user: Option<&UserContext>,
    ) -> OutboundEvent {
        OutboundEvent {
            message: text.to_string(),
            timestamp: Utc::now(),
            session_id: session_id.to_string(),
            source: self.source.clone(),
            request_id: format!("req_{}", Uuid::now_v7()),
            tech_id: user.map(|u| u.stable_id.clone()),
            first_name: user.map(|u| u.handle.clone()),
            job_title: user.and_then(|u| u.role.clone()),
        }
    }

    /// Send a "user said X" event. Does not await any reply body; a
    /// success status is the whole contract.
    pub async fn dispatch(&self, event: &OutboundEvent) -> Result<(), DispatchError> {
        let Some(url) = &self.url else {
            warn!("automation webhook not configured, skipping dispatch");
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(event)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status(status.as_u16()));
        }

        debug!(
            session_id = %event.session_id,
            request_id = %event.request_id,
            "outbound event dispatched"
        );
        Ok(())
    }

    /// Send user feedback to the feedback hook. Same contract as
    /// [`dispatch`](Self::dispatch): unconfigured is a no-op.
    pub async fn send_feedback(
        &self,
        user_name: &str,
        feedback_text: &str,
    ) -> Result<(), DispatchError> {
        let Some(url) = &self.feedback_url else {
            warn!("feedback webhook not configured, skipping submission");
            return Ok(());
        };

        let event = FeedbackEvent {
            user_name: user_name.to_string(),
            feedback_text: feedback_text.to_string(),
            timestamp: Utc::now(),
        };

        let response = self
            .client
            .post(url)
            .json(&event)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher(url: Option<&str>) -> WebhookDispatcher {
        WebhookDispatcher::new(url.map(String::from), None, "quotewire".to_string())
    }

    #[test]
    fn event_carries_user_context_when_known() {
        let user = UserContext::new("Mike", "tech-9").with_role("arborist");
        let event = dispatcher(Some("https://hook.example.com")).build_event(
            "quote_session_mike_tech-9_1",
            "two stumps",
            Some(&user),
        );
        assert_eq!(event.first_name.as_deref(), Some("Mike"));
        assert_eq!(event.tech_id.as_deref(), Some("tech-9"));
        assert_eq!(event.job_title.as_deref(), Some("arborist"));
        assert!(event.request_id.starts_with("req_"));
    }

    #[test]
    fn event_omits_user_context_when_anonymous() {
        let event = dispatcher(Some("https://hook.example.com")).build_event(
            "quote_session_1",
            "hello",
            None,
        );
        assert!(event.tech_id.is_none());
        assert!(event.first_name.is_none());
    }

    #[tokio::test]
    async fn unconfigured_dispatch_is_a_no_op() {
        let dispatcher = dispatcher(None);
        let event = dispatcher.build_event("quote_session_1", "hello", None);
        assert!(dispatcher.dispatch(&event).await.is_ok());
        assert!(!dispatcher.is_configured());
    }

    #[tokio::test]
    async fn unconfigured_feedback_is_a_no_op() {
        let dispatcher = dispatcher(None);
        assert!(dispatcher.send_feedback("Mike", "love it").await.is_ok());
    }
}
