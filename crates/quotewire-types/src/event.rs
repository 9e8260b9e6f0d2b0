//! Outbound webhook event payloads.
//!
//! These are the JSON bodies posted to the automation workflow. The
//! workflow is a black box: it receives the event, produces zero or
//! more replies on its own schedule, and posts them back through the
//! ingest endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A "user said X" event posted to the automation webhook.
///
/// `request_id` is client-generated per logical send and doubles as the
/// ingest idempotency token when the producer echoes it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEvent {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    /// Source tag identifying this client to the workflow.
    pub source: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tech_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub job_title: Option<String>,
}

/// User feedback posted to the feedback webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub user_name: String,
    pub feedback_text: String,
    pub timestamp: DateTime<Utc>,
}
