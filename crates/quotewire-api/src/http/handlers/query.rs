//! GET /chat-messages/{sessionId} - poll for replies since a cursor.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use quotewire_core::session::is_plausible_session_id;
use quotewire_types::message::Message;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    /// ISO-8601 lower bound (inclusive). Absent or unparsable means
    /// "from the beginning".
    #[serde(default)]
    since: Option<String>,
}

/// Return ai replies for the session created at or after `since`,
/// oldest first.
pub async fn session_replies(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<Message>>, AppError> {
    if !is_plausible_session_id(&session_id) {
        return Err(AppError::Validation(
            "Invalid session ID in path".to_string(),
        ));
    }

    let since = parse_since(params.since.as_deref());
    let retry_after = state.config.query.retry_after_secs;

    let rows = state
        .relay
        .query(&session_id, since)
        .await
        .map_err(|err| AppError::from_query(err, retry_after))?;

    Ok(Json(rows))
}

/// A malformed `since` degrades to the epoch rather than erroring:
/// the client re-receives history and its dedup set drops the repeats.
fn parse_since(raw: Option<&str>) -> DateTime<Utc> {
    match raw {
        None => DateTime::<Utc>::UNIX_EPOCH,
        Some(value) => match DateTime::parse_from_rfc3339(value) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(err) => {
                warn!(since = value, error = %err, "unparsable since param, using epoch");
                DateTime::<Utc>::UNIX_EPOCH
            }
        },
    }
}
