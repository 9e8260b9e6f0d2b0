//! POST /chat-response - accept a reply from the automation workflow.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use quotewire_core::relay::StorePath;
use quotewire_types::message::{IngestAck, IngestRequest};

use crate::http::error::AppError;
use crate::state::AppState;

/// Accept an AI reply and make it visible to the session's queries.
///
/// The acknowledgement is identical on the durable and fallback paths;
/// the producer never needs to know the store was down. Bad JSON is
/// the only client error here.
pub async fn ingest_reply(
    State(state): State<AppState>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestAck>, AppError> {
    let Json(req) = body.map_err(|rejection| {
        AppError::Validation(format!("Invalid request body: {rejection}"))
    })?;

    let outcome = state.relay.ingest(&req).await;
    info!(
        session_id = %req.session_id,
        message_id = %outcome.message_id,
        durable = matches!(outcome.path, StorePath::Durable),
        "reply ingested"
    );

    Ok(Json(IngestAck {
        message: "AI response received".to_string(),
        message_id: outcome.message_id,
    }))
}
