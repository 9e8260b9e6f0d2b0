//! Application error type mapping to HTTP status codes and JSON bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use quotewire_core::relay::QueryError;

/// Application-level error that maps to HTTP responses.
///
/// Producers retry on 408/5xx and give up on 400, so every response
/// here carries the body shape the poll loop and the workflow expect:
/// `{error}` for validation, `{error, retryAfter}` for timeouts, and
/// `{error, details, retryAfter}` for store failures.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request (bad JSON, implausible session id).
    Validation(String),
    /// The store call exceeded its deadline.
    StoreTimeout { retry_after: u64 },
    /// The store answered badly or not at all. `status` is the store's
    /// own status when it sent one.
    Store {
        status: Option<u16>,
        details: String,
        retry_after: u64,
    },
}

impl AppError {
    /// Convert a relay query failure, attaching the configured
    /// `retryAfter` hint.
    pub fn from_query(err: QueryError, retry_after: u64) -> Self {
        match err {
            QueryError::Timeout => AppError::StoreTimeout { retry_after },
            QueryError::Upstream { status, details } => AppError::Store {
                status,
                details,
                retry_after,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::StoreTimeout { retry_after } => (
                StatusCode::REQUEST_TIMEOUT,
                json!({
                    "error": "Database query timeout",
                    "retryAfter": retry_after,
                }),
            ),
            AppError::Store {
                status,
                details,
                retry_after,
            } => {
                // Server-side store statuses pass through; anything
                // else (client-class codes, transport failures) is our
                // 500.
                let code = status
                    .filter(|s| *s >= 500)
                    .and_then(|s| StatusCode::from_u16(s).ok())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (
                    code,
                    json!({
                        "error": "Database query failed",
                        "details": details,
                        "retryAfter": retry_after,
                    }),
                )
            }
        };

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
