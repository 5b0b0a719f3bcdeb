//! Error types for the weather tool server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Fetch Error Enum ==
/// Failure of a single load (underlying fetch or gate wait).
///
/// Cloneable so one failed load can be handed to every caller that was
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, DNS or timeout failure talking to the upstream
    #[error("network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    /// Response body could not be turned into a result
    #[error("parse error: {0}")]
    Parse(String),

    /// Waiter gave up before the rate gate granted a permit
    #[error("cancelled while waiting for a rate gate permit")]
    Cancelled,

    /// The load task itself died (panic or runtime shutdown)
    #[error("load task failed: {0}")]
    Internal(String),
}

impl FetchError {
    /// Whether another attempt could reasonably succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status(status) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// == Gate Error Enum ==
/// Error returned by the fetch orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Loading `key` failed; `source` is the untouched underlying error
    #[error("fetch failed for '{key}': {source}")]
    Fetch {
        key: String,
        #[source]
        source: FetchError,
    },
}

impl GateError {
    /// The key the failed fetch was for.
    pub fn key(&self) -> &str {
        match self {
            GateError::Fetch { key, .. } => key,
        }
    }

    /// The underlying fetch error without key context.
    pub fn fetch_error(&self) -> &FetchError {
        match self {
            GateError::Fetch { source, .. } => source,
        }
    }
}

// == API Error Enum ==
/// Errors surfaced by the HTTP layer outside of JSON-RPC responses.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the HTTP layer.
pub type Result<T> = std::result::Result<T, ApiError>;
