//! Errors returned before the event stream starts

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::sanitize::SanitizeError;

/// Request-level failure, rendered as `{"error": "..."}` with a status code
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Missing chat data")]
    MissingInput,

    #[error("No valid message")]
    NoValidInput,

    #[error("Request too large")]
    PayloadTooLarge,

    #[error("Too many requests. Please wait.")]
    RateLimited,

    /// Detail is logged, never sent to the client
    #[error("Internal server error")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingInput | RelayError::NoValidInput => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SanitizeError> for RelayError {
    fn from(e: SanitizeError) -> Self {
        match e {
            SanitizeError::MissingInput => RelayError::MissingInput,
            SanitizeError::NoValidInput => RelayError::NoValidInput,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::MissingInput => tracing::debug!("Rejected request: missing chat data"),
            RelayError::NoValidInput => tracing::info!("Rejected request: no valid message after cleaning"),
            RelayError::PayloadTooLarge | RelayError::RateLimited => {
                tracing::warn!(status = %self.status(), "Rejected request: {}", self)
            }
            RelayError::Internal(ref detail) => tracing::error!(error = %detail, "Internal error"),
        }

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
