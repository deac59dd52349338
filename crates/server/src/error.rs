use actionhub_action::ActionError;
use actionhub_core::RequestError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Message returned to callers for errors that are not meant for them.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

/// Message returned when the `Authorization` header is missing or wrong.
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid 'Authorization' header.";

/// Errors that can occur when running the action hub.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The request did not carry a valid API token.
    #[error("Invalid 'Authorization' header.")]
    Unauthorized,

    /// An action-level error surfaced through the API.
    #[error(transparent)]
    Action(#[from] ActionError),
}

impl From<RequestError> for ServerError {
    fn from(err: RequestError) -> Self {
        Self::Action(err.into())
    }
}

impl ServerError {
    /// Status code and the message safe to show the caller.
    ///
    /// Actionable action errors are passed through verbatim with 404; every
    /// other failure is masked behind a generic 500.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthorized => (StatusCode::FORBIDDEN, UNAUTHORIZED_MESSAGE.to_owned()),
            Self::Action(e) if e.is_user_facing() => (StatusCode::NOT_FOUND, e.to_string()),
            Self::Action(_) | Self::Config(_) | Self::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_owned(),
            ),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error on request");
        }
        let body = serde_json::json!({ "success": false, "error": message });
        (status, axum::Json(body)).into_response()
    }
}
