use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use relay_runtime::RuntimeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Failures of a chat turn. All of them are reported in-stream as one
/// `error` frame followed by `end`.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The request produced no text or tool result to send
    #[error("No user message found")]
    EmptyInput,

    #[error("Session error: {0}")]
    Session(#[source] RuntimeError),

    #[error("{0}")]
    Runtime(#[source] RuntimeError),
}

/// Error response structure for requests rejected before streaming starts
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: String, error_type: String, code: Option<String>) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                code,
            },
        }
    }

    pub fn invalid_request(message: String) -> Self {
        Self::new(message, "invalid_request".to_string(), None)
    }

    pub fn validation_error(message: String) -> Self {
        Self::new(message, "validation_error".to_string(), None)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.error.r#type.as_str() {
            "invalid_request" => StatusCode::BAD_REQUEST,
            "validation_error" => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Custom JSON extractor that returns our ErrorResponse on deserialization failures
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ErrorResponse))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        error!("JSON deserialization error: {}", message);
        match rejection {
            // Well-formed JSON that does not match the request schema (e.g. unknown command type)
            JsonRejection::JsonDataError(_) => ErrorResponse::validation_error(message),
            _ => ErrorResponse::invalid_request(message),
        }
    }
}
