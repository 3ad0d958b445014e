use reqwest::StatusCode;
use thiserror::Error;

/// Failures raised while talking to an agent runtime or its session store
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("request to agent runtime failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("agent runtime returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid agent runtime url: {0}")]
    InvalidUrl(String),

    #[error("agent runtime stream failed: {0}")]
    Stream(String),

    /// Error reported by the runtime itself inside the event stream
    #[error("{0}")]
    Remote(String),

    #[error("invalid payload from agent runtime: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("maximum number of sessions reached: {0}")]
    SessionLimit(usize),

    #[error("agent runtime panicked: {0}")]
    Panicked(String),
}
