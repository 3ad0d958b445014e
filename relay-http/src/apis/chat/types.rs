use serde::{Deserialize, Serialize};

/// Native request body for `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, alias = "session_id", skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}
