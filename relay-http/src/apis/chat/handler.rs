use axum::{extract::State, response::Response};
use relay_runtime::ConversationId;
use tracing::info;
use uuid::Uuid;

use super::types::NativeChatRequest;
use crate::normalize::normalize_message;
use crate::session::RequestLifecycle;
use crate::streaming::{relay_events, sse_response, EventFormatter, StreamEvent};
use crate::{ApiJson, ServerState};

/// Formatter for the native endpoint: text goes out as `token` frames
pub struct ChatFormatter;

impl EventFormatter for ChatFormatter {
    fn delta(&self, text: String) -> StreamEvent {
        StreamEvent::Token { delta: text }
    }
}

pub async fn handle_chat(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<NativeChatRequest>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let id = ConversationId::from_ids(payload.user_id.as_deref(), payload.thread_id.as_deref());
    info!("[{}] - [{}] POST /chat", request_id, id);

    let lifecycle = RequestLifecycle::new(request_id.clone(), id.to_string());
    let manager = state.session_manager.clone();

    let open = async move {
        let input = normalize_message(&payload.message)?;
        manager.handle_request(&request_id, &id, input, None).await
    };

    sse_response(relay_events(open, ChatFormatter, lifecycle))
}
