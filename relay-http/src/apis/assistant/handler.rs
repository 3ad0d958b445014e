use axum::{extract::State, response::Response};
use relay_runtime::ConversationId;
use tracing::{debug, info};
use uuid::Uuid;

use super::formatter::AssistantFormatter;
use super::types::ChatRequest;
use crate::normalize::normalize_commands;
use crate::session::RequestLifecycle;
use crate::streaming::{relay_events, sse_response};
use crate::{ApiJson, ServerState};

/// Handle a command-list turn - streaming response
pub async fn handle_assistant(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<ChatRequest>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let id = ConversationId::from_token(payload.token.as_deref());
    info!("[{}] - [{}] POST /assistant commands={}", request_id, id, payload.commands.len());

    if payload.tools.is_some() || payload.run_config.is_some() {
        debug!("[{}] - [{}] Ignoring client tools/runConfig", request_id, id);
    }

    let lifecycle = RequestLifecycle::new(request_id.clone(), id.to_string());
    let manager = state.session_manager.clone();
    let ChatRequest { commands, system, state: initial_state, .. } = payload;

    let open = async move {
        let input = normalize_commands(&commands, system)?;
        manager.handle_request(&request_id, &id, input, initial_state).await
    };

    sse_response(relay_events(open, AssistantFormatter, lifecycle))
}
