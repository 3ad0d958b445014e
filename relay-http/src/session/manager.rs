use relay_runtime::{
    AgentInput, AgentRuntime, ConversationId, EventStream, SessionRecord, SessionState,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::RelayError;

/// Session manager - resolves conversations in the runtime's session store
/// and starts agent turns on them.
///
/// Requests sharing one conversation are not serialized here; the runtime's
/// store is the only synchronization point.
pub struct SessionManager {
    runtime: Arc<dyn AgentRuntime>,
}

impl SessionManager {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Arc<dyn AgentRuntime> {
        &self.runtime
    }

    /// Get or create the session for `id`.
    /// `initial_state` only applies when the session is created.
    pub async fn get_or_create_session(
        &self,
        http_request_id: &str,
        id: &ConversationId,
        initial_state: Option<SessionState>,
    ) -> Result<SessionRecord, RelayError> {
        let store = self.runtime.sessions();

        if let Some(session) = store.get(id).await.map_err(RelayError::Session)? {
            info!("[{}] - [{}] Using existing session", http_request_id, id);
            return Ok(session);
        }

        info!("[{}] - [{}] Creating new session", http_request_id, id);
        store
            .create(id, initial_state.unwrap_or_default())
            .await
            .map_err(RelayError::Session)
    }

    /// Handle an incoming turn: resolve the conversation, then start the run
    pub async fn handle_request(
        &self,
        http_request_id: &str,
        id: &ConversationId,
        input: AgentInput,
        initial_state: Option<SessionState>,
    ) -> Result<EventStream, RelayError> {
        if id.is_anonymous() {
            debug!("[{}] - [{}] No caller identity, using shared anonymous conversation", http_request_id, id);
        }

        self.get_or_create_session(http_request_id, id, initial_state).await?;

        debug!("[{}] - [{}] Starting {} run with {} message(s)", http_request_id, id, self.runtime.kind(), input.messages.len());
        self.runtime.run(id, input).await.map_err(RelayError::Runtime)
    }
}
