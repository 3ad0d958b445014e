use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::{
    AgentEvent, AgentInput, AgentRuntime, ConversationId, EventStream, InputMessage,
    MemorySessionStore, RuntimeError, RuntimeKind, SessionStore,
};

/// In-process runtime answering with a canned echo of the input.
/// Used for local development without a provider credential, and in tests.
pub struct MockRuntime {
    store: MemorySessionStore,
    token_delay: Duration,
}

impl MockRuntime {
    pub fn new(max_sessions: Option<usize>) -> Self {
        Self {
            store: MemorySessionStore::new(max_sessions),
            token_delay: Duration::ZERO,
        }
    }

    /// Pause between tokens, to mimic a streaming model
    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    pub fn store(&self) -> &MemorySessionStore {
        &self.store
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl AgentRuntime for MockRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Mock
    }

    fn credential_configured(&self) -> bool {
        true
    }

    fn sessions(&self) -> &dyn SessionStore {
        &self.store
    }

    async fn run(&self, id: &ConversationId, input: AgentInput) -> Result<EventStream, RuntimeError> {
        let record = self
            .store
            .update(id, |state| {
                let turns = state.get("turns").and_then(Value::as_u64).unwrap_or(0);
                state.insert("turns".to_string(), Value::from(turns + 1));
            })
            .await?;
        debug!("[{}] Mock turn {:?}", id, record.state.get("turns"));

        let mut events = Vec::new();
        for msg in &input.messages {
            if let InputMessage::ToolResult { tool_call_id, .. } = msg {
                events.push(AgentEvent::ToolStart(tool_call_id.clone()));
                events.push(AgentEvent::ToolEnd(tool_call_id.clone()));
            }
        }

        let reply = format!("Mock response: {}", input.flattened_text());
        let mut words = reply.split(' ').peekable();
        while let Some(word) = words.next() {
            let token = if words.peek().is_some() {
                format!("{} ", word)
            } else {
                word.to_string()
            };
            events.push(AgentEvent::Token(token));
        }

        let delay = self.token_delay;
        let stream = stream::iter(events).then(move |event| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, RuntimeError>(event)
        });
        Ok(Box::pin(stream))
    }
}
