use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AgentInput, ConversationId, EventStream, RuntimeError, SessionStore};

/// Which agent runtime a process wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Adk,
    LangGraph,
    Mock,
}

impl RuntimeKind {
    /// Service name reported by the health endpoint
    pub fn service_name(&self) -> &'static str {
        match self {
            RuntimeKind::Adk => "ai-agent-google-adk",
            RuntimeKind::LangGraph => "ai-agent-langgraph",
            RuntimeKind::Mock => "ai-agent-mock",
        }
    }

    /// Health field telling whether the provider credential is present
    pub fn credential_flag(&self) -> &'static str {
        match self {
            RuntimeKind::Adk => "google_api_configured",
            RuntimeKind::LangGraph => "openai_configured",
            RuntimeKind::Mock => "mock_configured",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuntimeKind::Adk => "adk",
            RuntimeKind::LangGraph => "langgraph",
            RuntimeKind::Mock => "mock",
        };
        f.write_str(name)
    }
}

/// Capability shared by every wrapped agent runtime.
///
/// A runtime owns reasoning, tool calls and memory; the relay only resolves
/// the conversation and consumes the returned events.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    fn kind(&self) -> RuntimeKind;

    /// Whether the provider credential is configured. Must not touch the network.
    fn credential_configured(&self) -> bool;

    fn sessions(&self) -> &dyn SessionStore;

    /// Start one turn for `id` and return its event stream.
    /// Dropping the stream cancels the turn on the relay side.
    async fn run(&self, id: &ConversationId, input: AgentInput) -> Result<EventStream, RuntimeError>;
}
