use futures::stream::BoxStream;

use crate::RuntimeError;

/// Provider-neutral view of one runtime event.
///
/// Every runtime maps its own envelope into this variant; nothing downstream
/// looks at provider payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// One incremental chunk of generated text
    Token(String),
    ToolStart(String),
    ToolEnd(String),
    /// Anything the relay has no frame for (final aggregates, metadata, ...)
    Unrecognized,
}

/// Producer-paced event sequence returned by [`crate::AgentRuntime::run`]
pub type EventStream = BoxStream<'static, Result<AgentEvent, RuntimeError>>;
