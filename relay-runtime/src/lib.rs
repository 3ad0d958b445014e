pub mod adk;
pub mod error;
pub mod event;
pub mod input;
pub mod langgraph;
pub mod mock;
pub mod runtime;
pub mod session;

mod remote;

pub use adk::{AdkConfig, AdkRuntime};
pub use error::RuntimeError;
pub use event::{AgentEvent, EventStream};
pub use input::{AgentInput, InputMessage};
pub use langgraph::{LangGraphConfig, LangGraphRuntime};
pub use mock::MockRuntime;
pub use runtime::{AgentRuntime, RuntimeKind};
pub use session::{ConversationId, MemorySessionStore, SessionRecord, SessionState, SessionStore, ANONYMOUS};
