pub mod formatter;
pub mod handler;
pub mod types;

pub use formatter::AssistantFormatter;
pub use handler::handle_assistant;
pub use types::{ChatRequest, Command, MessagePart, UserMessage};
