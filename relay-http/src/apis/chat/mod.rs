pub mod handler;
pub mod types;

pub use handler::{handle_chat, ChatFormatter};
pub use types::NativeChatRequest;
