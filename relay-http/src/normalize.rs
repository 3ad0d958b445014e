use relay_runtime::{AgentInput, InputMessage};
use serde_json::Value;

use crate::apis::assistant::Command;
use crate::error::RelayError;

/// Fold a command list into one agent turn.
///
/// Text parts are space-joined within a message; every message that carries text
/// becomes one user message, in request order. Tool results keep their call id and
/// carry the result object as compact JSON.
pub fn normalize_commands(commands: &[Command], system: Option<String>) -> Result<AgentInput, RelayError> {
    let mut messages = Vec::new();

    for command in commands {
        match command {
            Command::AddMessage { message } => {
                let text = message
                    .parts
                    .iter()
                    .filter_map(|part| part.text())
                    .collect::<Vec<_>>()
                    .join(" ");
                if !text.is_empty() {
                    messages.push(InputMessage::User(text));
                }
            }
            Command::AddToolResult { tool_call_id, result } => {
                messages.push(InputMessage::ToolResult {
                    tool_call_id: tool_call_id.clone(),
                    content: Value::Object(result.clone()).to_string(),
                });
            }
        }
    }

    if messages.is_empty() {
        return Err(RelayError::EmptyInput);
    }

    Ok(AgentInput { system, messages })
}

/// Native single-message requests
pub fn normalize_message(message: &str) -> Result<AgentInput, RelayError> {
    if message.trim().is_empty() {
        return Err(RelayError::EmptyInput);
    }
    Ok(AgentInput::text(message))
}
