use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One part of a user message. Only `text` parts carry payload for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl MessagePart {
    /// Text carried by this part, if it is a non-empty text part
    pub fn text(&self) -> Option<&str> {
        match (self.part_type.as_str(), self.text.as_deref()) {
            ("text", Some(text)) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMessage {
    #[serde(default = "default_role")]
    pub role: String,
    pub parts: Vec<MessagePart>,
}

fn default_role() -> String {
    "user".to_string()
}

/// Commands accepted by `POST /assistant`, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "add-message")]
    AddMessage { message: UserMessage },
    #[serde(rename = "add-tool-result")]
    AddToolResult {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        result: Map<String, Value>,
    },
}

/// Command-list request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub commands: Vec<Command>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(rename = "runConfig", default, skip_serializing_if = "Option::is_none")]
    pub run_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}
