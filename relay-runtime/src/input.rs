/// One message handed to the runtime for a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMessage {
    User(String),
    ToolResult { tool_call_id: String, content: String },
}

/// Normalized input for a single agent turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentInput {
    pub system: Option<String>,
    pub messages: Vec<InputMessage>,
}

impl AgentInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            system: None,
            messages: vec![InputMessage::User(text.into())],
        }
    }

    /// Single text rendering for runtimes that only accept one user message.
    /// Messages are newline-joined in order, tool results as `Tool result: <content>`.
    pub fn flattened_text(&self) -> String {
        self.messages
            .iter()
            .map(|msg| match msg {
                InputMessage::User(text) => text.clone(),
                InputMessage::ToolResult { content, .. } => format!("Tool result: {}", content),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
