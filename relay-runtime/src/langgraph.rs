//! Client for a LangGraph server (`langgraph dev` / LangGraph Platform).
//!
//! Conversations are threads; turns are runs streamed with `stream_mode = events`,
//! which carries the graph's `astream_events` v2 payloads.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::remote::{self, MessageEvent};
use crate::{
    AgentEvent, AgentInput, AgentRuntime, ConversationId, EventStream, InputMessage, RuntimeError,
    RuntimeKind, SessionRecord, SessionState, SessionStore,
};

#[derive(Clone, Debug)]
pub struct LangGraphConfig {
    /// Base url of the LangGraph server (e.g. "http://127.0.0.1:2024")
    pub base_url: String,
    /// Graph or assistant to run
    pub assistant_id: String,
    /// Provider credential, forwarded as a bearer token when set
    pub api_key: Option<String>,
}

impl LangGraphConfig {
    pub fn new(base_url: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            assistant_id: assistant_id.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }
}

pub struct LangGraphRuntime {
    client: Client,
    base_url: Url,
    config: LangGraphConfig,
}

impl LangGraphRuntime {
    pub fn new(config: LangGraphConfig) -> Result<Self, RuntimeError> {
        Ok(Self {
            client: Client::new(),
            base_url: remote::parse_base_url(&config.base_url)?,
            config,
        })
    }

    fn run_body(&self, id: &ConversationId, input: &AgentInput) -> Value {
        json!({
            "assistant_id": self.config.assistant_id,
            "input": { "messages": input_messages(input) },
            "config": {
                "configurable": {
                    "thread_id": thread_uuid(id).to_string(),
                    "user_id": id.user_id,
                }
            },
            "stream_mode": ["events"],
        })
    }
}

/// LangGraph servers only accept uuid thread ids, so each conversation maps to
/// a stable v5 uuid of its (user, thread) pair.
pub fn thread_uuid(id: &ConversationId) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("agent-relay:{}", id).as_bytes())
}

fn input_messages(input: &AgentInput) -> Vec<Value> {
    let mut messages = Vec::with_capacity(input.messages.len() + 1);
    if let Some(system) = &input.system {
        messages.push(json!({ "type": "system", "content": system }));
    }
    for msg in &input.messages {
        messages.push(match msg {
            InputMessage::User(text) => json!({ "type": "human", "content": text }),
            InputMessage::ToolResult { tool_call_id, content } => json!({
                "type": "tool",
                "tool_call_id": tool_call_id,
                "content": content,
            }),
        });
    }
    messages
}

#[derive(Debug, Deserialize)]
struct Thread {
    #[serde(default)]
    metadata: Option<SessionState>,
}

#[async_trait]
impl SessionStore for LangGraphRuntime {
    async fn get(&self, id: &ConversationId) -> Result<Option<SessionRecord>, RuntimeError> {
        let thread_id = thread_uuid(id).to_string();
        let request = self.client.get(remote::endpoint(&self.base_url, &["threads", &thread_id]));
        let response = remote::authorized(request, self.config.api_key.as_deref())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let thread: Thread = remote::ensure_success(response).await?.json().await?;
        Ok(Some(SessionRecord {
            id: id.clone(),
            state: thread.metadata.unwrap_or_default(),
        }))
    }

    /// Initial state is kept as thread metadata next to the user id
    async fn create(
        &self,
        id: &ConversationId,
        state: SessionState,
    ) -> Result<SessionRecord, RuntimeError> {
        let thread_id = thread_uuid(id);
        debug!("[{}] Creating LangGraph thread {}", id, thread_id);

        let mut metadata = state;
        metadata.insert("user_id".to_string(), Value::String(id.user_id.clone()));
        metadata.insert("thread_key".to_string(), Value::String(id.thread_id.clone()));

        let body = json!({
            "thread_id": thread_id.to_string(),
            "metadata": metadata,
            "if_exists": "do_nothing",
        });
        let request = self.client.post(remote::endpoint(&self.base_url, &["threads"])).json(&body);
        let response = remote::authorized(request, self.config.api_key.as_deref())
            .send()
            .await?;

        let thread: Thread = remote::ensure_success(response).await?.json().await?;
        Ok(SessionRecord {
            id: id.clone(),
            state: thread.metadata.unwrap_or(metadata),
        })
    }
}

#[async_trait]
impl AgentRuntime for LangGraphRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::LangGraph
    }

    fn credential_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn sessions(&self) -> &dyn SessionStore {
        self
    }

    async fn run(&self, id: &ConversationId, input: AgentInput) -> Result<EventStream, RuntimeError> {
        let thread_id = thread_uuid(id).to_string();
        let url = remote::endpoint(&self.base_url, &["threads", &thread_id, "runs", "stream"]);
        let request = self.client.post(url).json(&self.run_body(id, &input));
        let request = remote::authorized(request, self.config.api_key.as_deref());

        remote::event_source_stream(request, map_message)
    }
}

/// Named SSE events from `runs/stream`: `events` carries graph payloads, `error` ends the run
fn map_message(message: &MessageEvent) -> Result<AgentEvent, RuntimeError> {
    match message.event.as_str() {
        "events" => {
            let event: GraphEvent = serde_json::from_str(&message.data)?;
            Ok(map_event(&event))
        }
        "error" => Err(RuntimeError::Remote(error_message(&message.data))),
        _ => Ok(AgentEvent::Unrecognized),
    }
}

/// One `astream_events` v2 payload
#[derive(Debug, Deserialize)]
pub struct GraphEvent {
    pub event: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data: Value,
}

/// Map one graph event into the relay's event variant
pub fn map_event(event: &GraphEvent) -> AgentEvent {
    match event.event.as_str() {
        "on_chat_model_stream" => {
            let text = event
                .data
                .get("chunk")
                .and_then(|chunk| chunk.get("content"))
                .map(content_text)
                .unwrap_or_default();
            if text.is_empty() {
                AgentEvent::Unrecognized
            } else {
                AgentEvent::Token(text)
            }
        }
        "on_tool_start" => AgentEvent::ToolStart(event.name.clone()),
        "on_tool_end" => AgentEvent::ToolEnd(event.name.clone()),
        _ => AgentEvent::Unrecognized,
    }
}

/// Chunk content is either a string or a list of typed content blocks
fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect(),
        _ => String::new(),
    }
}

fn error_message(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(value) => value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string()),
        Err(_) => data.to_string(),
    }
}
