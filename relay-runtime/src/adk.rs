//! Client for a Google ADK api server (`adk api_server`).
//!
//! Sessions live in the server's session service, keyed by
//! (app name, user id, session id). Turns are streamed from `/run_sse`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::remote::{self, MessageEvent};
use crate::{
    AgentEvent, AgentInput, AgentRuntime, ConversationId, EventStream, RuntimeError, RuntimeKind,
    SessionRecord, SessionState, SessionStore,
};

#[derive(Clone, Debug)]
pub struct AdkConfig {
    /// Base url of the ADK api server (e.g. "http://127.0.0.1:8000")
    pub base_url: String,
    pub app_name: String,
    /// Provider credential, forwarded as a bearer token when set
    pub api_key: Option<String>,
}

impl AdkConfig {
    pub fn new(base_url: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            app_name: app_name.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }
}

pub struct AdkRuntime {
    client: Client,
    base_url: Url,
    config: AdkConfig,
}

impl AdkRuntime {
    pub fn new(config: AdkConfig) -> Result<Self, RuntimeError> {
        Ok(Self {
            client: Client::new(),
            base_url: remote::parse_base_url(&config.base_url)?,
            config,
        })
    }

    fn session_url(&self, id: &ConversationId) -> Url {
        remote::endpoint(
            &self.base_url,
            &[
                "apps",
                &self.config.app_name,
                "users",
                &id.user_id,
                "sessions",
                &id.thread_id,
            ],
        )
    }

    fn run_request(&self, id: &ConversationId, input: &AgentInput) -> RunRequest {
        RunRequest {
            app_name: self.config.app_name.clone(),
            user_id: id.user_id.clone(),
            session_id: id.thread_id.clone(),
            new_message: AdkContent {
                role: Some("user".to_string()),
                parts: Some(vec![AdkPart {
                    text: Some(input.flattened_text()),
                    ..Default::default()
                }]),
            },
            streaming: true,
        }
    }
}

#[async_trait]
impl SessionStore for AdkRuntime {
    async fn get(&self, id: &ConversationId) -> Result<Option<SessionRecord>, RuntimeError> {
        let request = self.client.get(self.session_url(id));
        let response = remote::authorized(request, self.config.api_key.as_deref())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let session: AdkSession = remote::ensure_success(response).await?.json().await?;
        Ok(Some(SessionRecord {
            id: id.clone(),
            state: session.state,
        }))
    }

    async fn create(
        &self,
        id: &ConversationId,
        state: SessionState,
    ) -> Result<SessionRecord, RuntimeError> {
        debug!("[{}] Creating ADK session in app {}", id, self.config.app_name);
        let request = self.client.post(self.session_url(id)).json(&state);
        let response = remote::authorized(request, self.config.api_key.as_deref())
            .send()
            .await?;

        let session: AdkSession = remote::ensure_success(response).await?.json().await?;
        Ok(SessionRecord {
            id: id.clone(),
            state: session.state,
        })
    }
}

#[async_trait]
impl AgentRuntime for AdkRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Adk
    }

    fn credential_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn sessions(&self) -> &dyn SessionStore {
        self
    }

    async fn run(&self, id: &ConversationId, input: AgentInput) -> Result<EventStream, RuntimeError> {
        if input.system.is_some() {
            debug!("[{}] ADK agents own their instruction, ignoring system prompt", id);
        }

        let url = remote::endpoint(&self.base_url, &["run_sse"]);
        let request = self.client.post(url).json(&self.run_request(id, &input));
        let request = remote::authorized(request, self.config.api_key.as_deref());

        remote::event_source_stream(request, |message: &MessageEvent| {
            let event: AdkEvent = serde_json::from_str(&message.data)?;
            map_event(&event)
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest {
    app_name: String,
    user_id: String,
    session_id: String,
    new_message: AdkContent,
    streaming: bool,
}

#[derive(Debug, Deserialize)]
struct AdkSession {
    #[serde(default)]
    state: SessionState,
}

/// Subset of an ADK event as serialized by the api server
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdkEvent {
    #[serde(default)]
    pub partial: Option<bool>,
    #[serde(default)]
    pub content: Option<AdkContent>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Set by the api server when the agent run raised
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AdkContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<AdkPart>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdkPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<AdkFunction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<AdkFunction>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AdkFunction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Map one ADK event into the relay's event variant.
///
/// Partial events carry streamed text; complete events are only inspected for
/// function calls and responses since their text repeats the partials.
pub fn map_event(event: &AdkEvent) -> Result<AgentEvent, RuntimeError> {
    if let Some(message) = event.error.as_ref().or(event.error_message.as_ref()) {
        return Err(RuntimeError::Remote(message.clone()));
    }

    let parts = event
        .content
        .as_ref()
        .and_then(|c| c.parts.as_deref())
        .unwrap_or_default();

    if event.partial == Some(true) {
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        return Ok(if text.is_empty() {
            AgentEvent::Unrecognized
        } else {
            AgentEvent::Token(text)
        });
    }

    for part in parts {
        if let Some(name) = part.function_call.as_ref().and_then(|f| f.name.clone()) {
            return Ok(AgentEvent::ToolStart(name));
        }
        if let Some(name) = part.function_response.as_ref().and_then(|f| f.name.clone()) {
            return Ok(AgentEvent::ToolEnd(name));
        }
    }

    Ok(AgentEvent::Unrecognized)
}
