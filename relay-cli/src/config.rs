use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use relay_runtime::{
    AdkConfig, AdkRuntime, AgentRuntime, LangGraphConfig, LangGraphRuntime, MockRuntime,
};
use std::sync::Arc;
use tracing::warn;

/// Agent runtime the relay forwards turns to
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Google ADK api server
    Adk,
    /// LangGraph server
    Langgraph,
    /// In-process echo runtime
    Mock,
}

impl Backend {
    fn default_url(&self) -> &'static str {
        match self {
            Backend::Adk => "http://127.0.0.1:8000",
            Backend::Langgraph => "http://127.0.0.1:2024",
            Backend::Mock => "",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "agent-relay", version, about = "Streaming chat relay in front of agent runtimes")]
pub struct Args {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8011)]
    pub port: u16,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Comma separated list of allowed origins, `*` for any
    #[arg(long, env = "CORS_ORIGINS", default_value = "http://localhost:5173")]
    pub cors_origins: String,

    #[arg(long, env = "AGENT_BACKEND", value_enum, default_value_t = Backend::Mock)]
    pub backend: Backend,

    /// Base url of the remote runtime. Defaults to the runtime's local dev server.
    #[arg(long, env = "RUNTIME_URL")]
    pub runtime_url: Option<String>,

    #[arg(long, env = "ADK_APP_NAME", default_value = "ai-chat-backend")]
    pub adk_app_name: String,

    #[arg(long, env = "LANGGRAPH_ASSISTANT_ID", default_value = "agent")]
    pub langgraph_assistant_id: String,

    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Cap on conversations held by the in-process store
    #[arg(long, env = "MAX_SESSIONS")]
    pub max_sessions: Option<usize>,
}

impl Args {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn runtime_url(&self) -> String {
        self.runtime_url
            .clone()
            .unwrap_or_else(|| self.backend.default_url().to_string())
    }

    /// Build the configured runtime
    pub fn build_runtime(&self) -> Result<Arc<dyn AgentRuntime>> {
        let runtime: Arc<dyn AgentRuntime> = match self.backend {
            Backend::Adk => {
                let config = AdkConfig::new(self.runtime_url(), &self.adk_app_name)
                    .with_api_key(self.google_api_key.clone());
                Arc::new(AdkRuntime::new(config).context("invalid ADK runtime url")?)
            }
            Backend::Langgraph => {
                let config = LangGraphConfig::new(self.runtime_url(), &self.langgraph_assistant_id)
                    .with_api_key(self.openai_api_key.clone());
                Arc::new(LangGraphRuntime::new(config).context("invalid LangGraph runtime url")?)
            }
            Backend::Mock => Arc::new(MockRuntime::new(self.max_sessions)),
        };

        if !runtime.credential_configured() {
            warn!(
                "{} backend has no provider credential configured; requests may be rejected upstream",
                runtime.kind()
            );
        }

        Ok(runtime)
    }
}
