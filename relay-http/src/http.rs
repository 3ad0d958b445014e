use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use relay_runtime::AgentRuntime;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::apis;
use crate::session::SessionManager;

/// Configuration for the HTTP server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0:8011")
    pub address: String,
    /// Origins allowed by CORS; `*` allows any origin without credentials
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn new(address: String) -> Self {
        Self {
            address,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}

/// Server state holding the session manager
#[derive(Clone)]
pub struct ServerState {
    pub session_manager: Arc<SessionManager>,
}

impl ServerState {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self {
            session_manager: Arc::new(SessionManager::new(runtime)),
        }
    }
}

/// Build the application router
pub fn router(state: ServerState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/assistant", post(apis::assistant::handle_assistant))
        .route("/chat", post(apis::chat::handle_chat))
        .route("/health", get(apis::health::handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins. Credentials are allowed unless any origin is.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(methods)
            .allow_headers(AllowHeaders::any());
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(methods)
        .allow_headers(AllowHeaders::mirror_request())
}

/// Start the HTTP server with SSE streaming
pub async fn start_server(
    config: ServerConfig,
    runtime: Arc<dyn AgentRuntime>,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = runtime.kind();

    println!("✓ Agent runtime initialized");
    println!("  Backend: \x1b[1m{}\x1b[0m", kind);
    println!(
        "  Credential: \x1b[1m{}\x1b[0m",
        if runtime.credential_configured() { "configured" } else { "missing" }
    );
    println!();

    let app = router(ServerState::new(runtime), cors_layer(&config.cors_origins));

    let listener = tokio::net::TcpListener::bind(&config.address).await?;

    println!("Server starting on \x1b[1mhttp://{}\x1b[0m", config.address);
    println!("\nAvailable endpoints:");
    println!("  \x1b[1mPOST /assistant\x1b[0m   - Command-list chat (streaming)");
    println!("  \x1b[1mPOST /chat\x1b[0m        - Native chat (streaming)");
    println!("  \x1b[1mGET  /health\x1b[0m      - Health check");
    println!("\nAllowed origins: \x1b[2m{}\x1b[0m", config.cors_origins.join(", "));
    println!("\nPress Ctrl+C to stop\n");

    info!("HTTP server listening on {} ({})", config.address, kind.service_name());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, stopping server");
}
