pub mod apis;
pub mod error;
pub mod http;
pub mod normalize;
pub mod session;
pub mod streaming;

pub use error::{ApiJson, ErrorResponse, RelayError};
pub use http::{cors_layer, router, start_server, ServerConfig, ServerState};
pub use normalize::{normalize_commands, normalize_message};
pub use session::{RequestLifecycle, SessionManager};
pub use streaming::{relay_events, sse_response, EventFormatter, StreamEvent};
