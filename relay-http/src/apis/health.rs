use axum::{extract::State, Json};
use serde_json::{Map, Value};

use crate::ServerState;

/// Liveness probe. Reports the wrapped runtime and whether its credential is set.
pub async fn handle_health(State(state): State<ServerState>) -> Json<Value> {
    let runtime = state.session_manager.runtime();
    let kind = runtime.kind();

    let mut body = Map::new();
    body.insert("status".to_string(), Value::from("healthy"));
    body.insert("service".to_string(), Value::from(kind.service_name()));
    body.insert("version".to_string(), Value::from(env!("CARGO_PKG_VERSION")));
    body.insert(kind.credential_flag().to_string(), Value::from(runtime.credential_configured()));

    Json(Value::Object(body))
}
