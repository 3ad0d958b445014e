use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use relay_http::{cors_layer, router, ServerState, StreamEvent};
use relay_runtime::{ConversationId, MockRuntime, SessionStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let state = ServerState::new(Arc::new(MockRuntime::default()));
    router(state, cors_layer(&["http://localhost:5173".to_string()]))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Parse `data:` lines of an SSE body into frames
fn frames(body: &str) -> Vec<StreamEvent> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

fn text_of(frames: &[StreamEvent]) -> String {
    frames
        .iter()
        .filter_map(|f| match f {
            StreamEvent::Message { delta } | StreamEvent::Token { delta } => Some(delta.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn health_reports_runtime_and_credential() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "ai-agent-mock");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["mock_configured"], true);
}

#[tokio::test]
async fn assistant_streams_message_frames_then_end() {
    let response = app()
        .oneshot(post_json(
            "/assistant",
            json!({
                "commands": [{"type": "add-message", "message": {"role": "user", "parts": [{"type": "text", "text": "hello"}]}}],
                "token": "user-1"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/event-stream"));
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers["x-accel-buffering"], "no");

    let frames = frames(&body_text(response).await);
    assert_eq!(frames.last(), Some(&StreamEvent::End));
    assert!(frames[..frames.len() - 1].iter().all(|f| matches!(f, StreamEvent::Message { .. })));
    assert_eq!(text_of(&frames), "Mock response: hello");
}

#[tokio::test]
async fn image_only_commands_yield_error_then_end() {
    let response = app()
        .oneshot(post_json(
            "/assistant",
            json!({
                "commands": [{"type": "add-message", "message": {"parts": [{"type": "image", "image": "data:image/png;base64,AA"}]}}]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        frames(&body_text(response).await),
        vec![
            StreamEvent::Error {
                message: "No user message found".to_string()
            },
            StreamEvent::End,
        ]
    );
}

#[tokio::test]
async fn unknown_command_type_is_rejected_before_streaming() {
    let response = app()
        .oneshot(post_json("/assistant", json!({"commands": [{"type": "run-shell"}]})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"]["type"], "validation_error");
}

#[tokio::test]
async fn message_without_parts_is_rejected_before_streaming() {
    let response = app()
        .oneshot(post_json(
            "/assistant",
            json!({"commands": [{"type": "add-message", "message": {"role": "user"}}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/assistant")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn native_chat_streams_token_frames() {
    let response = app()
        .oneshot(post_json(
            "/chat",
            json!({"message": "hi there", "user_id": "u1", "session_id": "s1"}),
        ))
        .await
        .unwrap();

    let frames = frames(&body_text(response).await);
    assert_eq!(frames.last(), Some(&StreamEvent::End));
    assert!(frames[..frames.len() - 1].iter().all(|f| matches!(f, StreamEvent::Token { .. })));
    assert_eq!(text_of(&frames), "Mock response: hi there");
}

#[tokio::test]
async fn tool_results_surface_as_tool_frames() {
    let response = app()
        .oneshot(post_json(
            "/assistant",
            json!({
                "commands": [{"type": "add-tool-result", "toolCallId": "call_1", "result": {"ok": true}}]
            }),
        ))
        .await
        .unwrap();

    let frames = frames(&body_text(response).await);
    assert_eq!(frames[0], StreamEvent::ToolStart { name: "call_1".to_string() });
    assert_eq!(frames[1], StreamEvent::ToolEnd { name: "call_1".to_string() });
    assert_eq!(text_of(&frames), "Mock response: Tool result: {\"ok\":true}");
}

#[tokio::test]
async fn state_seeds_a_new_session_and_turns_accumulate() {
    let runtime = Arc::new(MockRuntime::default());
    let app = router(ServerState::new(runtime.clone()), cors_layer(&["*".to_string()]));
    let request = || {
        post_json(
            "/assistant",
            json!({
                "commands": [{"type": "add-message", "message": {"parts": [{"type": "text", "text": "hi"}]}}],
                "token": "shared",
                "state": {"plan": "pro"}
            }),
        )
    };

    body_text(app.clone().oneshot(request()).await.unwrap()).await;
    body_text(app.oneshot(request()).await.unwrap()).await;

    let id = ConversationId::from_token(Some("shared"));
    let record = runtime.store().get(&id).await.unwrap().unwrap();
    assert_eq!(record.state.get("plan"), Some(&json!("pro")));
    assert_eq!(record.state.get("turns"), Some(&json!(2)));
}
