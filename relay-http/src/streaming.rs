use axum::http::{header, HeaderName, HeaderValue};
use axum::response::sse::Event;
use axum::response::{IntoResponse, Response, Sse};
use futures::stream::{Stream, StreamExt};
use futures::FutureExt;
use relay_runtime::{AgentEvent, EventStream, RuntimeError};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error};

use crate::error::RelayError;
use crate::session::RequestLifecycle;

/// Frames sent to the client, one JSON object per SSE `data:` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Message { delta: String },
    Token { delta: String },
    ToolStart { name: String },
    ToolEnd { name: String },
    Error { message: String },
    End,
}

impl StreamEvent {
    pub fn error(err: &RelayError) -> Self {
        StreamEvent::Error {
            message: err.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            error!("Failed to serialize stream event: {}", e);
            r#"{"type":"error","message":"failed to serialize event"}"#.to_string()
        })
    }
}

/// Trait for turning runtime events into endpoint-specific frames
pub trait EventFormatter: Send {
    /// Frame carrying one chunk of generated text
    fn delta(&self, text: String) -> StreamEvent;

    /// Convert an AgentEvent into a frame.
    /// Returns None if the event should be filtered out
    fn format_event(&mut self, event: AgentEvent) -> Option<StreamEvent> {
        match event {
            AgentEvent::Token(text) if !text.is_empty() => Some(self.delta(text)),
            AgentEvent::ToolStart(name) => Some(StreamEvent::ToolStart { name }),
            AgentEvent::ToolEnd(name) => Some(StreamEvent::ToolEnd { name }),
            AgentEvent::Token(_) | AgentEvent::Unrecognized => None,
        }
    }
}

/// Relay one agent turn as frames.
///
/// `open` resolves to the runtime's event stream, or to the error that kept the
/// turn from starting. Each inbound event yields at most one frame, in arrival
/// order. A failure (including a panic inside the runtime stream) yields a single
/// `error` frame and stops consumption. `end` is always the last frame.
pub fn relay_events<O, F>(
    open: O,
    mut formatter: F,
    mut lifecycle: RequestLifecycle,
) -> impl Stream<Item = StreamEvent> + Send + 'static
where
    O: Future<Output = Result<EventStream, RelayError>> + Send + 'static,
    F: EventFormatter + 'static,
{
    async_stream::stream! {
        let opened = match AssertUnwindSafe(open).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(RelayError::Runtime(RuntimeError::Panicked(panic_message(panic)))),
        };

        match opened {
            Ok(mut events) => loop {
                let next = match AssertUnwindSafe(events.next()).catch_unwind().await {
                    Ok(next) => next,
                    Err(panic) => Some(Err(RuntimeError::Panicked(panic_message(panic)))),
                };

                match next {
                    Some(Ok(event)) => {
                        if let Some(frame) = formatter.format_event(event) {
                            lifecycle.record_frame();
                            yield frame;
                        }
                    }
                    Some(Err(e)) => {
                        let err = RelayError::Runtime(e);
                        error!("[{}] - [{}] Agent run failed: {:?}", lifecycle.request_id, lifecycle.conversation, err);
                        yield StreamEvent::error(&err);
                        break;
                    }
                    None => break,
                }
            },
            Err(err) => {
                error!("[{}] - [{}] Could not start agent run: {:?}", lifecycle.request_id, lifecycle.conversation, err);
                yield StreamEvent::error(&err);
            }
        }

        lifecycle.complete();
        yield StreamEvent::End;
    }
}

/// Wrap frames into a `text/event-stream` response
pub fn sse_response<S>(events: S) -> Response
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    let frames = events.map(|event| Ok::<_, Infallible>(Event::default().data(event.to_json())));

    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (header::CONNECTION, HeaderValue::from_static("keep-alive")),
            // Disable proxy (nginx) buffering
            (HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no")),
        ],
        Sse::new(frames),
    )
        .into_response()
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    let message = if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    debug!("Recovered panic from agent runtime: {}", message);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct MessageFormatter;

    impl EventFormatter for MessageFormatter {
        fn delta(&self, text: String) -> StreamEvent {
            StreamEvent::Message { delta: text }
        }
    }

    fn lifecycle() -> RequestLifecycle {
        RequestLifecycle::new("req".to_string(), "anonymous/anonymous".to_string())
    }

    fn events(items: Vec<Result<AgentEvent, RuntimeError>>) -> EventStream {
        Box::pin(stream::iter(items))
    }

    async fn frames<O>(open: O) -> Vec<StreamEvent>
    where
        O: Future<Output = Result<EventStream, RelayError>> + Send + 'static,
    {
        relay_events(open, MessageFormatter, lifecycle()).collect().await
    }

    fn message(delta: &str) -> StreamEvent {
        StreamEvent::Message {
            delta: delta.to_string(),
        }
    }

    #[test]
    fn frames_serialize_as_tagged_json() {
        assert_eq!(StreamEvent::End.to_json(), r#"{"type":"end"}"#);
        assert_eq!(message("foo").to_json(), r#"{"type":"message","delta":"foo"}"#);
        assert_eq!(
            StreamEvent::ToolStart { name: "search".into() }.to_json(),
            r#"{"type":"tool_start","name":"search"}"#
        );
        assert_eq!(
            StreamEvent::Token { delta: "x".into() }.to_json(),
            r#"{"type":"token","delta":"x"}"#
        );
    }

    #[tokio::test]
    async fn unrecognized_only_stream_emits_just_end() {
        let out = frames(async {
            Ok(events(vec![Ok(AgentEvent::Unrecognized), Ok(AgentEvent::Unrecognized)]))
        })
        .await;
        assert_eq!(out, vec![StreamEvent::End]);
    }

    #[tokio::test]
    async fn empty_stream_emits_just_end() {
        let out = frames(async { Ok(events(vec![])) }).await;
        assert_eq!(out, vec![StreamEvent::End]);
    }

    #[tokio::test]
    async fn partial_tokens_stream_in_order() {
        let out = frames(async {
            Ok(events(vec![
                Ok(AgentEvent::Token("foo".into())),
                Ok(AgentEvent::Token("bar".into())),
            ]))
        })
        .await;
        assert_eq!(out, vec![message("foo"), message("bar"), StreamEvent::End]);
    }

    #[tokio::test]
    async fn empty_tokens_are_skipped() {
        let out = frames(async {
            Ok(events(vec![Ok(AgentEvent::Token(String::new())), Ok(AgentEvent::Token("a".into()))]))
        })
        .await;
        assert_eq!(out, vec![message("a"), StreamEvent::End]);
    }

    #[tokio::test]
    async fn tool_frames_keep_relative_order() {
        let out = frames(async {
            Ok(events(vec![
                Ok(AgentEvent::Token("a".into())),
                Ok(AgentEvent::ToolStart("search".into())),
                Ok(AgentEvent::Unrecognized),
                Ok(AgentEvent::ToolEnd("search".into())),
                Ok(AgentEvent::Token("b".into())),
            ]))
        })
        .await;
        assert_eq!(
            out,
            vec![
                message("a"),
                StreamEvent::ToolStart { name: "search".into() },
                StreamEvent::ToolEnd { name: "search".into() },
                message("b"),
                StreamEvent::End,
            ]
        );
    }

    #[tokio::test]
    async fn failure_after_a_token_yields_one_error_then_end() {
        let out = frames(async {
            Ok(events(vec![
                Ok(AgentEvent::Token("foo".into())),
                Err(RuntimeError::Remote("upstream closed".into())),
                Ok(AgentEvent::Token("never".into())),
                Err(RuntimeError::Remote("never either".into())),
            ]))
        })
        .await;
        assert_eq!(
            out,
            vec![
                message("foo"),
                StreamEvent::Error {
                    message: "upstream closed".into()
                },
                StreamEvent::End,
            ]
        );
    }

    #[tokio::test]
    async fn open_failure_yields_error_then_end() {
        let out = frames(async { Err(RelayError::EmptyInput) }).await;
        assert_eq!(
            out,
            vec![
                StreamEvent::Error {
                    message: "No user message found".into()
                },
                StreamEvent::End,
            ]
        );
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn dropping_the_response_releases_the_runtime_stream() {
        let dropped = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(dropped.clone());
        let upstream = stream::iter(vec![Ok(AgentEvent::Token("a".into()))])
            .chain(stream::pending::<Result<AgentEvent, RuntimeError>>())
            .map(move |event| {
                let _guard = &guard;
                event
            });

        let mut relay = Box::pin(relay_events(
            async move { Ok(Box::pin(upstream) as EventStream) },
            MessageFormatter,
            lifecycle(),
        ));

        assert_eq!(relay.next().await, Some(message("a")));
        assert!(!dropped.load(Ordering::SeqCst));

        // client went away while the runtime is still producing
        drop(relay);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panicking_runtime_stream_is_contained() {
        let stream = stream::iter(vec![1, 2]).map(|i| {
            if i == 2 {
                panic!("runtime blew up");
            }
            Ok::<_, RuntimeError>(AgentEvent::Token("ok".into()))
        });
        let out = frames(async move { Ok(Box::pin(stream) as EventStream) }).await;

        assert_eq!(out.len(), 3);
        assert_eq!(out[0], message("ok"));
        assert_eq!(
            out[1],
            StreamEvent::Error {
                message: "agent runtime panicked: runtime blew up".into()
            }
        );
        assert_eq!(out[2], StreamEvent::End);
    }
}
