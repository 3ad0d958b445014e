use futures::StreamExt;
use reqwest::{RequestBuilder, Response, Url};
use reqwest_eventsource::{retry::Never, Error as SseError, Event, EventSource};
use tracing::debug;

use crate::{AgentEvent, EventStream, RuntimeError};

pub(crate) use eventsource_stream::Event as MessageEvent;

pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, RuntimeError> {
    let url = Url::parse(base_url).map_err(|e| RuntimeError::InvalidUrl(format!("{}: {}", base_url, e)))?;
    if url.cannot_be_a_base() {
        return Err(RuntimeError::InvalidUrl(base_url.to_string()));
    }
    Ok(url)
}

/// Append percent-encoded path segments to the runtime base url
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

pub(crate) fn authorized(builder: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => builder.bearer_auth(key),
        None => builder,
    }
}

/// Turn non-2xx responses into `RuntimeError::Status`
pub(crate) async fn ensure_success(response: Response) -> Result<Response, RuntimeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RuntimeError::Status { status, body })
}

/// Consume a remote SSE response, mapping each message with `map`.
///
/// The source never reconnects: the end of the upstream body ends the stream,
/// and the first error is yielded once before the stream stops.
pub(crate) fn event_source_stream<F>(request: RequestBuilder, mut map: F) -> Result<EventStream, RuntimeError>
where
    F: FnMut(&MessageEvent) -> Result<AgentEvent, RuntimeError> + Send + 'static,
{
    let request = request.header(reqwest::header::ACCEPT, "text/event-stream");
    let mut source = EventSource::new(request).map_err(|e| RuntimeError::Stream(e.to_string()))?;
    source.set_retry_policy(Box::new(Never));

    let stream = async_stream::stream! {
        while let Some(item) = source.next().await {
            match item {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => {
                    let mapped = map(&message);
                    let failed = mapped.is_err();
                    yield mapped;
                    if failed {
                        break;
                    }
                }
                Err(SseError::StreamEnded) => break,
                Err(SseError::InvalidStatusCode(status, response)) => {
                    let body = response.text().await.unwrap_or_default();
                    yield Err(RuntimeError::Status { status, body });
                    break;
                }
                Err(e) => {
                    yield Err(RuntimeError::Stream(e.to_string()));
                    break;
                }
            }
        }
        debug!("Closing upstream event source");
        source.close();
    };

    Ok(Box::pin(stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_segments() {
        let base = parse_base_url("http://localhost:8000/").unwrap();
        let url = endpoint(&base, &["apps", "app", "users", "a/b c", "sessions", "s"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/apps/app/users/a%2Fb%20c/sessions/s"
        );
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let base = parse_base_url("http://gateway/adk").unwrap();
        let url = endpoint(&base, &["run_sse"]);
        assert_eq!(url.as_str(), "http://gateway/adk/run_sse");
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(matches!(
            parse_base_url("mailto:agent@example.com"),
            Err(RuntimeError::InvalidUrl(_))
        ));
        assert!(parse_base_url("not a url").is_err());
    }
}
