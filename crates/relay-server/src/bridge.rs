//! Per-request relay from the upstream event stream to the inbound client.
//!
//! The response body owns the upstream [`FrameStream`]. When the client goes
//! away axum drops the body, the receiver goes with it, and the upstream
//! reader stops at its next send.

use std::convert::Infallible;
use std::fmt;
use std::time::Instant;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use relay_httpx::{FrameStream, ResponseBody, StreamEvent, UpstreamResponse};
use tracing::{debug, info, warn};

use crate::completion::Completion;
use crate::{BridgeError, OpenAiUpstream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Init,
    Authenticated,
    Forwarding,
    Completed,
    Aborted,
}

impl BridgeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Authenticated => "authenticated",
            Self::Forwarding => "forwarding",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// State of one inbound completions request.
///
/// Dropping a session that never reached a terminal state logs it as a
/// client disconnect.
#[derive(Debug)]
pub struct BridgeSession {
    state: BridgeState,
    idx: String,
    user: String,
    model: String,
    frames: usize,
    started: Instant,
}

impl BridgeSession {
    pub fn new() -> Self {
        Self {
            state: BridgeState::Init,
            idx: String::new(),
            user: String::new(),
            model: String::new(),
            frames: 0,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn authenticated(&mut self, idx: &str) {
        self.idx = idx.to_string();
        self.advance(BridgeState::Authenticated);
    }

    fn advance(&mut self, next: BridgeState) {
        if self.state.is_terminal() {
            return;
        }
        debug!(idx = %self.idx, from = %self.state, to = %next, "Bridge state");
        self.state = next;
    }

    /// Ends the request with a JSON envelope. Only valid before any stream
    /// bytes were written.
    pub fn fail(mut self, err: BridgeError) -> Response {
        warn!(
            idx = %self.idx,
            state = %self.state,
            code = err.code(),
            error = %err,
            "Completions request failed"
        );
        self.advance(BridgeState::Aborted);
        err.into_response()
    }

    fn finish(&mut self, outcome: BridgeState) {
        self.advance(outcome);
        info!(
            idx = %self.idx,
            user = %self.user,
            model = %self.model,
            frames = self.frames,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            outcome = %outcome,
            "Completions relay finished"
        );
    }
}

impl Default for BridgeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BridgeSession {
    fn drop(&mut self) {
        if self.state == BridgeState::Forwarding {
            let err = BridgeError::StreamWrite;
            warn!(
                idx = %self.idx,
                frames = self.frames,
                code = err.code(),
                error = %err,
                "Client disconnected during relay"
            );
            self.state = BridgeState::Aborted;
        }
    }
}

/// Forwards `completion` upstream and turns the reply into the inbound
/// response.
pub async fn relay(
    mut session: BridgeSession,
    upstream: &OpenAiUpstream,
    completion: Completion,
) -> Response {
    session.user = completion.user.clone();
    session.model = completion.model.clone();
    session.advance(BridgeState::Forwarding);

    let response = match upstream.completions(completion.body).await {
        Ok(response) => response,
        Err(e) => return session.fail(BridgeError::Upstream(e)),
    };
    relay_response(session, response).await
}

async fn relay_response(mut session: BridgeSession, response: UpstreamResponse) -> Response {
    let mut frames = match response.body {
        ResponseBody::Streaming(frames) => frames,
        ResponseBody::Buffered(content) => {
            debug!(kind = ?content.kind(), "Upstream answered without a stream");
            session.finish(BridgeState::Completed);
            return (StatusCode::OK, Json(content.to_value())).into_response();
        }
    };

    // Nothing is committed until the first frame arrives, so an early failure
    // can still be reported as an envelope.
    let first = match frames.recv().await {
        Some(StreamEvent::Frame { data, .. }) => Some(data),
        Some(StreamEvent::Failed { error, .. }) => {
            return session.fail(BridgeError::Upstream(error));
        }
        None => None,
    };

    let body = match first {
        Some(first) => Body::from_stream(relay_frames(session, first, frames)),
        None => {
            session.finish(BridgeState::Completed);
            Body::empty()
        }
    };
    event_stream_response(body)
}

fn relay_frames(
    mut session: BridgeSession,
    first: Bytes,
    mut frames: FrameStream,
) -> impl futures::Stream<Item = Result<Bytes, Infallible>> {
    async_stream::stream! {
        session.frames += 1;
        yield Ok::<Bytes, Infallible>(first);

        let mut outcome = BridgeState::Completed;
        while let Some(event) = frames.recv().await {
            match event {
                StreamEvent::Frame { data, .. } => {
                    session.frames += 1;
                    yield Ok(data);
                }
                StreamEvent::Failed { error, trailing } => {
                    warn!(
                        error = %error,
                        code = error.code(),
                        dropped = trailing.len(),
                        "Upstream stream failed after data was sent"
                    );
                    outcome = BridgeState::Aborted;
                    break;
                }
            }
        }
        session.finish(outcome);
    }
}

fn event_stream_response(body: Body) -> Response {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use relay_httpx::{Content, StreamOptions};
    use std::time::Duration;

    fn streaming(frames: FrameStream) -> UpstreamResponse {
        UpstreamResponse {
            status: 200,
            content_length: 0,
            chunked: true,
            elapsed: Duration::ZERO,
            body: ResponseBody::Streaming(frames),
        }
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let mut session = BridgeSession::new();
        session.authenticated("123456");
        session.advance(BridgeState::Forwarding);
        session.finish(BridgeState::Aborted);
        session.advance(BridgeState::Completed);
        assert_eq!(session.state(), BridgeState::Aborted);
    }

    #[tokio::test]
    async fn test_frames_relayed_verbatim() {
        let body: &'static [u8] = b"data: {\"n\":1}\n\ndata: [DONE]\n\n";
        let frames = FrameStream::spawn(body, StreamOptions::default());

        let response = relay_response(BridgeSession::new(), streaming(frames)).await;
        assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");
        assert_eq!(response.headers()[CACHE_CONTROL], "no-cache");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), body);
    }

    #[tokio::test]
    async fn test_failure_before_first_frame_is_envelope() {
        let (writer, reader) = tokio::io::duplex(16);
        let frames = FrameStream::spawn(
            reader,
            StreamOptions {
                idle_timeout: Duration::from_millis(20),
                ..StreamOptions::default()
            },
        );

        let response = relay_response(BridgeSession::new(), streaming(frames)).await;
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error_code"], -2);
        drop(writer);
    }

    #[tokio::test]
    async fn test_failure_mid_stream_ends_body() {
        use tokio::io::AsyncWriteExt;

        let (mut writer, reader) = tokio::io::duplex(64);
        writer.write_all(b"data: 1\n\npart").await.unwrap();
        let frames = FrameStream::spawn(
            reader,
            StreamOptions {
                idle_timeout: Duration::from_millis(50),
                ..StreamOptions::default()
            },
        );

        let response = relay_response(BridgeSession::new(), streaming(frames)).await;
        assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");

        // The partial frame is dropped and no envelope is appended.
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"data: 1\n\n");
        drop(writer);
    }

    #[tokio::test]
    async fn test_buffered_reply_passes_through() {
        let response = relay_response(
            BridgeSession::new(),
            UpstreamResponse {
                status: 200,
                content_length: 2,
                chunked: false,
                elapsed: Duration::ZERO,
                body: ResponseBody::Buffered(Content::from_bytes(br#"{"id":"x"}"#)),
            },
        )
        .await;
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), br#"{"id":"x"}"#);
    }
}
