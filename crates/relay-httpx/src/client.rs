//! Upstream HTTP client

use std::time::{Duration, Instant};

use futures::TryStreamExt;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING,
};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tokio_util::io::StreamReader;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::agent::user_agent;
use crate::stream::{FrameStream, StreamOptions};
use crate::{Content, ContentKind, HttpError, QueryParams};

pub const DEFAULT_GET_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_POST_TIMEOUT: Duration = Duration::from_secs(3);

const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";
const EVENT_STREAM: &str = "text/event-stream";

#[derive(Debug, Clone)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    fn into_body(self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Text(text) => text,
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub payload: Option<Payload>,
    /// Time allowed to obtain response headers. Defaults by method.
    pub timeout: Option<Duration>,
    pub skip_verify: bool,
    pub expect_stream: bool,
}

impl Default for RequestSpec {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestSpec {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            payload: None,
            timeout: None,
            skip_verify: false,
            expect_stream: false,
        }
    }

    pub fn post(payload: Payload) -> Self {
        Self {
            method: Method::POST,
            payload: Some(payload),
            ..Self::get()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }

    pub fn streaming(mut self) -> Self {
        self.expect_stream = true;
        self
    }

    fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or(if self.method == Method::POST {
            DEFAULT_POST_TIMEOUT
        } else {
            DEFAULT_GET_TIMEOUT
        })
    }
}

#[derive(Debug)]
pub enum ResponseBody {
    Buffered(Content),
    Streaming(FrameStream),
}

/// A `200 OK` upstream response.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_length: u64,
    pub chunked: bool,
    pub elapsed: Duration,
    pub body: ResponseBody,
}

impl UpstreamResponse {
    /// Stream responses report `Text`, they are never decoded.
    pub fn kind(&self) -> ContentKind {
        match &self.body {
            ResponseBody::Buffered(content) => content.kind(),
            ResponseBody::Streaming(_) => ContentKind::Text,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.body, ResponseBody::Streaming(_))
    }

    pub fn into_content(self) -> Option<Content> {
        match self.body {
            ResponseBody::Buffered(content) => Some(content),
            ResponseBody::Streaming(_) => None,
        }
    }

    pub fn into_stream(self) -> Option<FrameStream> {
        match self.body {
            ResponseBody::Streaming(stream) => Some(stream),
            ResponseBody::Buffered(_) => None,
        }
    }
}

/// HTTP client bound to one base URL.
///
/// Holds a verifying and a non-verifying connection pool so that
/// `skip_verify` can be chosen per request.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    default_headers: HeaderMap,
    secure: Client,
    insecure: Client,
    stream_options: StreamOptions,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, HttpError> {
        let agent = user_agent();
        let secure = Client::builder().user_agent(agent.clone()).build()?;
        let insecure = Client::builder()
            .user_agent(agent)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            default_headers: HeaderMap::new(),
            secure,
            insecure,
            stream_options: StreamOptions::default(),
        })
    }

    /// Adds a header sent with every request from this client.
    pub fn with_default_header(mut self, name: &str, value: &str) -> Result<Self, HttpError> {
        let (name, value) = parse_header(name, value)?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    pub fn with_stream_options(mut self, options: StreamOptions) -> Self {
        self.stream_options = options;
        self
    }

    /// Joins `path` onto the base URL. Absolute `http(s)` paths bypass the base.
    pub fn build_url(&self, path: &str, params: &QueryParams) -> Result<Url, HttpError> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.is_empty() {
            self.base_url.clone()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        let mut url = Url::parse(&raw).map_err(|e| HttpError::InvalidUrl(format!("{raw}: {e}")))?;
        params.apply_to(&mut url);
        Ok(url)
    }

    pub async fn request(
        &self,
        path: &str,
        params: &QueryParams,
        spec: RequestSpec,
    ) -> Result<UpstreamResponse, HttpError> {
        let url = self.build_url(path, params)?;
        let timeout = spec.effective_timeout();
        let client = if spec.skip_verify {
            &self.insecure
        } else {
            &self.secure
        };

        let mut headers = self.default_headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        if spec.expect_stream {
            headers.insert(ACCEPT, HeaderValue::from_static(EVENT_STREAM));
        }
        for (name, value) in &spec.headers {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }

        let mut builder = client.request(spec.method.clone(), url.clone()).headers(headers);
        if spec.method == Method::POST {
            if let Some(body) = spec.payload.map(Payload::into_body) {
                if !body.is_empty() {
                    builder = builder.body(body);
                }
            }
        }

        info!(method = %spec.method, url = %url, stream = spec.expect_stream, "Upstream request");
        let started = Instant::now();
        let response = match tokio::time::timeout(timeout, builder.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_timeout() => {
                let err = HttpError::Timeout {
                    elapsed: started.elapsed(),
                };
                warn!(url = %url, error = %err, "Upstream request timed out");
                return Err(err);
            }
            Ok(Err(e)) => {
                error!(url = %url, error = %e, "Upstream request failed");
                return Err(HttpError::Transport(e));
            }
            Err(_) => {
                let err = HttpError::Timeout {
                    elapsed: started.elapsed(),
                };
                warn!(url = %url, error = %err, "Upstream request timed out");
                return Err(err);
            }
        };

        let status = response.status();
        let headers = response.headers();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let chunked = headers
            .get(TRANSFER_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
        let event_stream = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim_start().starts_with(EVENT_STREAM));

        if status != StatusCode::OK {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| HttpError::BodyRead(e.to_string()))?;
            let err = HttpError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
                body: Content::from_bytes(&bytes),
            };
            error!(url = %url, error = %err, body_len = bytes.len(), "Upstream returned error status");
            return Err(err);
        }

        if event_stream {
            let body = response.bytes_stream().map_err(std::io::Error::other);
            let reader = StreamReader::new(Box::pin(body));
            let stream = FrameStream::spawn_at(reader, self.stream_options.clone(), started);
            debug!(url = %url, chunked, "Upstream stream opened");
            return Ok(UpstreamResponse {
                status: status.as_u16(),
                content_length,
                chunked,
                elapsed: started.elapsed(),
                body: ResponseBody::Streaming(stream),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HttpError::BodyRead(e.to_string()))?;
        let content = Content::from_bytes(&bytes);
        debug!(url = %url, kind = ?content.kind(), len = bytes.len(), "Upstream response");

        Ok(UpstreamResponse {
            status: status.as_u16(),
            content_length,
            chunked,
            elapsed: started.elapsed(),
            body: ResponseBody::Buffered(content),
        })
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), HttpError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| HttpError::InvalidHeader(name.to_string()))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|_| HttpError::InvalidHeader(name.to_string()))?;
    Ok((header_name, header_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_joins_base_and_path() {
        let client = HttpClient::new("https://api.openai.com/").unwrap();
        let url = client.build_url("/v1/models", &QueryParams::new()).unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/models");

        let url = client
            .build_url("http://ip-api.com/json/1.1.1.1", &QueryParams::new().with("lang", "en"))
            .unwrap();
        assert_eq!(url.as_str(), "http://ip-api.com/json/1.1.1.1?lang=en");
    }

    #[test]
    fn test_default_timeouts_by_method() {
        assert_eq!(RequestSpec::get().effective_timeout(), DEFAULT_GET_TIMEOUT);
        assert_eq!(
            RequestSpec::post(Payload::Text(String::new())).effective_timeout(),
            DEFAULT_POST_TIMEOUT
        );
        assert_eq!(
            RequestSpec::get()
                .timeout(Duration::from_secs(30))
                .effective_timeout(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_invalid_header_rejected() {
        let result = HttpClient::new("http://localhost")
            .unwrap()
            .with_default_header("bad header", "x");
        assert!(matches!(result, Err(HttpError::InvalidHeader(_))));
    }
}
