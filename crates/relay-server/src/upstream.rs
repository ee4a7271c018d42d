//! OpenAI-compatible upstream API.

use relay_httpx::{
    Content, HttpClient, HttpError, Payload, QueryParams, RequestSpec, StreamOptions,
    UpstreamResponse, DEFAULT_GET_TIMEOUT,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::config::UpstreamConfig;

/// Upstream client with the API key and organization headers applied.
#[derive(Debug, Clone)]
pub struct OpenAiUpstream {
    client: HttpClient,
    config: UpstreamConfig,
}

impl OpenAiUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self, HttpError> {
        let mut client = HttpClient::new(config.openai_api_url.clone())?.with_stream_options(
            StreamOptions {
                idle_timeout: config.stream_idle_timeout(),
                ..StreamOptions::default()
            },
        );
        if !config.openai_api_key.is_empty() {
            client = client.with_default_header(
                "Authorization",
                &format!("Bearer {}", config.openai_api_key),
            )?;
        }
        if !config.openai_api_org.is_empty() {
            client = client.with_default_header("Openai-Organization", &config.openai_api_org)?;
        }
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// `GET /v1/models`.
    pub async fn models(&self) -> Result<Content, HttpError> {
        let spec = RequestSpec::get()
            .timeout(DEFAULT_GET_TIMEOUT)
            .skip_verify(self.config.skip_tls_verify);
        let response = self
            .client
            .request("/v1/models", &QueryParams::new(), spec)
            .await?;
        info!(elapsed_ms = response.elapsed.as_millis() as u64, "Models request");
        Ok(response
            .into_content()
            .unwrap_or_else(|| Content::Text(String::new())))
    }

    /// `POST /v1/chat/completions` expecting an event stream.
    pub async fn completions(&self, body: Map<String, Value>) -> Result<UpstreamResponse, HttpError> {
        let spec = RequestSpec::post(Payload::Json(Value::Object(body)))
            .streaming()
            .timeout(self.config.request_timeout())
            .skip_verify(self.config.skip_tls_verify);
        self.client
            .request("/v1/chat/completions", &QueryParams::new(), spec)
            .await
    }
}
