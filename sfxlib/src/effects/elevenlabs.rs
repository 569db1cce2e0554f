//! ElevenLabs sound generation client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result, UpstreamError};

use super::{AudioStream, SoundEffectProvider, SoundEffectRequest};

const PROVIDER: &str = "elevenlabs";
const XI_API_KEY_HEADER: &str = "xi-api-key";

/// Configuration for the ElevenLabs client.
#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    /// API key. May be empty; the client rejects it on first use.
    pub api_key: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl ElevenLabsConfig {
    /// Default ElevenLabs API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.elevenlabs.io";

    /// Creates a new configuration with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads `ELEVENLABS_API_KEY` and the optional `ELEVENLABS_BASE_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("ELEVENLABS_API_KEY").unwrap_or_default(),
            base_url: std::env::var("ELEVENLABS_BASE_URL")
                .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_owned()),
            timeout_secs: Some(120),
        }
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            timeout_secs: Some(120),
        }
    }
}

/// ElevenLabs API client.
#[derive(Debug, Clone)]
pub struct ElevenLabs {
    config: Arc<ElevenLabsConfig>,
    client: Client,
}

impl ElevenLabs {
    /// Create a new client with the given configuration.
    pub fn new(config: ElevenLabsConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ElevenLabsConfig::from_env())
    }

    /// Build the sound generation URL.
    pub(crate) fn sound_generation_url(&self) -> String {
        format!("{}/v1/sound-generation", self.config.base_url.trim_end_matches('/'))
    }

    /// Parse an error response from ElevenLabs.
    ///
    /// Bodies look like `{"detail": {"status": "...", "message": "..."}}`, or
    /// `{"detail": [{"msg": "..."}]}` for validation failures.
    pub(crate) fn parse_error(status: u16, body: &str) -> UpstreamError {
        match status {
            401 => return UpstreamError::auth(PROVIDER, detail_message(body).unwrap_or_default()),
            429 => return UpstreamError::rate_limited(PROVIDER),
            _ => {}
        }

        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return UpstreamError::http_status(status, body.to_owned());
        };

        match value.get("detail") {
            Some(Value::Object(detail)) => {
                let message = detail
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(body)
                    .to_owned();
                match detail.get("status").and_then(Value::as_str) {
                    Some(code) => UpstreamError::provider_code(PROVIDER, code, message),
                    None => UpstreamError::provider(PROVIDER, message),
                }
            }
            Some(Value::Array(_) | Value::String(_)) => {
                UpstreamError::provider(PROVIDER, detail_message(body).unwrap_or_default())
            }
            _ => UpstreamError::http_status(status, body.to_owned()),
        }
    }
}

/// Flatten the `detail` field of an error body into one line.
fn detail_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("message").and_then(Value::as_str).map(str::to_owned),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    }
}

#[async_trait]
impl SoundEffectProvider for ElevenLabs {
    async fn generate(&self, request: &SoundEffectRequest) -> Result<AudioStream> {
        if self.config.api_key.is_empty() {
            return Err(UpstreamError::auth(
                PROVIDER,
                "ELEVENLABS_API_KEY environment variable not set",
            )
            .into());
        }

        let url = self.sound_generation_url();
        debug!(%url, chars = request.text.len(), "requesting sound generation");

        let response = self
            .client
            .post(&url)
            .header(XI_API_KEY_HEADER, &self.config.api_key)
            .header("Accept", "audio/mpeg")
            .json(request)
            .send()
            .await
            .map_err(UpstreamError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Error::from(UpstreamError::stream(e.to_string()))));

        Ok(Box::pin(stream))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
