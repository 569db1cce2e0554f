//! OpenAI API client implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{Error, Result, UpstreamError};
use crate::prompts::{PromptGenerator, SYSTEM_INSTRUCTION, user_instruction};

use super::config::OpenAIConfig;
use super::types::{OpenAIChatRequest, OpenAIChatResponse, OpenAIErrorResponse, OpenAIMessage};

const PROVIDER: &str = "openai";

/// OpenAI API client.
#[derive(Debug, Clone)]
pub struct OpenAI {
    pub(crate) config: Arc<OpenAIConfig>,
    pub(crate) client: Client,
    prompt_count: usize,
}

impl OpenAI {
    /// Create a new OpenAI client with the given configuration.
    ///
    /// An empty API key is accepted here and reported on the first request.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
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
            prompt_count: crate::prompts::DEFAULT_PROMPT_COUNT,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    /// Sets how many prompts to ask for.
    #[must_use]
    pub const fn with_prompt_count(mut self, count: usize) -> Self {
        self.prompt_count = count;
        self
    }

    /// Get the model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Build the chat completions URL.
    pub(crate) fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Build the request body for a topic.
    pub(crate) fn build_body(&self, topic: &str) -> OpenAIChatRequest {
        OpenAIChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                OpenAIMessage::system(SYSTEM_INSTRUCTION),
                OpenAIMessage::user(user_instruction(topic, self.prompt_count)),
            ],
            temperature: None,
        }
    }

    /// Pull the text out of the first choice.
    pub(crate) fn parse_response(
        response: OpenAIChatResponse,
    ) -> std::result::Result<String, UpstreamError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::response_format("at least one choice", "empty choices"))?;

        if choice.finish_reason.as_deref() == Some("length") {
            warn!("completion was cut off at the token limit");
        }

        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(UpstreamError::empty_response(PROVIDER)),
        }
    }

    /// Parse an error response from OpenAI.
    pub(crate) fn parse_error(status: u16, body: &str) -> UpstreamError {
        if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(body) {
            let error = error_response.error;

            return match status {
                401 => UpstreamError::auth(PROVIDER, error.message),
                429 => UpstreamError::rate_limited(PROVIDER),
                _ => match error.code.or(error.error_type) {
                    Some(code) => UpstreamError::provider_code(PROVIDER, code, error.message),
                    None => UpstreamError::provider(PROVIDER, error.message),
                },
            };
        }

        UpstreamError::http_status(status, body.to_owned())
    }
}

#[async_trait]
impl PromptGenerator for OpenAI {
    async fn generate(&self, topic: &str) -> Result<String> {
        if self.config.api_key.is_empty() {
            return Err(
                UpstreamError::auth(PROVIDER, "OPENAI_API_KEY environment variable not set").into(),
            );
        }

        let url = self.chat_url();
        let body = self.build_body(topic);
        debug!(model = %body.model, %url, "requesting prompts");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(UpstreamError::from)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text).into());
        }

        let response_text = response.text().await.map_err(UpstreamError::from)?;
        let parsed: OpenAIChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            UpstreamError::response_format(
                "valid OpenAI response",
                format!("parse error: {e}, response: {response_text}"),
            )
        })?;
        debug!(id = ?parsed.id, model = ?parsed.model, "received completion");

        Ok(Self::parse_response(parsed)?)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::prompts::openai::types::OpenAIChoice;

    fn test_client() -> OpenAI {
        OpenAI::new(OpenAIConfig::new("test-key")).unwrap()
    }

    fn response_with(content: Option<&str>) -> OpenAIChatResponse {
        OpenAIChatResponse {
            id: None,
            model: None,
            choices: vec![OpenAIChoice {
                message: OpenAIMessage {
                    role: "assistant".to_owned(),
                    content: content.map(str::to_owned),
                },
                finish_reason: Some("stop".to_owned()),
            }],
        }
    }

    mod request_body {
        use super::*;

        #[test]
        fn carries_fixed_system_instruction_and_topic() {
            let body = test_client().build_body("rainstorm");

            assert_eq!(body.model, "gpt-4o-mini");
            assert_eq!(body.messages.len(), 2);
            assert_eq!(body.messages[0].role, "system");
            assert_eq!(body.messages[0].content.as_deref(), Some(SYSTEM_INSTRUCTION));
            let user = body.messages[1].content.as_deref().unwrap();
            assert!(user.contains("25 prompts about rainstorm"));
        }

        #[test]
        fn honours_prompt_count() {
            let body = test_client().with_prompt_count(5).build_body("forest");
            let user = body.messages[1].content.as_deref().unwrap();
            assert!(user.contains("5 prompts about forest"));
        }

        #[test]
        fn chat_url_tolerates_trailing_slash() {
            let client =
                OpenAI::new(OpenAIConfig::new("k").with_base_url("http://localhost:9000/v1/"))
                    .unwrap();
            assert_eq!(client.chat_url(), "http://localhost:9000/v1/chat/completions");
        }
    }

    mod responses {
        use super::*;

        #[test]
        fn returns_first_choice_text() {
            let text = OpenAI::parse_response(response_with(Some("1. thunder\n2. drip"))).unwrap();
            assert_eq!(text, "1. thunder\n2. drip");
        }

        #[test]
        fn null_content_is_empty_response() {
            let err = OpenAI::parse_response(response_with(None)).unwrap_err();
            assert!(matches!(err, UpstreamError::EmptyResponse { .. }));
        }

        #[test]
        fn blank_content_is_empty_response() {
            let err = OpenAI::parse_response(response_with(Some("  \n"))).unwrap_err();
            assert!(matches!(err, UpstreamError::EmptyResponse { .. }));
        }

        #[test]
        fn no_choices_is_format_error() {
            let response = OpenAIChatResponse {
                id: None,
                model: None,
                choices: Vec::new(),
            };
            let err = OpenAI::parse_response(response).unwrap_err();
            assert!(matches!(err, UpstreamError::ResponseFormat { .. }));
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn unauthorized_maps_to_auth() {
            let body = r#"{"error": {"message": "Incorrect API key", "type": "invalid_request_error", "code": "invalid_api_key"}}"#;
            let err = OpenAI::parse_error(401, body);
            assert!(matches!(err, UpstreamError::Auth { ref message, .. } if message == "Incorrect API key"));
        }

        #[test]
        fn too_many_requests_maps_to_rate_limited() {
            let body = r#"{"error": {"message": "slow down", "type": "requests"}}"#;
            assert!(matches!(
                OpenAI::parse_error(429, body),
                UpstreamError::RateLimited { .. }
            ));
        }

        #[test]
        fn other_json_errors_keep_code() {
            let body = r#"{"error": {"message": "model not found", "type": "invalid_request_error", "code": "model_not_found"}}"#;
            match OpenAI::parse_error(404, body) {
                UpstreamError::Provider { code, message, .. } => {
                    assert_eq!(code.as_deref(), Some("model_not_found"));
                    assert_eq!(message, "model not found");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[test]
        fn unparseable_body_maps_to_http_status() {
            let err = OpenAI::parse_error(503, "upstream unavailable");
            assert!(matches!(err, UpstreamError::HttpStatus { status: 503, .. }));
        }
    }

    #[tokio::test]
    async fn missing_api_key_fails_on_first_use() {
        let client = OpenAI::new(OpenAIConfig::default()).unwrap();
        let err = client.generate("rainstorm").await.unwrap_err();
        assert!(matches!(err, Error::Upstream(UpstreamError::Auth { .. })));
    }
}
