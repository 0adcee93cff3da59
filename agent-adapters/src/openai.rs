//! `OpenAI` chat-completions adapter.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use futures::stream;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};

use crate::http_client::{HyperClient, build_https_client, send};
use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk, InferenceRequest,
    ModelAdapter, PromptMessage, TokenUsage,
};

/// Configuration for the `OpenAI` adapter.
#[derive(Clone)]
pub struct OpenAiConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    /// Creates a configuration using the supplied model identifier.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: "https://api.openai.com/".to_owned(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        let sanitized = sanitize_base_url(base_url.as_ref())?;
        self.base_url = sanitized;
        Ok(self)
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Supplies an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// `OpenAI` adapter that calls the chat-completions API over HTTPS.
pub struct OpenAiAdapter {
    client: HyperClient,
    endpoint: Uri,
    metadata: AdapterMetadata,
    api_key: String,
    timeout: Duration,
}

impl fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdapter {
    /// Constructs a new adapter with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the API key is missing.
    pub fn new(config: OpenAiConfig) -> AdapterResult<Self> {
        let api_key = config
            .api_key
            .ok_or_else(|| AdapterError::configuration("OpenAI adapter requires an API key"))?;

        let metadata = AdapterMetadata::new("openai", config.model.clone());
        let endpoint = format!("{}v1/chat/completions", config.base_url)
            .parse::<Uri>()
            .map_err(|err| {
                AdapterError::configuration(format!("invalid OpenAI endpoint: {err}"))
            })?;

        let client = build_https_client()?;

        Ok(Self {
            client,
            endpoint,
            metadata,
            api_key,
            timeout: config.timeout,
        })
    }

    fn build_request(&self, request: &InferenceRequest) -> ChatCompletionRequest {
        let system = request.system_prompt().map(|prompt| OpenAiMessage {
            role: "system".to_owned(),
            content: prompt.to_owned(),
        });
        let messages = system
            .into_iter()
            .chain(request.messages().iter().map(map_prompt_message))
            .collect();

        ChatCompletionRequest {
            model: self.metadata.model().to_owned(),
            messages,
            temperature: request.temperature(),
            max_tokens: request.max_output_tokens(),
            stream: false,
        }
    }
}

#[async_trait]
impl ModelAdapter for OpenAiAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        let payload = self.build_request(&request);
        let body = serde_json::to_vec(&payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode OpenAI request: {err}"))
        })?;

        let request = Request::post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .body(Body::from(body))
            .map_err(|err| {
                AdapterError::transport(format!("failed to build OpenAI request: {err}"))
            })?;

        let response: ChatCompletionResponse = send(&self.client, request, self.timeout, "OpenAI")
            .await?
            .decode("OpenAI")?;

        let (content, usage) = response.into_parts();
        let chunk = InferenceChunk::new(content, true).with_usage(usage);
        Ok(Box::pin(stream::once(async move { Ok(chunk) })))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "max_tokens")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

impl ChatCompletionResponse {
    fn into_parts(self) -> (String, Option<TokenUsage>) {
        let content = self
            .choices
            .into_iter()
            .find_map(|choice| choice.message.and_then(|message| message.content))
            .unwrap_or_default();
        let usage = self
            .usage
            .map(|usage| TokenUsage::new(usage.prompt_tokens, usage.completion_tokens));
        (content, usage)
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn map_prompt_message(message: &PromptMessage) -> OpenAiMessage {
    OpenAiMessage {
        role: message.role().to_string(),
        content: message.content().to_owned(),
    }
}

fn sanitize_base_url(input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(
            "OpenAI base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid OpenAI base URL: {err}")))?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{InferenceRequest, MessageRole, PromptMessage};

    #[test]
    fn base_url_requires_scheme() {
        let err = OpenAiConfig::new("gpt-4o-mini")
            .with_base_url("api.openai.com")
            .expect_err("missing scheme should error");

        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn sanitize_allows_trailing_slash() {
        let cfg = OpenAiConfig::new("gpt-4o-mini")
            .with_base_url("https://example.com/openai")
            .expect("valid URL");
        assert_eq!(cfg.base_url, "https://example.com/openai/");
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let err = OpenAiAdapter::new(OpenAiConfig::new("gpt-4o-mini")).expect_err("no key");
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn prompt_mapping_preserves_role() {
        let message = PromptMessage::new(MessageRole::User, "hello");
        let mapped = map_prompt_message(&message);
        assert_eq!(mapped.role, "user");
        assert_eq!(mapped.content, "hello");
    }

    #[test]
    fn response_parsing_extracts_content_and_usage() {
        let json = r#"{
            "choices": [
                { "message": { "content": "hi" } }
            ],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
        }"#;

        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        let (content, usage) = parsed.into_parts();

        assert_eq!(content, "hi");
        assert_eq!(usage, Some(TokenUsage::new(12, 3)));
    }

    #[test]
    fn response_without_usage_reports_none() {
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let (content, usage) = parsed.into_parts();
        assert!(content.is_empty());
        assert_eq!(usage, None);
    }

    #[test]
    fn build_request_prepends_system_prompt() {
        let config = OpenAiConfig::new("gpt-4o-mini").with_api_key("test_key");
        let adapter = OpenAiAdapter::new(config).expect("adapter");
        let request = InferenceRequest::from_prompt("hello")
            .unwrap()
            .with_system_prompt("You are terse")
            .with_temperature(0.2);

        let chat = adapter.build_request(&request);
        assert_eq!(chat.model, adapter.metadata.model());
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[0].content, "You are terse");
        assert_eq!(chat.temperature, Some(0.2));
        assert!(!chat.stream);
    }

    #[test]
    fn temperature_is_omitted_unless_requested() {
        let config = OpenAiConfig::new("gpt-4o-mini").with_api_key("test_key");
        let adapter = OpenAiAdapter::new(config).expect("adapter");
        let request = InferenceRequest::from_prompt("hello").unwrap();

        let chat = adapter.build_request(&request);
        assert_eq!(chat.temperature, None);
        assert_eq!(chat.max_tokens, None);
    }
}
