//! OpenAI-compatible API client implementation.
//!
//! Provides a client for Chat Completions endpoints speaking the OpenAI
//! wire format. The default base URL points at OpenRouter, which fronts
//! many hosted models behind this format; any compatible endpoint works.

use super::{
    ApiClient, ChatMessage, FromEnv, GenerateOptions, MessageRole, Model, ModelResponse,
    TokenUsage, saturating_u32,
};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default OpenRouter API base URL.
pub const OPENROUTER_API_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenAI-compatible API client for creating completion models.
///
/// # Example
///
/// ```rust,ignore
/// use vigil::providers::openai::OpenAiClient;
///
/// // From environment variable OPENROUTER_API_KEY
/// let client = OpenAiClient::from_env();
///
/// // With explicit API key and custom base URL
/// let client = OpenAiClient::builder()
///     .api_key("sk-...")
///     .base_url("https://api.openai.com/v1")
///     .build();
/// ```
#[derive(Clone)]
pub struct OpenAiClient {
    http_client: reqwest::Client,
    api_key: Arc<str>,
    base_url: Arc<str>,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a new client with the given API key and the default base URL.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::builder().api_key(api_key).build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> OpenAiClientBuilder {
        OpenAiClientBuilder::default()
    }

    /// Create a completion model with the specified model ID.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let client = OpenAiClient::from_env();
    /// let model = client.completion_model("openai/gpt-4o-mini");
    /// ```
    #[must_use]
    pub fn completion_model(&self, model_id: impl Into<String>) -> CompletionModel {
        CompletionModel::new(self.clone(), model_id)
    }
}

impl ApiClient for OpenAiClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(2);

        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            headers.insert(AUTHORIZATION, value);
        }

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }
}

impl FromEnv for OpenAiClient {
    /// Create a new client from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENROUTER_API_KEY` (required): The API key
    /// - `OPENROUTER_BASE_URL` (optional): Custom base URL
    ///
    /// # Panics
    ///
    /// Panics if `OPENROUTER_API_KEY` is not set.
    fn from_env() -> Self {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .expect("OPENROUTER_API_KEY environment variable not set");

        let mut builder = Self::builder().api_key(api_key);

        if let Ok(base_url) = std::env::var("OPENROUTER_BASE_URL") {
            builder = builder.base_url(base_url);
        }

        builder.build()
    }
}

/// Builder for [`OpenAiClient`].
#[derive(Debug, Default)]
pub struct OpenAiClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl OpenAiClientBuilder {
    /// Set the API key.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set a custom base URL.
    ///
    /// Useful for OpenAI proper, Azure, local models, or proxies.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the request timeout in seconds.
    ///
    /// Default is no timeout (provider-default behavior).
    #[must_use]
    pub const fn timeout_secs(mut self, timeout: u64) -> Self {
        self.timeout_secs = Some(timeout);
        self
    }

    /// Build the client.
    ///
    /// # Panics
    ///
    /// Panics if the API key is not set or if the HTTP client fails to build.
    #[must_use]
    pub fn build(self) -> OpenAiClient {
        let api_key = self.api_key.expect("API key is required");
        let base_url = self
            .base_url
            .unwrap_or_else(|| OPENROUTER_API_BASE_URL.to_string());
        let http_client = Self::build_http_client(self.timeout_secs);

        OpenAiClient {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Build the HTTP client with configured settings.
    fn build_http_client(timeout_secs: Option<u64>) -> reqwest::Client {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(timeout));
        }

        builder.build().expect("Failed to build HTTP client")
    }
}

/// Chat Completions model.
///
/// Implements the [`Model`] trait for OpenAI-compatible Chat APIs.
#[derive(Clone)]
pub struct CompletionModel {
    client: OpenAiClient,
    model_id: String,
}

impl std::fmt::Debug for CompletionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionModel")
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

impl CompletionModel {
    /// Create a new completion model.
    pub(crate) fn new(client: OpenAiClient, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }

    /// Build the request body for the API.
    fn build_request_body(&self, messages: &[ChatMessage], options: &GenerateOptions) -> Value {
        let api_messages: Vec<Value> = messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                };
                serde_json::json!({ "role": role, "content": msg.content })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.model_id,
            "messages": api_messages,
        });

        if let Some(temp) = options.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = options.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if let Some(format) = &options.response_format {
            body["response_format"] = format.clone();
        }

        body
    }

    /// Parse the API response into a [`ModelResponse`].
    fn parse_response(&self, json: Value) -> Result<ModelResponse, LlmError> {
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                LlmError::response_format("choices[0].message.content", "missing or non-string")
            })?
            .to_string();

        let token_usage = json.get("usage").map(|usage| TokenUsage {
            input_tokens: saturating_u32(usage["prompt_tokens"].as_u64().unwrap_or(0)),
            output_tokens: saturating_u32(usage["completion_tokens"].as_u64().unwrap_or(0)),
        });

        Ok(ModelResponse {
            message: ChatMessage::assistant(content),
            token_usage,
            raw: Some(json),
        })
    }
}

#[async_trait]
impl Model for CompletionModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip(self, messages, options), fields(model = %self.model_id))]
    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        options: GenerateOptions,
    ) -> Result<ModelResponse, LlmError> {
        let body = self.build_request_body(&messages, &options);
        let url = format!("{}/chat/completions", self.client.base_url());

        debug!("Sending request to Chat Completions API");

        let response = self
            .client
            .http_client()
            .post(&url)
            .headers(self.client.auth_headers())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::http_status(status.as_u16(), error_text));
        }

        let json: Value = response.json().await?;
        debug!(response = %json, "Chat Completions API response");
        self.parse_response(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = OpenAiClient::builder()
            .api_key("test-key")
            .base_url("https://custom.api.com/v1")
            .timeout_secs(30)
            .build();

        assert_eq!(client.base_url(), "https://custom.api.com/v1");
    }

    #[test]
    fn test_default_base_url() {
        let client = OpenAiClient::new("test-key");
        assert_eq!(client.base_url(), OPENROUTER_API_BASE_URL);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = OpenAiClient::new("sk-secret");
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_build_request_body() {
        let model = OpenAiClient::new("k").completion_model("gpt-4o-mini");
        let messages = vec![ChatMessage::user("hello")];
        let options = GenerateOptions::new()
            .with_temperature(0.0)
            .with_response_format(serde_json::json!({"type": "json_object"}));

        let body = model.build_request_body(&messages, &options);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_response() {
        let model = OpenAiClient::new("k").completion_model("gpt-4o-mini");
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "ok"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        });

        let response = model.parse_response(json).unwrap();
        assert_eq!(response.text(), "ok");
        assert_eq!(response.token_usage, Some(TokenUsage::new(12, 3)));
    }

    #[test]
    fn test_parse_response_missing_content() {
        let model = OpenAiClient::new("k").completion_model("gpt-4o-mini");
        let json = serde_json::json!({"choices": []});

        assert!(model.parse_response(json).is_err());
    }
}
