//! Classifier provider implementations.
//!
//! This module provides a unified interface for the chat-completion model
//! endpoints the guardrail pipeline consumes. Each provider implements the
//! [`Model`] trait, enabling seamless switching between providers and test
//! doubles.
//!
//! # Example
//!
//! ```rust,ignore
//! use vigil::providers::openai::OpenAiClient;
//!
//! let client = OpenAiClient::from_env();
//! let model = client.completion_model("openai/gpt-4o-mini");
//! ```

pub mod mock;
pub mod openai;

pub use mock::MockModel;
pub use openai::OpenAiClient;

use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
}

/// A single chat message sent to or received from a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The message role.
    pub role: MessageRole,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token usage information from a model response.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    /// Number of tokens in the input/prompt.
    pub input_tokens: u32,
    /// Number of tokens in the output/completion.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Create new token usage with specified counts.
    #[must_use]
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Get total token count.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Check if usage is empty (no tokens recorded).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0
    }
}

/// Response from a model generation call.
///
/// Contains the generated message, token usage statistics, and optionally
/// the raw API response for debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The generated message.
    pub message: ChatMessage,
    /// Token usage information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    /// Raw response from the API (provider-specific).
    #[serde(skip)]
    pub raw: Option<serde_json::Value>,
}

impl ModelResponse {
    /// Create a new model response.
    #[must_use]
    pub const fn new(message: ChatMessage) -> Self {
        Self {
            message,
            token_usage: None,
            raw: None,
        }
    }

    /// Set token usage.
    #[must_use]
    pub const fn with_token_usage(mut self, usage: TokenUsage) -> Self {
        self.token_usage = Some(usage);
        self
    }

    /// Set raw response.
    #[must_use]
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Get the text content of the response.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.message.content
    }

    /// Check if the response has non-empty text content.
    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.message.content.is_empty()
    }
}

/// Options for model generation requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Temperature for sampling (0.0 to 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Response format specification (e.g., a JSON Schema constraint).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
}

impl GenerateOptions {
    /// Create new default generate options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set max tokens.
    #[must_use]
    pub const fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set response format.
    #[must_use]
    pub fn with_response_format(mut self, format: serde_json::Value) -> Self {
        self.response_format = Some(format);
        self
    }
}

/// The core trait for language model implementations.
///
/// This trait defines the interface the guardrail pipeline uses to invoke
/// its classifier. Implement it to plug in a custom provider or a test
/// double.
#[async_trait]
pub trait Model: Send + Sync {
    /// Get the model identifier (e.g., "gpt-4o-mini").
    fn model_id(&self) -> &str;

    /// Generate a response for the given messages.
    ///
    /// # Arguments
    ///
    /// * `messages` - The conversation to send
    /// * `options` - Generation options (temperature, response format, etc.)
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails or the response cannot be parsed.
    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        options: GenerateOptions,
    ) -> Result<ModelResponse, LlmError>;

    /// Get the provider name (e.g., "openai", "mock").
    fn provider(&self) -> &'static str {
        "unknown"
    }
}

/// Trait for providers that can be created from environment variables.
pub trait FromEnv: Sized {
    /// Create a new client from environment variables.
    ///
    /// # Panics
    ///
    /// Panics if required environment variables are not set.
    fn from_env() -> Self;
}

/// Base configuration for API clients.
pub trait ApiClient: Clone + Send + Sync {
    /// Get the base URL for API requests.
    fn base_url(&self) -> &str;

    /// Get the HTTP client instance.
    fn http_client(&self) -> &reqwest::Client;

    /// Build authentication headers for API requests.
    fn auth_headers(&self) -> HeaderMap;
}

/// Safely convert u64 to u32, saturating at `u32::MAX` if overflow.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn saturating_u32(value: u64) -> u32 {
    if value > u32::MAX as u64 {
        u32::MAX
    } else {
        value as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, MessageRole::System);
        assert_eq!(ChatMessage::user("u").role, MessageRole::User);
        assert_eq!(ChatMessage::assistant("a").role, MessageRole::Assistant);
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(100, 50);
        assert_eq!(usage.total(), 150);
        assert!(!usage.is_empty());
        assert!(TokenUsage::default().is_empty());
    }

    #[test]
    fn test_model_response_text() {
        let response = ModelResponse::new(ChatMessage::assistant("Hello"));
        assert_eq!(response.text(), "Hello");
        assert!(response.has_text());

        let empty = ModelResponse::new(ChatMessage::assistant(""));
        assert!(!empty.has_text());
    }

    #[test]
    fn test_generate_options_builder() {
        let opts = GenerateOptions::new()
            .with_temperature(0.0)
            .with_max_tokens(512)
            .with_response_format(serde_json::json!({"type": "json_object"}));

        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(512));
        assert!(opts.response_format.is_some());
    }

    #[test]
    fn test_saturating_u32() {
        assert_eq!(saturating_u32(0), 0);
        assert_eq!(saturating_u32(100), 100);
        assert_eq!(saturating_u32(u64::MAX), u32::MAX);
    }
}
