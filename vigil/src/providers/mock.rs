//! Scripted mock model for tests and offline runs.

use super::{ChatMessage, GenerateOptions, Model, ModelResponse};
use crate::error::LlmError;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A [`Model`] test double that replays a scripted sequence of outcomes.
///
/// Each call to [`Model::generate`] consumes the next scripted entry; once
/// the script is exhausted the last entry repeats, so a single-entry script
/// behaves like a deterministic model. Requests are recorded and can be
/// inspected after the fact.
///
/// # Example
///
/// ```rust,ignore
/// let model = MockModel::new()
///     .reply(r#"{"is_safe": true, "violated_rule": "", "reason": "ok", "risk_score": 1}"#);
/// ```
#[derive(Debug, Default)]
pub struct MockModel {
    model_id: String,
    script: Vec<Result<String, LlmError>>,
    cursor: AtomicUsize,
    requests: Mutex<Vec<(Vec<ChatMessage>, GenerateOptions)>>,
}

impl MockModel {
    /// Create an empty mock with the model id "mock".
    #[must_use]
    pub fn new() -> Self {
        Self {
            model_id: "mock".to_string(),
            script: Vec::new(),
            cursor: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Append a successful text reply to the script.
    #[must_use]
    pub fn reply(mut self, text: impl Into<String>) -> Self {
        self.script.push(Ok(text.into()));
        self
    }

    /// Append a failure to the script.
    #[must_use]
    pub fn fail(mut self, error: LlmError) -> Self {
        self.script.push(Err(error));
        self
    }

    /// Number of `generate` calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Snapshot of the recorded requests.
    #[must_use]
    pub fn requests(&self) -> Vec<(Vec<ChatMessage>, GenerateOptions)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Model for MockModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider(&self) -> &'static str {
        "mock"
    }

    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        options: GenerateOptions,
    ) -> Result<ModelResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((messages, options));
        }

        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let entry = self
            .script
            .get(index.min(self.script.len().saturating_sub(1)))
            .ok_or_else(|| LlmError::internal("mock script is empty"))?;

        match entry {
            Ok(text) => Ok(ModelResponse::new(ChatMessage::assistant(text.clone()))),
            Err(error) => Err(error.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_replays_in_order() {
        let model = MockModel::new()
            .reply("first")
            .fail(LlmError::network("down"));

        let first = model
            .generate(vec![ChatMessage::user("x")], GenerateOptions::new())
            .await
            .unwrap();
        assert_eq!(first.text(), "first");

        let second = model
            .generate(vec![ChatMessage::user("x")], GenerateOptions::new())
            .await;
        assert!(second.is_err());

        // Exhausted script repeats the last entry.
        let third = model
            .generate(vec![ChatMessage::user("x")], GenerateOptions::new())
            .await;
        assert!(third.is_err());
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_errors() {
        let model = MockModel::new();
        let result = model
            .generate(vec![ChatMessage::user("x")], GenerateOptions::new())
            .await;
        assert!(result.is_err());
    }
}
