//! Evaluation prompt composition.

use crate::policy::PolicyFragment;
use crate::providers::ChatMessage;

/// The evaluation prompt sent to the classifier.
///
/// Composed fresh per request from the fixed instruction framing, the
/// retrieved rule fragments (retrieval order, double-newline separated),
/// and the raw user input quoted verbatim. The input is deliberately not
/// escaped or sanitized: the classifier evaluates it in-context against
/// the rules, and the defense is the rules plus classifier judgment, not
/// input filtering at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationPrompt {
    text: String,
}

impl EvaluationPrompt {
    /// Compose the prompt from the user input and retrieved fragments.
    ///
    /// Deterministic: identical inputs yield an identical prompt.
    #[must_use]
    pub fn compose(user_input: &str, fragments: &[PolicyFragment]) -> Self {
        let rules = fragments
            .iter()
            .map(|fragment| fragment.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let text = format!(
            "You are an AI security guard for an LLM gateway.\n\
             Analyze the User Input against the following Security Rules.\n\
             \n\
             Security Rules:\n\
             {rules}\n\
             \n\
             User Input: \"{user_input}\"\n"
        );

        Self { text }
    }

    /// The full prompt text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The prompt as a message list for a chat-completion call.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::user(self.text.clone())]
    }
}
