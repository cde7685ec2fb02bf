pub use crate::error::{Error, LlmError, LlmErrorKind, Result};
pub use crate::guardrail::{
    Evaluation, EvaluationPrompt, FailurePolicy, GuardrailPipeline, SecurityVerdict, VerdictSource,
};
pub use crate::policy::{PolicyFragment, PolicyStore, PolicyStoreError, StaticPolicyStore};
pub use crate::providers::{
    ChatMessage, FromEnv, GenerateOptions, MessageRole, MockModel, Model, ModelResponse,
    OpenAiClient,
};
