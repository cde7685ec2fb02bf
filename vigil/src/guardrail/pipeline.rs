//! The guardrail evaluation pipeline.

use super::recovery::{RecoveryOutcome, recover};
use super::{EvaluationPrompt, FailurePolicy, SecurityVerdict, VerdictSource};
use crate::error::LlmError;
use crate::policy::{PolicyFragment, PolicyStore};
use crate::providers::{GenerateOptions, Model};
use tracing::{debug, instrument, warn};

/// How many policy fragments are retrieved per evaluation.
const RETRIEVAL_TOP_K: usize = 2;

/// A verdict together with the pipeline tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// The canonical verdict.
    pub verdict: SecurityVerdict,
    /// Which tier resolved it.
    pub source: VerdictSource,
}

/// The retrieval-augmented guardrail pipeline.
///
/// Holds its classifier model and policy store as owned, injected
/// dependencies; construct it with test doubles to evaluate offline. Each
/// evaluation is a strictly sequential flow — retrieval, prompt
/// composition, structured call, optional raw call — with no shared
/// mutable state, so a pipeline can serve any number of concurrent
/// evaluations.
///
/// [`evaluate`](Self::evaluate) never fails: every internal error is
/// caught, logged, and degraded into a valid verdict.
#[derive(Debug, Clone)]
pub struct GuardrailPipeline<M, S> {
    model: M,
    store: S,
    failure_policy: FailurePolicy,
}

impl<M, S> GuardrailPipeline<M, S>
where
    M: Model,
    S: PolicyStore,
{
    /// Create a pipeline with the default fail-open policy.
    #[must_use]
    pub fn new(model: M, store: S) -> Self {
        Self {
            model,
            store,
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Set what happens when every classification path fails.
    #[must_use]
    pub const fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Evaluate `user_input` against the policy corpus.
    ///
    /// Always returns a verdict; failures in retrieval, classification,
    /// and recovery degrade to the configured default rather than
    /// surfacing.
    pub async fn evaluate(&self, user_input: &str) -> SecurityVerdict {
        self.evaluate_detailed(user_input).await.verdict
    }

    /// Evaluate `user_input`, also reporting which tier produced the
    /// verdict.
    #[instrument(skip(self, user_input), fields(model = %self.model.model_id()))]
    pub async fn evaluate_detailed(&self, user_input: &str) -> Evaluation {
        let fragments = self.retrieve(user_input).await;
        let prompt = EvaluationPrompt::compose(user_input, &fragments);

        let structured = self.classify_structured(&prompt).await;

        // Explicit normalization over the stage outcomes: structured
        // pass-through, then recovery tiers, then the configured default.
        match structured {
            Ok(verdict) => {
                debug!(is_safe = verdict.is_safe, "structured classifier verdict");
                Evaluation {
                    verdict,
                    source: VerdictSource::Structured,
                }
            }
            Err(error) => {
                warn!(error = %error, "structured classifier failed; attempting raw-text recovery");
                match self.classify_raw(&prompt).await {
                    RecoveryOutcome::Extracted(verdict) => Evaluation {
                        verdict,
                        source: VerdictSource::ExtractedJson,
                    },
                    RecoveryOutcome::Inferred(verdict) => Evaluation {
                        verdict,
                        source: VerdictSource::KeywordInference,
                    },
                    RecoveryOutcome::Unresolved => {
                        warn!("all recovery paths exhausted; applying default verdict");
                        Evaluation {
                            verdict: self.failure_policy.default_verdict(),
                            source: VerdictSource::Default,
                        }
                    }
                }
            }
        }
    }

    /// Fetch the most relevant rule fragments for the input.
    ///
    /// A failed or empty retrieval is not fatal: the classifier still sees
    /// the input under the fixed framing, just without rules context.
    async fn retrieve(&self, user_input: &str) -> Vec<PolicyFragment> {
        match self
            .store
            .similarity_search(user_input, RETRIEVAL_TOP_K)
            .await
        {
            Ok(fragments) => {
                if fragments.is_empty() {
                    debug!("policy retrieval returned no fragments");
                }
                fragments
            }
            Err(error) => {
                warn!(error = %error, "policy retrieval failed; proceeding with empty rules context");
                Vec::new()
            }
        }
    }

    /// Primary path: schema-constrained classification at temperature 0.
    async fn classify_structured(
        &self,
        prompt: &EvaluationPrompt,
    ) -> Result<SecurityVerdict, LlmError> {
        let options = GenerateOptions::new()
            .with_temperature(0.0)
            .with_response_format(SecurityVerdict::response_format());

        let response = self.model.generate(prompt.messages(), options).await?;
        let verdict: SecurityVerdict = serde_json::from_str(response.text())?;

        if !verdict.risk_score_in_range() {
            return Err(LlmError::response_format(
                "risk_score in [1, 10]",
                verdict.risk_score.to_string(),
            ));
        }

        Ok(verdict)
    }

    /// Fallback path: unconstrained re-invocation plus reply mining.
    async fn classify_raw(&self, prompt: &EvaluationPrompt) -> RecoveryOutcome {
        let options = GenerateOptions::new().with_temperature(0.0);

        match self.model.generate(prompt.messages(), options).await {
            Ok(response) => recover(response.text()),
            Err(error) => {
                warn!(error = %error, "raw recovery invocation failed");
                RecoveryOutcome::Unresolved
            }
        }
    }
}
