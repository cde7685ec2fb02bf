//! Policy rule retrieval.
//!
//! The guardrail pipeline consumes the policy corpus through the
//! [`PolicyStore`] seam: a similarity-searchable collection of policy-rule
//! text fragments, queried with the raw user input and answering with the
//! `k` most relevant fragments. The vector index behind the seam is an
//! external collaborator; this crate defines only the interface and a
//! deterministic fixture implementation for tests and demos.

pub mod fixture;

pub use fixture::StaticPolicyStore;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// A unit of retrieved policy text.
///
/// A fragment represents one or more security rules. It has no identity
/// beyond its content and is fetched fresh per request, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFragment {
    /// The rule text.
    pub content: String,
}

impl PolicyFragment {
    /// Create a fragment from rule text.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl From<&str> for PolicyFragment {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

/// Errors from policy store operations.
#[derive(Debug, thiserror::Error)]
pub enum PolicyStoreError {
    /// Underlying datastore failure.
    #[error("Datastore error: {0}")]
    Datastore(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// HTTP request error.
    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// The external store answered with an error status.
    #[error("External call to store returned an error. Status: {0} Message: {1}")]
    ExternalApi(StatusCode, String),

    /// JSON error while decoding a store response.
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A similarity-searchable collection of policy-rule fragments.
///
/// Implementations are expected to be safe under concurrent read access;
/// the pipeline issues one query per evaluation and never writes.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Return the `k` fragments most relevant to `query`, most relevant
    /// first.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store is unreachable or answers
    /// malformed data.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<PolicyFragment>, PolicyStoreError>;
}
