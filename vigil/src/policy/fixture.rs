//! Deterministic in-memory policy store for tests and demos.

use super::{PolicyFragment, PolicyStore, PolicyStoreError};
use async_trait::async_trait;

/// A [`PolicyStore`] backed by a fixed fragment list.
///
/// Relevance is scored by counting query terms that occur in the fragment
/// text (both lower-cased); ties keep insertion order, so results are fully
/// deterministic. This stands in for the external vector index in tests,
/// examples, and offline runs — it is not a retrieval engine.
#[derive(Debug, Clone, Default)]
pub struct StaticPolicyStore {
    fragments: Vec<PolicyFragment>,
}

impl StaticPolicyStore {
    /// Create an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fragments: Vec::new(),
        }
    }

    /// Add a rule fragment.
    #[must_use]
    pub fn with_rule(mut self, content: impl Into<String>) -> Self {
        self.fragments.push(PolicyFragment::new(content));
        self
    }

    /// Number of stored fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Check whether the store holds no fragments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Count how many distinct query terms occur in the fragment text.
    fn score(fragment: &PolicyFragment, query_terms: &[String]) -> usize {
        let haystack = fragment.content.to_lowercase();
        query_terms
            .iter()
            .filter(|term| haystack.contains(term.as_str()))
            .count()
    }
}

#[async_trait]
impl PolicyStore for StaticPolicyStore {
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<PolicyFragment>, PolicyStoreError> {
        let query_terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|term| term.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|term| !term.is_empty())
            .collect();

        let mut scored: Vec<(usize, &PolicyFragment)> = self
            .fragments
            .iter()
            .map(|fragment| (Self::score(fragment, &query_terms), fragment))
            .collect();

        // Stable sort keeps insertion order among equally relevant rules.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, fragment)| fragment.clone())
            .collect())
    }
}
