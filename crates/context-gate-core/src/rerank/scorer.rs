//! Relevance scoring capability.
//!
//! A [`RelevanceScorer`] assigns each `(query, fragment)` pair a relevance
//! score. It does not reorder, filter or truncate; those steps belong to
//! [`ReRanker`](super::ReRanker).

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{RankedFragment, RetrievedFragment};

/// Trait for relevance scorers (cross-encoders, rule-based scorers,
/// test doubles).
///
/// Scores are unbounded reals (model logits for cross-encoders). The
/// output must be in input order. Empty input yields empty output.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Short identifier shown in logs and stats.
    fn name(&self) -> &str;

    async fn score(
        &self,
        query: &str,
        fragments: &[RetrievedFragment],
    ) -> Result<Vec<RankedFragment>>;
}

/// Deterministic term-overlap scorer.
///
/// Relevance is the fraction of distinct query terms (lowercased
/// alphanumeric runs of two or more characters) that also occur in the
/// fragment text, so scores fall in `[0.0, 1.0]`. Needs no model and is
/// stable across runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalScorer;

impl LexicalScorer {
    pub fn relevance(query: &str, text: &str) -> f64 {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return 0.0;
        }
        let text_terms = terms(text);
        let hits = query_terms.intersection(&text_terms).count();
        hits as f64 / query_terms.len() as f64
    }
}

fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl RelevanceScorer for LexicalScorer {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn score(
        &self,
        query: &str,
        fragments: &[RetrievedFragment],
    ) -> Result<Vec<RankedFragment>> {
        Ok(fragments
            .iter()
            .map(|f| RankedFragment::new(f.clone(), Self::relevance(query, &f.text)))
            .collect())
    }
}
