//! Re-ranking of vector candidates.
//!
//! [`ReRanker::re_rank`] runs five fixed stages in order:
//!
//! 1. **Cap** the vector-ordered candidates to `top_k_input` (recall knob).
//! 2. **Score** them with the configured [`RelevanceScorer`].
//! 3. **Gate**: drop fragments whose relevance is below `min_score`.
//! 4. **Sort** by final score, descending. The final score is the raw
//!    relevance, or `α·relevance + (1−α)·vector_score` when blending is on.
//! 5. **Truncate** to `top_n_output` (context budget).
//!
//! If gating removes everything the result is empty. The re-ranker never
//! relaxes the threshold or pads the output; fallback is decided by
//! [`select_context`](crate::select::select_context).

pub mod scorer;

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{RankedFragment, RetrievedFragment};

pub use scorer::{LexicalScorer, RelevanceScorer};

/// Re-ranking parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Candidates from the vector index that are scored.
    pub top_k_input: usize,
    /// Fragments kept after sorting.
    pub top_n_output: usize,
    /// Minimum relevance a fragment needs to survive gating.
    pub min_score: f64,
    pub blend_with_vector_score: bool,
    /// Weight of the relevance score when blending.
    pub blend_alpha: f64,
    /// Pairs per scorer call.
    pub batch_size: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            top_k_input: 30,
            top_n_output: 8,
            min_score: 0.15,
            blend_with_vector_score: false,
            blend_alpha: 0.5,
            batch_size: 8,
        }
    }
}

impl RerankConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n_output == 0 {
            return Err(ConfigError::ZeroOutputSize);
        }
        if self.top_n_output > self.top_k_input {
            return Err(ConfigError::OutputExceedsInput {
                top_n_output: self.top_n_output,
                top_k_input: self.top_k_input,
            });
        }
        if !(0.0..=1.0).contains(&self.blend_alpha) {
            return Err(ConfigError::AlphaOutOfRange(self.blend_alpha));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(())
    }
}

/// Re-ranking orchestrator. Holds no model logic of its own.
#[derive(Clone)]
pub struct ReRanker {
    scorer: Arc<dyn RelevanceScorer>,
    config: RerankConfig,
}

impl ReRanker {
    /// # Errors
    ///
    /// Any [`ConfigError`] reported by [`RerankConfig::validate`].
    pub fn new(scorer: Arc<dyn RelevanceScorer>, config: RerankConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { scorer, config })
    }

    pub fn config(&self) -> &RerankConfig {
        &self.config
    }

    /// Run cap → score → gate → sort → truncate over `candidates`.
    ///
    /// `candidates` must already be in vector-index order. Ties in final
    /// score keep that order.
    pub async fn re_rank(
        &self,
        query: &str,
        candidates: &[RetrievedFragment],
    ) -> Result<Vec<RankedFragment>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let capped = &candidates[..candidates.len().min(self.config.top_k_input)];

        let scored = self.scorer.score(query, capped).await?;

        let mut gated: Vec<RankedFragment> = scored
            .into_iter()
            .filter(|f| f.relevance >= self.config.min_score)
            .collect();

        tracing::debug!(
            scorer = self.scorer.name(),
            candidates = capped.len(),
            passed_gate = gated.len(),
            "re-rank gating complete"
        );

        if gated.is_empty() {
            return Ok(Vec::new());
        }

        gated.sort_by(|a, b| {
            sort_key(self.final_score(b)).total_cmp(&sort_key(self.final_score(a)))
        });

        gated.truncate(self.config.top_n_output);
        Ok(gated)
    }

    /// Score used for ordering: relevance, optionally blended with the
    /// vector score.
    ///
    /// The two scales are not normalized against each other; see the
    /// `blend_alpha` notes in the configuration docs.
    pub fn final_score(&self, fragment: &RankedFragment) -> f64 {
        if !self.config.blend_with_vector_score {
            return fragment.relevance;
        }
        let alpha = self.config.blend_alpha;
        alpha * fragment.relevance + (1.0 - alpha) * fragment.fragment.vector_score
    }
}

/// Undefined blends (`0 * inf`) sort last.
fn sort_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}
