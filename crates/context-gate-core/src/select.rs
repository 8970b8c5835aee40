//! Context selection policy.
//!
//! Decides, in a single step, what context is safe to hand to the
//! language model:
//!
//! | Re-ranker output | Policy | Result |
//! |------------------|--------|--------|
//! | ≥ 1 fragment | any | re-ranked fragments, [`Confidence::High`] |
//! | empty | `fail_closed` | no fragments, [`Confidence::None`] |
//! | empty | `fail_open` / `hybrid` | first `top_n_output` raw candidates, [`Confidence::Low`] |
//!
//! The fallback is capped at the same `top_n_output` budget as the
//! re-ranked path.

use anyhow::Result;

use crate::models::{Confidence, ContextFragment, Policy, RetrievedFragment};
use crate::rerank::ReRanker;

/// Final context and its confidence label.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub fragments: Vec<ContextFragment>,
    pub confidence: Confidence,
}

impl Selection {
    pub fn none() -> Self {
        Self {
            fragments: Vec::new(),
            confidence: Confidence::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Re-rank `raw_candidates` and apply `policy` when nothing survives.
///
/// `raw_candidates` must be in vector-index order; the fallback takes a
/// prefix of it.
pub async fn select_context(
    query: &str,
    raw_candidates: &[RetrievedFragment],
    reranker: &ReRanker,
    policy: Policy,
) -> Result<Selection> {
    let reranked = reranker.re_rank(query, raw_candidates).await?;

    if !reranked.is_empty() {
        return Ok(Selection {
            fragments: reranked.into_iter().map(ContextFragment::from).collect(),
            confidence: Confidence::High,
        });
    }

    if policy == Policy::FailClosed {
        tracing::info!(
            candidates = raw_candidates.len(),
            "re-ranker returned nothing; fail_closed policy yields no context"
        );
        return Ok(Selection::none());
    }

    let budget = reranker.config().top_n_output;
    let fallback: Vec<ContextFragment> = raw_candidates
        .iter()
        .take(budget)
        .cloned()
        .map(ContextFragment::from)
        .collect();

    if policy == Policy::Hybrid {
        tracing::warn!(
            candidates = raw_candidates.len(),
            fallback = fallback.len(),
            "re-ranker returned nothing; falling back to raw vector matches"
        );
    }

    Ok(Selection {
        fragments: fallback,
        confidence: Confidence::Low,
    })
}
