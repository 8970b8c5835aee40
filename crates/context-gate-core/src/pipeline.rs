//! Question-answering pipeline coordinator.
//!
//! Owns no state beyond its collaborators. One [`Pipeline::answer`] call
//! embeds the question, queries the index, selects context under the
//! configured policy and, only when context survives, invokes the
//! generator.

use std::sync::Arc;

use anyhow::Result;

use crate::embedding::Embedder;
use crate::generate::Generator;
use crate::models::{Confidence, ContextFragment, Policy, RetrievedFragment};
use crate::rerank::ReRanker;
use crate::select::select_context;
use crate::store::VectorIndex;

/// Fixed answer returned when no context is selected.
pub const REFUSAL: &str = "I don't have enough information to answer that yet.";

/// Candidates pulled from the index per question.
pub const DEFAULT_TOP_K: usize = 30;

/// Result of one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub confidence: Confidence,
    pub fragments: Vec<ContextFragment>,
}

impl Answer {
    pub fn is_refusal(&self) -> bool {
        self.confidence == Confidence::None
    }
}

pub struct Pipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    reranker: ReRanker,
    generator: Arc<dyn Generator>,
    top_k: usize,
    policy: Policy,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        reranker: ReRanker,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            embedder,
            index,
            reranker,
            generator,
            top_k: DEFAULT_TOP_K,
            policy: Policy::default(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Nearest-neighbour candidates for `question`, in index order.
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<RetrievedFragment>> {
        let embedding = self.embedder.embed(question).await?;
        let result = self.index.query(&embedding, top_k).await?;
        tracing::debug!(candidates = result.len(), top_k, "vector query complete");
        Ok(result.into_fragments())
    }

    /// Answer `question` using the pipeline's policy.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        self.answer_with_policy(question, self.policy).await
    }

    /// Answer `question` with an explicit policy override.
    pub async fn answer_with_policy(&self, question: &str, policy: Policy) -> Result<Answer> {
        let candidates = self.retrieve(question, self.top_k).await?;
        let selection = select_context(question, &candidates, &self.reranker, policy).await?;

        if selection.is_empty() {
            tracing::info!(policy = %policy, "no usable context; refusing");
            return Ok(Answer {
                text: REFUSAL.to_string(),
                confidence: Confidence::None,
                fragments: Vec::new(),
            });
        }

        let context = context_block(&selection.fragments);
        let text = self.generator.generate(question, &context).await?;
        tracing::info!(
            confidence = %selection.confidence,
            fragments = selection.fragments.len(),
            model = self.generator.model_name(),
            "answer generated"
        );

        Ok(Answer {
            text,
            confidence: selection.confidence,
            fragments: selection.fragments,
        })
    }
}

/// Context strings prefixed with their section label, e.g. `[Table] ...`.
pub fn context_block(fragments: &[ContextFragment]) -> Vec<String> {
    fragments
        .iter()
        .map(|f| {
            format!(
                "{} {}",
                f.fragment.metadata.section.label(),
                f.fragment.text
            )
        })
        .collect()
}
