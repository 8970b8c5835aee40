//! Relevance scorer providers.
//!
//! The cross-encoder reads each (question, fragment) pair jointly and
//! returns a raw logit: higher means more relevant, and the values are not
//! normalized. The lexical scorer from the core crate is the offline
//! alternative.

use anyhow::{bail, Result};
use std::sync::Arc;

use context_gate_core::rerank::{LexicalScorer, RelevanceScorer};

use crate::config::RerankSettings;

#[cfg(feature = "local-models")]
pub use cross_encoder::CrossEncoderScorer;

#[cfg(feature = "local-models")]
mod cross_encoder {
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    use context_gate_core::rerank::RelevanceScorer;
    use context_gate_core::{RankedFragment, RetrievedFragment};

    /// fastembed `TextRerank` over a bge-reranker model.
    ///
    /// The model is loaded on first use (downloading it if needed) and
    /// inference runs on the blocking thread pool. Scores are returned in
    /// input order; the model's own sorting is undone.
    pub struct CrossEncoderScorer {
        model_name: String,
        batch_size: usize,
        model: Arc<Mutex<Option<fastembed::TextRerank>>>,
    }

    impl CrossEncoderScorer {
        pub fn new(model_name: &str, batch_size: usize) -> Result<Self> {
            reranker_model(model_name)?;
            Ok(Self {
                model_name: model_name.to_string(),
                batch_size: batch_size.max(1),
                model: Arc::new(Mutex::new(None)),
            })
        }
    }

    fn reranker_model(name: &str) -> Result<fastembed::RerankerModel> {
        use fastembed::RerankerModel;
        match name {
            "bge-reranker-base" | "BAAI/bge-reranker-base" => Ok(RerankerModel::BGERerankerBase),
            "bge-reranker-v2-m3" | "BAAI/bge-reranker-v2-m3" => Ok(RerankerModel::BGERerankerV2M3),
            "jina-reranker-v1-turbo-en" => Ok(RerankerModel::JINARerankerV1TurboEn),
            other => bail!(
                "Unknown cross-encoder model: '{}'. Supported models: \
                 bge-reranker-base, bge-reranker-v2-m3, jina-reranker-v1-turbo-en",
                other
            ),
        }
    }

    /// Write one batch's `(index, score)` results into input order.
    ///
    /// The model returns each batch sorted by score, with `index` relative
    /// to the batch.
    pub(super) fn place_batch_scores(
        scores: &mut [f32],
        batch_no: usize,
        batch_size: usize,
        results: impl IntoIterator<Item = (usize, f32)>,
    ) -> Result<()> {
        let offset = batch_no * batch_size;
        for (index, score) in results {
            let slot = if index < batch_size {
                scores.get_mut(offset + index)
            } else {
                None
            };
            match slot {
                Some(entry) => *entry = score,
                None => bail!(
                    "cross-encoder returned index {} for batch {} of size {}",
                    index,
                    batch_no,
                    batch_size
                ),
            }
        }
        Ok(())
    }

    #[async_trait]
    impl RelevanceScorer for CrossEncoderScorer {
        fn name(&self) -> &str {
            &self.model_name
        }

        async fn score(
            &self,
            query: &str,
            fragments: &[RetrievedFragment],
        ) -> Result<Vec<RankedFragment>> {
            if fragments.is_empty() {
                return Ok(Vec::new());
            }

            let kind = reranker_model(&self.model_name)?;
            let slot = Arc::clone(&self.model);
            let batch_size = self.batch_size;
            let query = query.to_string();
            let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();

            let scores = tokio::task::spawn_blocking(move || -> Result<Vec<f32>> {
                let mut guard = slot
                    .lock()
                    .map_err(|_| anyhow::anyhow!("cross-encoder lock poisoned"))?;
                if guard.is_none() {
                    let model = fastembed::TextRerank::try_new(
                        fastembed::RerankInitOptions::new(kind).with_show_download_progress(false),
                    )
                    .map_err(|e| anyhow::anyhow!("Failed to initialize cross-encoder: {}", e))?;
                    *guard = Some(model);
                }
                let model = guard
                    .as_mut()
                    .ok_or_else(|| anyhow::anyhow!("cross-encoder unavailable"))?;

                let mut scores = vec![0.0f32; texts.len()];
                for (batch_no, batch) in texts.chunks(batch_size).enumerate() {
                    let documents: Vec<&str> = batch.iter().map(String::as_str).collect();
                    let results = model
                        .rerank(query.as_str(), &documents, false, None)
                        .map_err(|e| anyhow::anyhow!("Cross-encoder scoring failed: {}", e))?;
                    place_batch_scores(
                        &mut scores,
                        batch_no,
                        batch_size,
                        results.into_iter().map(|r| (r.index, r.score)),
                    )?;
                }
                Ok(scores)
            })
            .await??;

            tracing::debug!(
                model = %self.model_name,
                pairs = fragments.len(),
                batches = fragments.len().div_ceil(self.batch_size),
                "cross-encoder scoring complete"
            );

            Ok(fragments
                .iter()
                .zip(scores)
                .map(|(f, score)| RankedFragment::new(f.clone(), score as f64))
                .collect())
        }
    }
}

/// Create the scorer named by `[rerank].scorer`.
pub fn create_scorer(settings: &RerankSettings) -> Result<Arc<dyn RelevanceScorer>> {
    match settings.scorer.as_str() {
        "lexical" => Ok(Arc::new(LexicalScorer)),
        #[cfg(feature = "local-models")]
        "cross-encoder" => Ok(Arc::new(CrossEncoderScorer::new(
            &settings.model,
            settings.params.batch_size,
        )?)),
        #[cfg(not(feature = "local-models"))]
        "cross-encoder" => bail!("The cross-encoder scorer requires --features local-models"),
        other => bail!("Unknown rerank scorer: {}", other),
    }
}
