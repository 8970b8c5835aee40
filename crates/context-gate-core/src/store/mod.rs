//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the only way the pipeline touches stored
//! fragments. Writes are keyed by fragment id, so re-ingesting an
//! unchanged document overwrites rows instead of duplicating them.
//!
//! A missing or empty collection is not an error: `query` returns an
//! empty [`QueryResult`] and callers treat that as a normal low-confidence
//! outcome.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::IndexError;
use crate::models::{Fragment, FragmentMetadata, RetrievedFragment};

/// Query output as parallel arrays, ordered most similar first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<FragmentMetadata>,
    /// Similarity reported by the index. Only used as an ordering key and
    /// as an optional blend input.
    pub scores: Vec<f64>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn push(&mut self, id: String, document: String, metadata: FragmentMetadata, score: f64) {
        self.ids.push(id);
        self.documents.push(document);
        self.metadatas.push(metadata);
        self.scores.push(score);
    }

    /// Zip the parallel arrays into retrieved fragments, preserving order.
    pub fn into_fragments(self) -> Vec<RetrievedFragment> {
        self.ids
            .into_iter()
            .zip(self.documents)
            .zip(self.metadatas)
            .zip(self.scores)
            .map(|(((id, text), metadata), vector_score)| RetrievedFragment {
                id,
                text,
                metadata,
                vector_score,
            })
            .collect()
    }
}

/// Durable or in-memory collection of embedded fragments.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Insert or overwrite entries by id |
/// | [`query`](VectorIndex::query) | Nearest neighbours for an embedding |
/// | [`count`](VectorIndex::count) | Number of stored entries |
/// | [`reset`](VectorIndex::reset) | Remove every entry |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite entries keyed by id.
    ///
    /// All four slices must have the same length; implementations call
    /// [`validate_upsert`] and fail with [`IndexError::LengthMismatch`]
    /// otherwise.
    async fn upsert(
        &self,
        ids: &[String],
        embeddings: &[Vec<f32>],
        metadatas: &[FragmentMetadata],
        documents: &[String],
    ) -> Result<()>;

    /// Return at most `top_k` entries, most similar first.
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<QueryResult>;

    async fn count(&self) -> Result<usize>;

    async fn reset(&self) -> Result<()>;
}

/// Check that every upsert array lines up with `ids`.
pub fn validate_upsert(
    ids: &[String],
    embeddings: &[Vec<f32>],
    metadatas: &[FragmentMetadata],
    documents: &[String],
) -> std::result::Result<(), IndexError> {
    let checks = [
        ("embeddings", embeddings.len()),
        ("metadatas", metadatas.len()),
        ("documents", documents.len()),
    ];
    for (field, actual) in checks {
        if actual != ids.len() {
            return Err(IndexError::LengthMismatch {
                field,
                ids: ids.len(),
                actual,
            });
        }
    }
    Ok(())
}

/// Write chunker output and its embeddings to an index.
pub async fn upsert_fragments(
    index: &dyn VectorIndex,
    fragments: &[Fragment],
    embeddings: &[Vec<f32>],
) -> Result<()> {
    let ids: Vec<String> = fragments.iter().map(|f| f.id.clone()).collect();
    let metadatas: Vec<FragmentMetadata> = fragments.iter().map(|f| f.metadata.clone()).collect();
    let documents: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
    index.upsert(&ids, embeddings, &metadatas, &documents).await
}
