//! In-memory [`VectorIndex`] for tests and embedded use.
//!
//! Entries live in insertion order behind a `RwLock`. Queries are
//! brute-force cosine similarity; ties keep insertion order.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::FragmentMetadata;

use super::{validate_upsert, QueryResult, VectorIndex};

struct Entry {
    id: String,
    embedding: Vec<f32>,
    metadata: FragmentMetadata,
    document: String,
}

/// Non-persistent vector index.
#[derive(Default)]
pub struct InMemoryIndex {
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory index lock poisoned")
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(
        &self,
        ids: &[String],
        embeddings: &[Vec<f32>],
        metadatas: &[FragmentMetadata],
        documents: &[String],
    ) -> Result<()> {
        validate_upsert(ids, embeddings, metadatas, documents)?;

        let mut entries = self.entries.write().map_err(poisoned)?;
        for (i, id) in ids.iter().enumerate() {
            let entry = Entry {
                id: id.clone(),
                embedding: embeddings[i].clone(),
                metadata: metadatas[i].clone(),
                document: documents[i].clone(),
            };
            match entries.iter_mut().find(|e| e.id == *id) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<QueryResult> {
        let entries = self.entries.read().map_err(poisoned)?;

        let mut scored: Vec<(&Entry, f64)> = entries
            .iter()
            .map(|e| (e, cosine_similarity(embedding, &e.embedding) as f64))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        let mut result = QueryResult::default();
        for (entry, score) in scored {
            result.push(
                entry.id.clone(),
                entry.document.clone(),
                entry.metadata.clone(),
                score,
            );
        }
        Ok(result)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(poisoned)?.len())
    }

    async fn reset(&self) -> Result<()> {
        self.entries.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunker;
    use crate::error::IndexError;
    use crate::models::SourceMetadata;
    use crate::store::upsert_fragments;

    fn meta(source: &str) -> FragmentMetadata {
        FragmentMetadata {
            source_id: source.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty_result() {
        let index = InMemoryIndex::new();
        let result = index.query(&[1.0, 0.0], 15).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity_and_truncates() {
        let index = InMemoryIndex::new();
        index
            .upsert(
                &["far".into(), "near".into(), "mid".into()],
                &[vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
                &[meta("a"), meta("b"), meta("c")],
                &["far doc".into(), "near doc".into(), "mid doc".into()],
            )
            .await
            .unwrap();

        let result = index.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(result.ids, vec!["near".to_string(), "mid".to_string()]);
        assert_eq!(result.documents[0], "near doc");
        assert!(result.scores[0] > result.scores[1]);
    }

    #[tokio::test]
    async fn test_upsert_length_mismatch_is_rejected() {
        let index = InMemoryIndex::new();
        let err = index
            .upsert(&["a".into(), "b".into()], &[vec![1.0]], &[meta("a")], &["x".into()])
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::LengthMismatch { .. })
        ));
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reingest_overwrites_by_id() {
        let index = InMemoryIndex::new();
        let chunker = Chunker::new(40, 10).unwrap();
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(6);
        let fragments = chunker.split(&text, &SourceMetadata::new("fox.txt"));
        let embeddings: Vec<Vec<f32>> = fragments.iter().map(|_| vec![1.0, 0.5]).collect();

        upsert_fragments(&index, &fragments, &embeddings).await.unwrap();
        let first = index.count().await.unwrap();
        assert_eq!(first, fragments.len());

        let again = chunker.split(&text, &SourceMetadata::new("fox.txt"));
        upsert_fragments(&index, &again, &embeddings).await.unwrap();
        assert_eq!(index.count().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_reset_clears_entries() {
        let index = InMemoryIndex::new();
        index
            .upsert(&["a".into()], &[vec![1.0]], &[meta("a")], &["x".into()])
            .await
            .unwrap();
        index.reset().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
