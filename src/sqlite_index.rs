//! SQLite-backed vector index.
//!
//! Embeddings are stored as little-endian `f32` BLOBs next to the fragment
//! text and its JSON metadata. Queries are brute force: every row is
//! loaded, scored by cosine similarity against the query vector, sorted
//! and truncated. That is adequate for the collection sizes a single
//! document set produces.
//!
//! The `documents` table records what was last ingested for each source
//! so that unchanged inputs can be skipped.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqliteConnection, SqlitePool};

use context_gate_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use context_gate_core::store::{validate_upsert, QueryResult, VectorIndex};
use context_gate_core::{Fragment, FragmentMetadata};

use crate::config::Config;
use crate::db;
use crate::migrate;

/// What the last ingestion of a source produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub source_id: String,
    /// SHA-256 of the combined text.
    pub content_hash: String,
    pub strategy: String,
    pub fragment_count: i64,
    pub indexed_at: i64,
}

#[derive(Clone)]
pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn document_record(&self, source_id: &str) -> Result<Option<DocumentRecord>> {
        let row = sqlx::query(
            "SELECT source_id, content_hash, strategy, fragment_count, indexed_at \
             FROM documents WHERE source_id = ?",
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| DocumentRecord {
            source_id: row.get("source_id"),
            content_hash: row.get("content_hash"),
            strategy: row.get("strategy"),
            fragment_count: row.get("fragment_count"),
            indexed_at: row.get("indexed_at"),
        }))
    }

    /// Swap a source's fragments for a new set in one transaction.
    ///
    /// The old fragments and the old document row are removed, the new
    /// fragments written, and `record` stored when given. Passing `None`
    /// leaves the source without a record so the next run re-indexes it.
    /// Nothing is changed if any step fails.
    pub async fn replace_source(
        &self,
        source_id: &str,
        fragments: &[Fragment],
        embeddings: &[Vec<f32>],
        record: Option<&DocumentRecord>,
    ) -> Result<()> {
        let ids: Vec<String> = fragments.iter().map(|f| f.id.clone()).collect();
        let metadatas: Vec<FragmentMetadata> = fragments.iter().map(|f| f.metadata.clone()).collect();
        let documents: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
        validate_upsert(&ids, embeddings, &metadatas, &documents)?;
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM fragments WHERE source_id = ?")
            .bind(source_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents WHERE source_id = ?")
            .bind(source_id)
            .execute(&mut *tx)
            .await?;
        for (i, id) in ids.iter().enumerate() {
            write_fragment(&mut *tx, id, &metadatas[i], &documents[i], &embeddings[i], now).await?;
        }
        if let Some(record) = record {
            write_document(&mut *tx, record).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn document_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    /// Fragment counts per source, largest first.
    pub async fn fragments_by_source(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT source_id, COUNT(*) AS n FROM fragments GROUP BY source_id ORDER BY n DESC, source_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| (row.get("source_id"), row.get("n")))
            .collect())
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(
        &self,
        ids: &[String],
        embeddings: &[Vec<f32>],
        metadatas: &[FragmentMetadata],
        documents: &[String],
    ) -> Result<()> {
        validate_upsert(ids, embeddings, metadatas, documents)?;
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;
        for (i, id) in ids.iter().enumerate() {
            write_fragment(&mut *tx, id, &metadatas[i], &documents[i], &embeddings[i], now).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<QueryResult> {
        let rows = sqlx::query("SELECT id, text, metadata_json, embedding FROM fragments ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut scored: Vec<(f64, usize)> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                (cosine_similarity(embedding, &vec) as f64, i)
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        let mut result = QueryResult::default();
        for (score, i) in scored {
            let row = &rows[i];
            let id: String = row.get("id");
            let metadata_json: String = row.get("metadata_json");
            let metadata: FragmentMetadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("Corrupt metadata for fragment {}", id))?;
            result.push(id, row.get("text"), metadata, score);
        }
        Ok(result)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fragments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM fragments").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM documents").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn write_fragment(
    conn: &mut SqliteConnection,
    id: &str,
    metadata: &FragmentMetadata,
    document: &str,
    embedding: &[f32],
    now: i64,
) -> Result<()> {
    let metadata_json = serde_json::to_string(metadata)?;
    sqlx::query(
        r#"
        INSERT INTO fragments (id, source_id, text, metadata_json, embedding, dims, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            source_id = excluded.source_id,
            text = excluded.text,
            metadata_json = excluded.metadata_json,
            embedding = excluded.embedding,
            dims = excluded.dims,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(id)
    .bind(&metadata.source_id)
    .bind(document)
    .bind(&metadata_json)
    .bind(vec_to_blob(embedding))
    .bind(embedding.len() as i64)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn write_document(conn: &mut SqliteConnection, record: &DocumentRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO documents (source_id, content_hash, strategy, fragment_count, indexed_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(source_id) DO UPDATE SET
            content_hash = excluded.content_hash,
            strategy = excluded.strategy,
            fragment_count = excluded.fragment_count,
            indexed_at = excluded.indexed_at
        "#,
    )
    .bind(&record.source_id)
    .bind(&record.content_hash)
    .bind(&record.strategy)
    .bind(record.fragment_count)
    .bind(record.indexed_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
