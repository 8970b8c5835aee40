//! Document ingestion.
//!
//! Scans `[ingest].root`, extracts body and table text, assembles each
//! document under the character budget, chunks it, embeds the fragments and
//! writes them to the index. A document whose combined text and chunking
//! strategy match the last recorded ingestion is skipped unless `full` is
//! set. A changed document's old fragments are replaced in the same
//! transaction that stores the new ones.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use context_gate_core::chunk::{chunk_document, Chunker};
use context_gate_core::document::IngestedDocument;
use context_gate_core::embedding::Embedder;
use context_gate_core::store::VectorIndex;
use context_gate_core::Section;

use crate::config::{Config, IngestConfig};
use crate::embedding::{create_embedder, DisabledEmbedder};
use crate::extract;
use crate::sqlite_index::{DocumentRecord, SqliteIndex};

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Re-index every document even if unchanged.
    pub full: bool,
    /// Count what would be written without touching the index.
    pub dry_run: bool,
    /// Maximum number of fragments written in this run.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub scanned: usize,
    pub indexed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub fragments: usize,
    pub table_fragments: usize,
}

/// A file selected for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the ingest root, `/`-separated.
    pub source_id: String,
}

/// CLI entry point for `cgate ingest`.
pub async fn run_ingest(config: &Config, options: IngestOptions) -> Result<()> {
    let index = SqliteIndex::open(config).await?;
    let embedder: Arc<dyn Embedder> = if options.dry_run {
        Arc::new(DisabledEmbedder)
    } else {
        create_embedder(&config.embedding)?
    };

    let report = ingest(config, &index, embedder.as_ref(), options).await?;

    println!("ingest{}", if options.dry_run { " (dry-run)" } else { "" });
    println!("  scanned: {} files", report.scanned);
    println!("  indexed documents: {}", report.indexed);
    println!("  unchanged: {}", report.unchanged);
    println!("  failed: {}", report.failed);
    println!(
        "  fragments: {} ({} table)",
        report.fragments, report.table_fragments
    );
    if !options.dry_run {
        println!("  total fragments in index: {}", index.count().await?);
    }
    println!("ok");

    index.close().await;
    Ok(())
}

/// Ingest every matching file under `[ingest].root` into `index`.
pub async fn ingest(
    config: &Config,
    index: &SqliteIndex,
    embedder: &dyn Embedder,
    options: IngestOptions,
) -> Result<IngestReport> {
    let chunker = config.chunking.chunker()?;
    let files = scan_files(&config.ingest)?;
    let mut report = IngestReport {
        scanned: files.len(),
        ..Default::default()
    };
    let mut budget = options.limit;

    for file in &files {
        if budget == Some(0) {
            tracing::info!("fragment limit reached; stopping");
            break;
        }

        let doc = match load_document(file, &config.ingest) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(source_id = %file.source_id, error = %e, "skipping unreadable file");
                report.failed += 1;
                continue;
            }
        };

        let hash = content_hash(&doc.combined_text);
        if !options.full && is_unchanged(index, &doc.source_id, &hash, &chunker).await? {
            tracing::debug!(source_id = %doc.source_id, "unchanged; skipping");
            report.unchanged += 1;
            continue;
        }

        let mut fragments = chunk_document(&doc, &chunker);
        let mut truncated = false;
        if let Some(remaining) = budget.as_mut() {
            truncated = fragments.len() > *remaining;
            fragments.truncate(*remaining);
            *remaining -= fragments.len();
        }
        let tables = fragments
            .iter()
            .filter(|f| f.metadata.section == Section::Table)
            .count();

        tracing::debug!(
            source_id = %doc.source_id,
            fragments = fragments.len(),
            tables,
            chars = doc.combined_text.chars().count(),
            "document chunked"
        );

        report.indexed += 1;
        report.fragments += fragments.len();
        report.table_fragments += tables;

        if options.dry_run {
            continue;
        }

        let embeddings = if fragments.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
            embedder
                .embed_many(&texts)
                .await
                .with_context(|| format!("Failed to embed {}", doc.source_id))?
        };
        // A partially stored document must not look unchanged next run.
        let record = (!truncated).then(|| DocumentRecord {
            source_id: doc.source_id.clone(),
            content_hash: hash,
            strategy: chunker.strategy().to_string(),
            fragment_count: fragments.len() as i64,
            indexed_at: chrono::Utc::now().timestamp(),
        });
        index
            .replace_source(&doc.source_id, &fragments, &embeddings, record.as_ref())
            .await
            .with_context(|| format!("Failed to store {}", doc.source_id))?;
    }

    tracing::info!(
        scanned = report.scanned,
        indexed = report.indexed,
        unchanged = report.unchanged,
        failed = report.failed,
        fragments = report.fragments,
        dry_run = options.dry_run,
        "ingestion finished"
    );

    Ok(report)
}

async fn is_unchanged(
    index: &SqliteIndex,
    source_id: &str,
    hash: &str,
    chunker: &Chunker,
) -> Result<bool> {
    Ok(index
        .document_record(source_id)
        .await?
        .is_some_and(|r| r.content_hash == hash && r.strategy == chunker.strategy()))
}

/// Extract body and optional table text and assemble the document.
pub fn load_document(file: &SourceFile, config: &IngestConfig) -> Result<IngestedDocument> {
    let body = extract::extract_file(&file.path)?;
    let tables = if config.include_tables {
        extract::read_table_sidecar(&file.path)?
    } else {
        None
    };

    let mut doc = IngestedDocument::assemble(
        &file.source_id,
        &body,
        tables.as_deref(),
        config.max_context_chars,
    );
    if let Some(name) = file.path.file_name() {
        doc.metadata.insert(
            "file_name".to_string(),
            name.to_string_lossy().into_owned().into(),
        );
    }
    Ok(doc)
}

/// SHA-256 hex digest of a document's combined text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Walk the ingest root and return matching files sorted by source id.
/// Table sidecars are never returned as documents.
pub fn scan_files(config: &IngestConfig) -> Result<Vec<SourceFile>> {
    let root = config
        .root
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("[ingest].root is not configured"))?;
    if !root.exists() {
        bail!("Ingest root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;
    let mut excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if extract::is_sidecar(path) {
            continue;
        }

        let rel_str = relative_id(root, path);
        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(SourceFile {
            path: path.to_path_buf(),
            source_id: rel_str,
        });
    }

    files.sort_by(|a, b| a.source_id.cmp(&b.source_id));
    Ok(files)
}

fn relative_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ingest_config(root: &Path) -> IngestConfig {
        IngestConfig {
            root: Some(root.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_scan_skips_sidecars_and_excluded() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::create_dir_all(root.join("node_modules")).unwrap();
        fs::write(root.join("b.md"), "b").unwrap();
        fs::write(root.join("sub/a.txt"), "a").unwrap();
        fs::write(root.join("sub/a.txt.tables.txt"), "t").unwrap();
        fs::write(root.join("node_modules/x.md"), "x").unwrap();
        fs::write(root.join("image.png"), "png").unwrap();

        let files = scan_files(&ingest_config(root)).unwrap();
        let ids: Vec<&str> = files.iter().map(|f| f.source_id.as_str()).collect();
        assert_eq!(ids, vec!["b.md", "sub/a.txt"]);
    }

    #[test]
    fn test_scan_requires_root() {
        assert!(scan_files(&IngestConfig::default()).is_err());
    }

    #[test]
    fn test_load_document_attaches_tables() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("report.txt");
        fs::write(&path, "Revenue grew.").unwrap();
        fs::write(extract::sidecar_path(&path), "Q1 | 10\nQ2 | 12").unwrap();

        let file = SourceFile {
            path: path.clone(),
            source_id: "report.txt".to_string(),
        };
        let doc = load_document(&file, &ingest_config(tmp.path())).unwrap();
        assert!(doc.combined_text.starts_with("Revenue grew."));
        assert!(doc.combined_text.ends_with("Q1 | 10\nQ2 | 12"));
        assert!(doc.table_start().is_some());
        assert_eq!(doc.metadata["file_name"], "report.txt");

        let no_tables = IngestConfig {
            include_tables: false,
            ..ingest_config(tmp.path())
        };
        let doc = load_document(&file, &no_tables).unwrap();
        assert_eq!(doc.combined_text, "Revenue grew.");
    }

    #[test]
    fn test_content_hash_is_sha256_hex() {
        let hash = content_hash("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
