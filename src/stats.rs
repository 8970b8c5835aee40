//! Index statistics and maintenance.
//!
//! `cgate stats` summarises what is indexed; `cgate reset` empties the
//! index so the next ingestion rebuilds it from scratch.

use anyhow::Result;

use context_gate_core::store::VectorIndex;

use crate::config::Config;
use crate::sqlite_index::SqliteIndex;

pub async fn run_stats(config: &Config) -> Result<()> {
    let index = SqliteIndex::open(config).await?;

    let documents = index.document_count().await?;
    let fragments = index.count().await?;
    let by_source = index.fragments_by_source().await?;
    let last_indexed: Option<i64> = sqlx::query_scalar("SELECT MAX(indexed_at) FROM documents")
        .fetch_one(index.pool())
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Context Gate: Index Stats");
    println!("=========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Strategy:    {}", config.chunking.chunker()?.strategy());
    println!();
    println!("  Documents:   {}", documents);
    println!("  Fragments:   {}", fragments);
    println!(
        "  Last ingest: {}",
        last_indexed
            .map(format_ts_relative)
            .unwrap_or_else(|| "never".to_string())
    );

    if !by_source.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<48} {:>10}", "SOURCE", "FRAGMENTS");
        println!("  {}", "-".repeat(60));
        for (source, n) in &by_source {
            println!("  {:<48} {:>10}", source, n);
        }
    }

    println!();
    index.close().await;
    Ok(())
}

pub async fn run_reset(config: &Config) -> Result<()> {
    let index = SqliteIndex::open(config).await?;
    let before = index.count().await?;
    index.reset().await?;
    tracing::info!(removed = before, "index reset");
    println!("Removed {} fragments.", before);
    index.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_ts_relative() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 7200), "2 hours ago");
        assert_eq!(format_ts_relative(now - 86400), "1 day ago");
    }
}
