use tempfile::TempDir;

use context_gate::config::{parse_config, Config};
use context_gate::sqlite_index::{DocumentRecord, SqliteIndex};
use context_gate_core::store::VectorIndex;
use context_gate_core::{Fragment, FragmentMetadata, Section};

fn test_config(tmp: &TempDir) -> Config {
    let db_path = tmp.path().join("data").join("cgate.sqlite");
    parse_config(&format!(
        r#"
[db]
path = "{}"
"#,
        db_path.display()
    ))
    .unwrap()
}

fn meta(source_id: &str, start: usize, section: Section) -> FragmentMetadata {
    FragmentMetadata {
        source_id: source_id.to_string(),
        start,
        end: start + 10,
        strategy: "char_window_800_overlap_100".to_string(),
        section,
        ..Default::default()
    }
}

async fn seed(index: &SqliteIndex) {
    index
        .upsert(
            &["a".to_string(), "b".to_string(), "c".to_string()],
            &[vec![1.0, 0.0], vec![0.7, 0.7], vec![0.0, 1.0]],
            &[
                meta("one.md", 0, Section::Text),
                meta("one.md", 700, Section::Table),
                meta("two.md", 0, Section::Text),
            ],
            &["alpha".to_string(), "beta".to_string(), "gamma".to_string()],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_empty_index_query_returns_nothing() {
    let tmp = TempDir::new().unwrap();
    let index = SqliteIndex::open(&test_config(&tmp)).await.unwrap();

    let result = index.query(&[1.0, 0.0], 5).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_query_orders_by_cosine_similarity() {
    let tmp = TempDir::new().unwrap();
    let index = SqliteIndex::open(&test_config(&tmp)).await.unwrap();
    seed(&index).await;

    let result = index.query(&[1.0, 0.1], 2).await.unwrap();
    assert_eq!(result.ids, vec!["a", "b"]);
    assert!(result.scores[0] > result.scores[1]);

    let fragments = result.into_fragments();
    assert_eq!(fragments[1].text, "beta");
    assert_eq!(fragments[1].metadata.section, Section::Table);
    assert_eq!(fragments[1].metadata.start, 700);
}

#[tokio::test]
async fn test_fragments_persist_across_connections() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);

    let index = SqliteIndex::open(&config).await.unwrap();
    seed(&index).await;
    index.close().await;

    let reopened = SqliteIndex::open(&config).await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 3);
    let result = reopened.query(&[0.0, 1.0], 1).await.unwrap();
    assert_eq!(result.ids, vec!["c"]);
    assert_eq!(result.metadatas[0].source_id, "two.md");
}

#[tokio::test]
async fn test_reupsert_overwrites_by_id() {
    let tmp = TempDir::new().unwrap();
    let index = SqliteIndex::open(&test_config(&tmp)).await.unwrap();
    seed(&index).await;
    seed(&index).await;
    assert_eq!(index.count().await.unwrap(), 3);

    index
        .upsert(
            &["a".to_string()],
            &[vec![0.0, 1.0]],
            &[meta("one.md", 0, Section::Text)],
            &["alpha v2".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(index.count().await.unwrap(), 3);

    let result = index.query(&[0.0, 1.0], 3).await.unwrap();
    let pos = result.ids.iter().position(|id| id == "a").unwrap();
    assert_eq!(result.documents[pos], "alpha v2");
}

#[tokio::test]
async fn test_length_mismatch_rejected_without_writing() {
    let tmp = TempDir::new().unwrap();
    let index = SqliteIndex::open(&test_config(&tmp)).await.unwrap();

    let err = index
        .upsert(
            &["a".to_string(), "b".to_string()],
            &[vec![1.0]],
            &[meta("x", 0, Section::Text), meta("x", 1, Section::Text)],
            &["a".to_string(), "b".to_string()],
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("embeddings"));
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_replace_source_swaps_fragments_and_record() {
    let tmp = TempDir::new().unwrap();
    let index = SqliteIndex::open(&test_config(&tmp)).await.unwrap();
    seed(&index).await;
    assert_eq!(
        index.fragments_by_source().await.unwrap(),
        vec![("one.md".to_string(), 2), ("two.md".to_string(), 1)]
    );

    assert_eq!(index.document_record("one.md").await.unwrap(), None);
    let record = DocumentRecord {
        source_id: "one.md".to_string(),
        content_hash: "abc".to_string(),
        strategy: "char_window_800_overlap_100".to_string(),
        fragment_count: 1,
        indexed_at: 1_700_000_000,
    };
    let replacement = vec![Fragment {
        id: "d".to_string(),
        text: "delta".to_string(),
        metadata: meta("one.md", 0, Section::Text),
    }];
    index
        .replace_source("one.md", &replacement, &[vec![0.5, 0.5]], Some(&record))
        .await
        .unwrap();

    assert_eq!(index.document_record("one.md").await.unwrap(), Some(record.clone()));
    assert_eq!(index.document_count().await.unwrap(), 1);
    assert_eq!(
        index.fragments_by_source().await.unwrap(),
        vec![("one.md".to_string(), 1), ("two.md".to_string(), 1)]
    );

    // A rejected write leaves the previous state in place.
    assert!(index
        .replace_source("one.md", &replacement, &[], Some(&record))
        .await
        .is_err());
    assert_eq!(index.count().await.unwrap(), 2);
    assert_eq!(index.document_record("one.md").await.unwrap(), Some(record));

    // Without a record the source is left to be re-indexed.
    index
        .replace_source("one.md", &replacement, &[vec![0.5, 0.5]], None)
        .await
        .unwrap();
    assert_eq!(index.document_record("one.md").await.unwrap(), None);
    assert_eq!(index.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_reset_clears_fragments_and_documents() {
    let tmp = TempDir::new().unwrap();
    let index = SqliteIndex::open(&test_config(&tmp)).await.unwrap();
    seed(&index).await;

    index.reset().await.unwrap();
    assert_eq!(index.count().await.unwrap(), 0);
    assert_eq!(index.document_count().await.unwrap(), 0);
    assert!(index.query(&[1.0, 0.0], 3).await.unwrap().is_empty());
}
