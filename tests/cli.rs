use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cgate_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cgate");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let docs_dir = root.join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    fs::write(
        docs_dir.join("alpha.md"),
        "# Alpha\n\nThe alpha service stores invoices for seven years.",
    )
    .unwrap();
    fs::write(
        docs_dir.join("beta.txt"),
        "Beta notes.\n\nDeployments happen every Tuesday after the change review.",
    )
    .unwrap();
    fs::write(docs_dir.join("beta.txt.tables.txt"), "Day | Window\nTue | 14:00").unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/cgate.sqlite"

[chunking]
chunk_size = 200
overlap = 20

[rerank]
scorer = "lexical"

[ingest]
root = "{root}/docs"

[server]
bind = "127.0.0.1:0"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("cgate.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_cgate(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = cgate_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run cgate binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cgate(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/cgate.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_cgate(&config_path, &["init"]);
    assert!(success1, "First init failed");
    let (_, _, success2) = run_cgate(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_dry_run_counts_without_embedding() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cgate(&config_path, &["ingest", "--dry-run"]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("(dry-run)"));
    assert!(stdout.contains("scanned: 2 files"));
    assert!(stdout.contains("indexed documents: 2"));
}

#[test]
fn test_ingest_without_embedder_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_cgate(&config_path, &["ingest"]);
    assert!(!success);
    assert!(stderr.contains("disabled"));
}

#[test]
fn test_stats_on_empty_index() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cgate(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Fragments:   0"));
    assert!(stdout.contains("char_window_200_overlap_20"));
}

#[test]
fn test_reset_on_empty_index() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_cgate(&config_path, &["reset"]);
    assert!(success);
    assert!(stdout.contains("Removed 0 fragments."));
}

#[test]
fn test_invalid_overlap_is_rejected() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(
        &bad,
        format!(
            "[db]\npath = \"{}/x.sqlite\"\n\n[chunking]\nchunk_size = 100\noverlap = 150\n",
            tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_cgate(&bad, &["init"]);
    assert!(!success);
    assert!(stderr.contains("overlap"));
}

#[test]
fn test_unknown_policy_flag_is_rejected() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_cgate(&config_path, &["ask", "hello", "--policy", "sometimes"]);
    assert!(!success);
    assert!(stderr.contains("unknown policy"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_cgate(&tmp.path().join("nope.toml"), &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
