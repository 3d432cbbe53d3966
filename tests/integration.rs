//! End-to-end tests that drive the compiled `podrag` binary against a
//! temporary corpus and config. Commands that need a live provider are
//! covered in `tests/engine.rs` with stubs; these cover the offline
//! surface: config validation, corpus listing, and index inspection.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use podrag::chunk::chunk_text;
use podrag::models::VectorIndex;
use podrag::store;

fn podrag_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("podrag");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let transcripts = root.join("transcripts");
    fs::create_dir_all(&transcripts).unwrap();
    fs::write(
        transcripts.join("ep1_transcript.txt"),
        "Paris is the capital of France.\n\nThe guest talks about visiting it.",
    )
    .unwrap();
    fs::write(
        transcripts.join("ep2_transcript.txt"),
        "Lyon is a city in France.\n\nIt comes up around minute forty.",
    )
    .unwrap();

    // Fixture files must never be ingested
    let fixtures = transcripts.join("test_data");
    fs::create_dir_all(&fixtures).unwrap();
    fs::write(fixtures.join("eval_transcript.txt"), "held-out fixture").unwrap();

    let config_content = format!(
        r#"[index]
dir = "{root}/index_store"

[corpus]
root = "{root}/transcripts"
include_globs = ["**/*.txt"]

[chunking]
max_tokens = 700

[retrieval]
top_k = 2

[embedding]
base_url = "http://127.0.0.1:1/v1"
model = "stub-embedder"
dims = 3
api_key_env = ""

[generation]
base_url = "http://127.0.0.1:1/v1"
model = "stub-generator"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("podrag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_podrag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = podrag_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run podrag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Persist a small, valid index the way a build would, without a provider.
fn persist_stub_index(index_dir: &Path) {
    let mut chunks = chunk_text("ep1_transcript.txt", "Paris is the capital of France.", 700);
    for chunk in &mut chunks {
        chunk.vector = vec![1.0, 0.0, 0.5];
    }
    let index = VectorIndex {
        embedding_model: "stub-embedder".to_string(),
        dims: 3,
        built_at: 1_700_000_000,
        chunks,
    };
    store::save(&index, index_dir).unwrap();
}

#[test]
fn test_corpus_lists_transcripts() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_podrag(&config_path, &["corpus"]);
    assert!(success, "corpus failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("documents: 2"));
    assert!(stdout.contains("ep1_transcript.txt"));
    assert!(stdout.contains("ep2_transcript.txt"));
    assert!(stdout.contains("modified"));
}

#[test]
fn test_corpus_excludes_test_data() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_podrag(&config_path, &["corpus"]);
    assert!(success);
    assert!(!stdout.contains("eval_transcript.txt"));
}

#[test]
fn test_index_status_without_persisted_index() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_podrag(&config_path, &["index", "status"]);
    assert!(success);
    assert!(stdout.contains("no persisted index"));
}

#[test]
fn test_index_status_with_persisted_index() {
    let (tmp, config_path) = setup_test_env();
    persist_stub_index(&tmp.path().join("index_store"));

    let (stdout, stderr, success) = run_podrag(&config_path, &["index", "status"]);
    assert!(success, "status failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("chunks: 1"));
    assert!(stdout.contains("model: stub-embedder"));
    assert!(stdout.contains("dims: 3"));
}

#[test]
fn test_index_status_rejects_corrupt_manifest() {
    let (tmp, config_path) = setup_test_env();
    let index_dir = tmp.path().join("index_store");
    fs::create_dir_all(&index_dir).unwrap();
    fs::write(index_dir.join(store::MANIFEST_FILE), "not json").unwrap();

    let (_, stderr, success) = run_podrag(&config_path, &["index", "status"]);
    assert!(!success);
    assert!(stderr.contains("corrupt"));
}

#[test]
fn test_placeholder_file_does_not_count_as_index() {
    let (tmp, config_path) = setup_test_env();
    let index_dir = tmp.path().join("index_store");
    fs::create_dir_all(&index_dir).unwrap();
    fs::write(index_dir.join(".gitkeep"), "").unwrap();

    let (stdout, _, success) = run_podrag(&config_path, &["index", "status"]);
    assert!(success);
    assert!(stdout.contains("no persisted index"));
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let content = fs::read_to_string(&config_path).unwrap();
    fs::write(&config_path, content.replace("dims = 3", "dims = 0")).unwrap();

    let (_, stderr, success) = run_podrag(&config_path, &["index", "status"]);
    assert!(!success);
    assert!(stderr.contains("embedding.dims must be > 0"));
}

#[test]
fn test_missing_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("nope.toml");

    let (_, _, success) = run_podrag(&config_path, &["corpus"]);
    assert!(!success);
}

#[test]
fn test_ask_rejects_empty_question() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_podrag(&config_path, &["ask", "   "]);
    assert!(!success);
    assert!(stderr.contains("must not be empty"));
}
