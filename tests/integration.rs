use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn libr_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("libr");
    path
}

const DATASET: &str = r#"[
  {
    "title": "Dune",
    "summary": "A desert planet where spice rules everything, and a boy who becomes more than a duke's son.",
    "themes": ["politics", "ecology"]
  },
  {
    "title": "1984",
    "summary": "A dystopia of total surveillance where even thought is a crime.",
    "themes": ["surveillance"]
  },
  {
    "title": "The Hobbit",
    "summary": "A reluctant burglar far from home finds courage, a ring, and a dragon.",
    "themes": ["adventure", "friendship"]
  }
]"#;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("books.json"), DATASET).unwrap();

    let config_content = format!(
        r#"[catalog]
path = "{root}/data/books.json"

[index]
path = "{root}/data/index.json"

[matching]
fuzzy_threshold = 0.6
fuzzy_top_k = 3
semantic_top_k = 3
"#,
        root = root.display()
    );

    let config_path = config_dir.join("librarian.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_libr(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = libr_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run libr binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_titles_lists_catalog() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_libr(&config_path, &["titles"]);
    assert!(success, "titles failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("3 books in catalog"));
    assert!(stdout.contains("Dune"));
    assert!(stdout.contains("The Hobbit"));
    assert!(stdout.contains("surveillance"));
}

#[test]
fn test_ask_exact_title_prints_verbatim_summary() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_libr(&config_path, &["ask", "Dune"]);
    assert!(success);
    assert!(stdout.contains("=== Title Match ==="));
    assert!(stdout.contains("Dune"));
    assert!(stdout.contains("=== Summary (verbatim) ==="));
    assert!(stdout.contains(
        "A desert planet where spice rules everything, and a boy who becomes more than a duke's son."
    ));
}

#[test]
fn test_ask_exact_is_case_and_whitespace_insensitive() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_libr(&config_path, &["ask", " the ", " HOBBIT "]);
    assert!(success);
    assert!(stdout.contains("=== Title Match ==="));
    assert!(stdout.contains("The Hobbit"));
}

#[test]
fn test_ask_typo_falls_back_to_fuzzy() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_libr(&config_path, &["ask", "Dyun"]);
    assert!(success);
    assert!(stdout.contains("=== Close Matches ==="));
    assert!(stdout.contains("Dune"));
    assert!(stdout.contains("=== Summary (verbatim) ==="));
}

#[test]
fn test_ask_no_match_without_embeddings() {
    let (_tmp, config_path) = setup_test_env();

    // No embedding provider configured, so a theme-only query has
    // nowhere to go after tiers 1-2.
    let (stdout, _, success) = run_libr(&config_path, &["ask", "a book about sandworms"]);
    assert!(success, "a miss must not be an error");
    assert!(stdout.contains("No match found in the catalog."));
}

#[test]
fn test_summary_returns_verbatim_text() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_libr(&config_path, &["summary", "1984"]);
    assert!(success);
    assert!(stdout.contains("A dystopia of total surveillance where even thought is a crime."));
}

#[test]
fn test_summary_tolerates_misspelled_title() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_libr(&config_path, &["summary", "The", "Hobit"]);
    assert!(success);
    assert!(stdout.contains("The Hobbit"));
    assert!(stdout.contains("A reluctant burglar far from home finds courage, a ring, and a dragon."));
}

#[test]
fn test_summary_unknown_title_is_negative_result() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_libr(&config_path, &["summary", "zzzzzzzz"]);
    assert!(success);
    assert!(stdout.contains("No match found in the catalog"));
}

#[test]
fn test_duplicate_title_dataset_fails_at_startup() {
    let (tmp, config_path) = setup_test_env();

    fs::write(
        tmp.path().join("data/books.json"),
        r#"[
            {"title": "Dune", "summary": "First."},
            {"title": "DUNE", "summary": "Second."}
        ]"#,
    )
    .unwrap();

    let (_, stderr, success) = run_libr(&config_path, &["ask", "Dune"]);
    assert!(!success, "duplicate titles must fail the load");
    assert!(stderr.contains("duplicate title"));
}

#[test]
fn test_index_build_requires_provider() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_libr(&config_path, &["index", "build"]);
    assert!(!success);
    assert!(stderr.contains("disabled"));
}

#[test]
fn test_index_status_with_disabled_provider() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_libr(&config_path, &["index", "status"]);
    assert!(success);
    assert!(stdout.contains("embedding provider: disabled"));
}

#[test]
fn test_missing_config_fails() {
    let (tmp, _) = setup_test_env();
    let bad_config = tmp.path().join("config/nope.toml");

    let (_, stderr, success) = run_libr(&bad_config, &["titles"]);
    assert!(!success);
    assert!(stderr.contains("config"));
}
