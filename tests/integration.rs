use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn qlab_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_qlab"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    // Transcripts, one with a bad date
    let files_dir = root.join("Powell");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("FOMCpresconf20180613.json"),
        r#"{"statement":{"Speaker A":"text"},"qna":[{"question":{"Reporter":"Q1?"},"response":{"Speaker A":"A1."}}]}"#,
    )
    .unwrap();
    fs::write(
        files_dir.join("FOMCpresconf20190130.json"),
        r#"{"statement":{"Chair Powell":"Good afternoon."},"qna":[
            {"question":{"Reporter One":"On rates?"},"response":{"Chair Powell":"We are patient."}},
            {"question":{"Reporter Two":"Missing answer"}}
        ]}"#,
    )
    .unwrap();
    fs::write(
        files_dir.join("FOMCpresconf99999999.json"),
        r#"{"statement":{"Chair":"Never stored."}}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/qlab.sqlite"

[ingest]
root = "{}/Powell"

[server]
bind = "127.0.0.1:7340"
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("qlab.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_qlab(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = qlab_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run qlab binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_qlab(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_qlab(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_qlab(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_reports_counts() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_qlab(&config_path, &["ingest", "--progress", "off"]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("scanned: 3 files"), "{}", stdout);
    assert!(stdout.contains("inserted documents: 2"), "{}", stdout);
    assert!(stdout.contains("inserted qna items: 2"), "{}", stdout);
    assert!(stdout.contains("rejected: 1"), "{}", stdout);
    assert!(stdout.contains("FOMCpresconf99999999.json"), "{}", stdout);
    assert!(stdout.contains("ok"));
}

#[test]
fn test_ingest_twice_no_duplicates() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout1, _, _) = run_qlab(&config_path, &["ingest", "--progress", "off"]);
    assert!(stdout1.contains("inserted documents: 2"));

    let (stdout2, _, success) = run_qlab(&config_path, &["ingest", "--progress", "off"]);
    assert!(success);
    assert!(stdout2.contains("inserted documents: 0"), "{}", stdout2);
    assert!(stdout2.contains("duplicates skipped: 2"), "{}", stdout2);

    let (stats, _, _) = run_qlab(&config_path, &["stats"]);
    assert!(stats.contains("Documents:   2"), "{}", stats);
    assert!(stats.contains("QnA items:   2"), "{}", stats);
}

#[test]
fn test_next_label_stats_cycle() {
    let (_tmp, config_path) = setup_test_env();
    run_qlab(&config_path, &["ingest", "--progress", "off"]);

    let (stdout, _, success) = run_qlab(&config_path, &["next", "--actor", "alice"]);
    assert!(success);
    assert!(stdout.contains("--- QnA "), "{}", stdout);

    let (stdout, stderr, success) =
        run_qlab(&config_path, &["label", "1", "relevant", "--actor", "alice"]);
    assert!(success, "label failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("labeled-relevant"));
    assert!(stdout.contains("remaining: 1"));
    assert!(stdout.contains("labeled by you: 1"));

    let (stdout, _, success) = run_qlab(&config_path, &["stats", "--actor", "alice"]);
    assert!(success);
    assert!(stdout.contains("Labeled:     1 / 2 (50%)"), "{}", stdout);
    assert!(stdout.contains("relevant:   1"), "{}", stdout);

    let (stdout, _, success) = run_qlab(&config_path, &["get", "1"]);
    assert!(success);
    assert!(stdout.contains("state:       labeled-relevant"), "{}", stdout);
    assert!(stdout.contains("labeled_by:  alice"), "{}", stdout);
}

#[test]
fn test_label_unknown_item_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_qlab(&config_path, &["ingest", "--progress", "off"]);

    let (_, stderr, success) =
        run_qlab(&config_path, &["label", "999", "irrelevant", "--actor", "alice"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "{}", stderr);
}

#[test]
fn test_reset_requires_confirmation() {
    let (_tmp, config_path) = setup_test_env();
    run_qlab(&config_path, &["ingest", "--progress", "off"]);

    let (_, stderr, success) = run_qlab(&config_path, &["reset"]);
    assert!(!success);
    assert!(stderr.contains("--yes"), "{}", stderr);

    let (stats, _, _) = run_qlab(&config_path, &["stats"]);
    assert!(stats.contains("Documents:   2"), "{}", stats);

    let (stdout, _, success) = run_qlab(&config_path, &["reset", "--yes"]);
    assert!(success);
    assert!(stdout.contains("reset"));

    let (stats, _, _) = run_qlab(&config_path, &["stats"]);
    assert!(stats.contains("Documents:   0"), "{}", stats);
}
