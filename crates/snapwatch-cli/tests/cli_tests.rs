//! CLI integration tests
//!
//! Drive the built `snapwatch` binary against a temporary ledger and blob
//! root.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("ledger.db")
    }

    fn blobs(&self) -> PathBuf {
        self.dir.path().join("blobs")
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        let db = self.db();
        let blobs = self.blobs();
        let mut all: Vec<&str> = args.to_vec();
        all.extend(["--db", db.to_str().unwrap(), "--blobs", blobs.to_str().unwrap()]);
        self.run_raw(&all)
    }

    fn run_raw(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_snapwatch"))
            .current_dir(self.dir.path())
            .args(args)
            .output()
            .expect("Failed to execute CLI")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "CLI failed.\nstdout: {}\nstderr: {}",
        stdout(output),
        stderr(output)
    );
}

fn product_tree(uid: &str) -> String {
    format!(
        r#"{{"entity": {{"core_module": "Product", "record_id": 7, "model_fields": {{"prod_uid": "{}"}}}}}}"#,
        uid
    )
}

fn echoed_pairs(output: &Output) -> Vec<serde_json::Value> {
    stdout(output)
        .lines()
        .filter(|line| line.starts_with('{'))
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn list_lines(ws: &Workspace) -> Vec<String> {
    let output = ws.run(&["list", "--type", "Product", "--id", "7"]);
    assert_success(&output);
    stdout(&output).lines().map(str::to_string).collect()
}

#[test]
fn test_migrate_reports_applied_migrations() {
    let ws = Workspace::new();

    let output = ws.run(&["migrate"]);
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("1 migration(s)"), "stdout: {}", out);
    assert!(out.contains("001_captures"));

    // Idempotent
    let again = ws.run(&["migrate"]);
    assert_success(&again);
    assert!(stdout(&again).contains("1 migration(s)"));
}

#[test]
fn test_record_with_echo_chains_pairs() {
    let ws = Workspace::new();
    let first = ws.write("first.json", &product_tree("ABC"));
    let second = ws.write("second.json", &product_tree("XYZ"));

    let output = ws.run(&[
        "record", "--type", "Product", "--id", "7", "--file", first.to_str().unwrap(), "--echo",
    ]);
    assert_success(&output);
    assert!(stdout(&output).contains("Recorded capture 1 for Product#7"));
    let pairs = echoed_pairs(&output);
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0]["entity"]["kind"], "Product");
    assert_eq!(pairs[0]["entity"]["id"], 7);
    assert!(pairs[0]["old"]["version"].is_null());
    let first_new = pairs[0]["new"].clone();
    assert_eq!(first_new["path"], "Product/7");

    let output = ws.run(&[
        "record", "--type", "Product", "--id", "7", "--file", second.to_str().unwrap(), "--echo",
    ]);
    assert_success(&output);
    let pairs = echoed_pairs(&output);
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0]["old"], first_new);
    assert_ne!(pairs[0]["new"]["version"], first_new["version"]);

    let lines = list_lines(&ws);
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| !l.contains("pending")), "{:?}", lines);
}

#[test]
fn test_record_without_comparators_leaves_capture_pending() {
    let ws = Workspace::new();
    let tree = ws.write("tree.json", &product_tree("ABC"));

    let output = ws.run(&[
        "record", "--type", "Product", "--id", "7", "--file", tree.to_str().unwrap(),
    ]);
    assert_success(&output);
    assert!(echoed_pairs(&output).is_empty());

    let lines = list_lines(&ws);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("1\t"));
    assert!(lines[0].contains("pending"));
    assert!(lines[0].contains("captures/Product/7@"));
}

#[test]
fn test_process_pending_collapses_batch() {
    let ws = Workspace::new();
    let a = ws.write("a.json", &product_tree("A"));
    let b = ws.write("b.json", &product_tree("B"));
    for file in [&a, &b] {
        let output = ws.run(&[
            "record", "--type", "Product", "--id", "7", "--file", file.to_str().unwrap(),
        ]);
        assert_success(&output);
    }

    let output = ws.run(&["process", "--echo"]);
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("compared 2 capture(s) of Product#7 with [echo]"), "stdout: {}", out);
    let pairs = echoed_pairs(&output);
    assert_eq!(pairs.len(), 1);
    assert!(pairs[0]["old"]["version"].is_null());

    assert!(list_lines(&ws).iter().all(|l| !l.contains("pending")));

    let output = ws.run(&["process", "--echo"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Nothing to process"));
}

#[test]
fn test_process_capture_id_twice_is_already_handled() {
    let ws = Workspace::new();
    let tree = ws.write("tree.json", &product_tree("ABC"));
    assert_success(&ws.run(&[
        "record", "--type", "Product", "--id", "7", "--file", tree.to_str().unwrap(),
    ]));

    let output = ws.run(&["process", "--capture-id", "1", "--echo"]);
    assert_success(&output);
    assert_eq!(echoed_pairs(&output).len(), 1);

    let output = ws.run(&["process", "--capture-id", "1", "--echo"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Capture 1: already handled"));
    assert!(echoed_pairs(&output).is_empty());
}

#[test]
fn test_process_unknown_capture_fails() {
    let ws = Workspace::new();

    let output = ws.run(&["process", "--capture-id", "999"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Error:"));
    assert!(stderr(&output).contains("capture_id: 999"), "stderr: {}", stderr(&output));
}

#[test]
fn test_record_rejects_malformed_tree() {
    let ws = Workspace::new();
    let bad = ws.write("bad.json", "not json");

    let output = ws.run(&[
        "record", "--type", "Product", "--id", "7", "--file", bad.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Error:"));
}

#[test]
fn test_config_file_supplies_stores() {
    let ws = Workspace::new();
    let config = ws.write(
        "snapwatch.toml",
        &format!(
            "[database]\npath = {:?}\n\n[blob_store]\nroot = {:?}\nbucket = \"audit\"\n\n[logging]\nprofile = \"test\"\n",
            ws.db().to_str().unwrap(),
            ws.blobs().to_str().unwrap()
        ),
    );
    let tree = ws.write("tree.json", &product_tree("ABC"));
    let config = config.to_str().unwrap();

    let output = ws.run_raw(&[
        "record", "--type", "Product", "--id", "7", "--file", tree.to_str().unwrap(),
        "--config", config, "--echo",
    ]);
    assert_success(&output);
    let pairs = echoed_pairs(&output);
    assert_eq!(pairs[0]["new"]["bucket"], "audit");
    assert!(Path::new(&ws.blobs()).join("audit").join("Product").exists());

    let output = ws.run_raw(&["list", "--type", "Product", "--id", "7", "--config", config]);
    assert_success(&output);
    assert_eq!(stdout(&output).lines().count(), 1);
}

#[test]
fn test_invalid_config_fails() {
    let ws = Workspace::new();
    let config = ws.write("bad.toml", "[workers]\nthreads = 0\n");

    let output = ws.run_raw(&["migrate", "--config", config.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("workers.threads"));
}
