use std::path::Path;
use std::process::{Command, Output};
use std::{env, fs, path::PathBuf};

use serde_json::Value;
use tempfile::tempdir;

fn cli_bin_path() -> PathBuf {
    if let Some(path) = option_env!("CARGO_BIN_EXE_inkdex-cli") {
        return PathBuf::from(path);
    }
    if let Ok(path) = env::var("CARGO_BIN_EXE_inkdex-cli") {
        return PathBuf::from(path);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .map(PathBuf::from)
        .expect("workspace root");
    let bin_name = if cfg!(windows) {
        "inkdex-cli.exe"
    } else {
        "inkdex-cli"
    };
    let fallback = workspace_root.join("target").join("debug").join(bin_name);
    assert!(
        fallback.exists(),
        "inkdex-cli binary not found at {}",
        fallback.display()
    );
    fallback
}

fn run_cli(root: &Path, args: &[&str]) -> Output {
    Command::new(cli_bin_path())
        .env_remove("INKDEX_LOG")
        .args(["--root", root.to_str().expect("root path")])
        .args(args)
        .output()
        .expect("run inkdex-cli")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is json")
}

#[test]
fn sync_then_search_process_contract_returns_ranked_json_hits() {
    // Given three articles where only one mentions both query terms
    // When running `inkdex-cli sync <dir>` then `inkdex-cli search`
    // Then the search emits one hit for that article with a perfect score.
    let temp = tempdir().expect("tempdir");
    let articles = temp.path().join("articles");
    fs::create_dir_all(&articles).expect("mkdir");
    fs::write(
        articles.join("ownership.md"),
        "---\nid: 11\ntitle: Ownership\n---\nownership and lifetimes in rustlang\n",
    )
    .expect("write");
    fs::write(
        articles.join("interpreters.md"),
        "---\nid: 12\ntitle: Interpreters\n---\ninterpreters written in rustlang\n",
    )
    .expect("write");
    fs::write(
        articles.join("property.md"),
        "---\nid: 13\n---\nownership of property\n",
    )
    .expect("write");
    let root = temp.path().join("index");

    let sync = stdout_json(&run_cli(
        &root,
        &["sync", articles.to_str().expect("articles path")],
    ));
    assert_eq!(sync["scanned"], 3);
    assert_eq!(sync["built"].as_array().map(Vec::len), Some(3));

    let hits = stdout_json(&run_cli(&root, &["search", "ownership rustlang"]));
    let hits = hits.as_array().expect("hit array");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["document_id"], 11);
    assert_eq!(hits[0]["score"].as_f64(), Some(3.0));
}

#[test]
fn rm_with_invalid_id_process_contract_exits_non_zero() {
    // Given a fresh root
    // When running `inkdex-cli rm 0`
    // Then the process fails before opening the index.
    let temp = tempdir().expect("tempdir");
    let root = temp.path().join("index");
    let output = run_cli(&root, &["rm", "0"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("document id must be positive"));
    assert!(!root.exists());
}

#[test]
fn logs_process_contract_lists_prior_requests() {
    let temp = tempdir().expect("tempdir");
    let root = temp.path().join("index");
    stdout_json(&run_cli(&root, &["search", "anything"]));

    let entries = stdout_json(&run_cli(&root, &["logs", "--operation", "search"]));
    let entries = entries.as_array().expect("entry array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["operation"], "search");
    assert_eq!(entries[0]["status"], "ok");
}
