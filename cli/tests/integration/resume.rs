//! Resume and deduplication integration tests for mcp CLI.
//!
//! A finished copy is appended to the resume log, and a re-run with the same
//! arguments only copies what the log does not list.

#[path = "../common/mod.rs"]
mod common;

use common::Workspace;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_rerun_copies_nothing() {
    let ws = Workspace::new();
    for i in 0..5 {
        ws.media(&format!("img{i:02}.jpg"), &format!("content{i}"), i);
    }

    ws.mcp().arg("--image").assert().success();
    assert_eq!(ws.output_files().len(), 5);
    assert_eq!(ws.resume_entries(), 5);

    ws.mcp()
        .arg("--image")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to copy"));
    assert_eq!(ws.resume_entries(), 5);
}

#[test]
fn test_resume_picks_up_new_files() {
    let ws = Workspace::new();
    for i in 0..3 {
        ws.media(&format!("img{i:02}.jpg"), &format!("content{i}"), i);
    }
    ws.mcp().arg("--image").assert().success();

    for i in 3..5 {
        ws.media(&format!("img{i:02}.jpg"), &format!("content{i}"), i);
    }

    let output = ws
        .mcp()
        .arg("--image")
        .arg("--output")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["candidates"], 5);
    assert_eq!(json["summary"]["already_copied"], 3);
    assert_eq!(json["summary"]["copied"], 2);
    assert_eq!(ws.resume_entries(), 5);
}

#[test]
fn test_duplicate_content_is_skipped() {
    let ws = Workspace::new();
    ws.media("a.jpg", "same bytes", 0);
    fs::create_dir_all(ws.output().join("older")).unwrap();
    fs::write(ws.output().join("older/renamed.jpg"), "same bytes").unwrap();

    let output = ws
        .mcp()
        .arg("--image")
        .arg("--output")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["copied"], 0);
    assert_eq!(json["skipped"][0]["reason"], "duplicate content");
    assert!(!ws.output().join("a.jpg").exists());
}

#[test]
fn test_force_copies_again() {
    let ws = Workspace::new();
    ws.media("a.jpg", "first", 0);
    ws.mcp().arg("--image").assert().success();

    fs::write(ws.output().join("a.jpg"), "tampered").unwrap();

    ws.mcp()
        .arg("--image")
        .arg("-f")
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied 1 files"));
    assert_eq!(fs::read_to_string(ws.output().join("a.jpg")).unwrap(), "first");
}

#[test]
fn test_existing_name_is_kept_by_default() {
    let ws = Workspace::new();
    ws.media("a.jpg", "new content", 0);
    fs::create_dir_all(ws.output()).unwrap();
    fs::write(ws.output().join("a.jpg"), "old content").unwrap();

    ws.mcp()
        .arg("--image")
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped: 1"))
        .stdout(predicate::str::contains("destination exists"));
    assert_eq!(
        fs::read_to_string(ws.output().join("a.jpg")).unwrap(),
        "old content"
    );
}

#[test]
fn test_overwrite_yes_replaces() {
    let ws = Workspace::new();
    ws.media("a.jpg", "new content", 0);
    fs::create_dir_all(ws.output()).unwrap();
    fs::write(ws.output().join("a.jpg"), "old content").unwrap();

    ws.mcp()
        .arg("--image")
        .arg("--overwrite")
        .arg("yes")
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(ws.output().join("a.jpg")).unwrap(),
        "new content"
    );
}

#[test]
fn test_overwrite_ask_reads_stdin() {
    let ws = Workspace::new();
    ws.media("a.jpg", "new a", 0);
    fs::create_dir_all(ws.output()).unwrap();
    fs::write(ws.output().join("a.jpg"), "old a").unwrap();

    ws.mcp()
        .arg("--image")
        .arg("--overwrite")
        .arg("ask")
        .write_stdin("n\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("overwrite? (y/n)"));
    assert_eq!(fs::read_to_string(ws.output().join("a.jpg")).unwrap(), "old a");

    ws.mcp()
        .arg("--image")
        .arg("--overwrite")
        .arg("ask")
        .write_stdin("y\n")
        .assert()
        .success();
    assert_eq!(fs::read_to_string(ws.output().join("a.jpg")).unwrap(), "new a");
}

#[test]
fn test_remove_source_after_copy() {
    let ws = Workspace::new();
    let a = ws.media("a.jpg", "a", 0);
    let b = ws.media("b.jpg", "b", 1);

    ws.mcp()
        .arg("--image")
        .arg("--remove-source")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed files: 2"));

    assert!(!a.exists());
    assert!(!b.exists());
    assert_eq!(ws.output_files(), vec!["a.jpg", "b.jpg"]);
}

#[test]
fn test_custom_resume_log_path() {
    let ws = Workspace::new();
    ws.media("a.jpg", "a", 0);
    let log = ws.root.path().join("logs.txt");

    ws.mcp()
        .arg("--image")
        .arg("--resume-log")
        .arg(&log)
        .assert()
        .success();

    assert!(log.exists());
    assert!(!ws.resume_log().exists());
    assert!(fs::read_to_string(&log).unwrap().contains("a.jpg"));
}
