//! Error handling integration tests for mcp CLI.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::Workspace;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_missing_input_directory() {
    let ws = Workspace::new();
    fs::remove_dir(ws.input()).unwrap();

    ws.mcp()
        .arg("--image")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("source_not_found"));
}

#[test]
fn test_input_is_a_file() {
    let ws = Workspace::new();
    let file = ws.root.path().join("single.jpg");
    fs::write(&file, "pixels").unwrap();

    let mut cmd = cargo_bin_cmd!("mcp");
    cmd.current_dir(ws.root.path())
        .arg("--image")
        .arg("--in")
        .arg(&file)
        .arg("--out")
        .arg(ws.output())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error["));
}

#[test]
fn test_missing_input_json_error() {
    let ws = Workspace::new();
    fs::remove_dir(ws.input()).unwrap();

    let output = ws
        .mcp()
        .arg("--image")
        .arg("--output")
        .arg("json")
        .output()
        .unwrap();
    assert!(!output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["error"]["code"], "source_not_found");
    assert!(json["error"]["message"].as_str().unwrap().contains("in"));
}

#[test]
fn test_corrupt_video_is_reported_not_fatal() {
    let ws = Workspace::new();
    ws.media("bad.mpg", "definitely not an mpeg stream", 0);
    ws.media("good.mkv", "frames", 1);

    ws.mcp()
        .arg("--video")
        .arg("--dirformat")
        .arg("DATE")
        .assert()
        .success()
        .stdout(predicate::str::contains("Errors: 1"))
        .stdout(predicate::str::contains("bad.mpg => Date "));

    let files = ws.output_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("good.mkv"));
}

#[test]
fn test_errors_in_json_output() {
    let ws = Workspace::new();
    ws.media("bad.mpg", "definitely not an mpeg stream", 0);

    let output = ws
        .mcp()
        .arg("--video")
        .arg("--output")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["errored"], 1);
    assert_eq!(json["errors"][0]["name"], "bad.mpg");
    assert_eq!(json["errors"][0]["date"].as_str().unwrap().len(), 10);
}

#[test]
fn test_invalid_overwrite_value() {
    let ws = Workspace::new();
    ws.mcp()
        .arg("--image")
        .arg("--overwrite")
        .arg("sometimes")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("sometimes"));
}

#[test]
fn test_missing_in_argument() {
    let mut cmd = cargo_bin_cmd!("mcp");
    cmd.arg("--image")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--in"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_reported() {
    use std::os::unix::fs::PermissionsExt;

    let ws = Workspace::new();
    let locked = ws.media("locked.jpg", "secret", 0);
    ws.media("open.jpg", "public", 0);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root can read anything; nothing to observe then.
    if fs::read(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        return;
    }

    ws.mcp()
        .arg("--image")
        .assert()
        .success()
        .stdout(predicate::str::contains("Errors: 1"));

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
    assert_eq!(ws.output_files(), vec!["open.jpg"]);
}

#[test]
fn test_log_file_is_written() {
    let ws = Workspace::new();
    ws.media("a.jpg", "a", 0);
    let log = ws.root.path().join("run.log");

    ws.mcp()
        .arg("--image")
        .arg("-v")
        .arg("--log-file")
        .arg(&log)
        .assert()
        .success();

    let contents = fs::read_to_string(&log).unwrap();
    assert!(contents.contains("starting"));
}
