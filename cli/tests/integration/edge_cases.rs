//! Edge case integration tests for mcp CLI.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{Workspace, date_dir};
use predicates::prelude::*;
use serial_test::serial;
use std::fs;

#[test]
fn test_spaces_in_names_are_replaced() {
    let ws = Workspace::new();
    ws.media("summer holiday.jpg", "sun", 0);
    ws.media("beach%20day.jpg", "sand", 0);

    ws.mcp().arg("--image").assert().success();

    assert_eq!(
        ws.output_files(),
        vec!["beach_day.jpg", "summer_holiday.jpg"]
    );
}

#[test]
fn test_unicode_names() {
    let ws = Workspace::new();
    ws.media("été à Paris.jpg", "paris", 0);
    ws.media("日本.png", "japan", 1);

    ws.mcp().arg("--image").assert().success();

    assert_eq!(ws.output_files().len(), 2);
    assert!(ws.output().join("été_à_Paris.jpg").exists());
    assert!(ws.output().join("日本.png").exists());
}

#[test]
fn test_empty_file_is_copied() {
    let ws = Workspace::new();
    ws.media("empty.jpg", "", 0);

    ws.mcp().arg("--image").assert().success();

    let meta = fs::metadata(ws.output().join("empty.jpg")).unwrap();
    assert_eq!(meta.len(), 0);
}

#[test]
fn test_same_name_in_two_folders_flattened() {
    let ws = Workspace::new();
    ws.media("cam1/IMG_0001.jpg", "first camera", 0);
    ws.media("cam2/IMG_0001.jpg", "second camera", 0);

    let output = ws
        .mcp()
        .arg("--image")
        .arg("-r")
        .arg("--output")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["copied"], 1);
    assert_eq!(json["summary"]["skipped"], 1);
    assert_eq!(json["skipped"][0]["reason"], "destination exists");
    assert_eq!(ws.output_files(), vec!["IMG_0001.jpg"]);
}

#[test]
fn test_files_on_different_days_split_by_date() {
    let ws = Workspace::new();
    ws.media("a.jpg", "a", 0);
    ws.media("b.jpg", "b", 1);
    ws.media("c.jpg", "c", 40);

    ws.mcp()
        .arg("--image")
        .arg("--dirformat")
        .arg("date")
        .assert()
        .success();

    assert_eq!(
        ws.output_files(),
        vec![
            format!("{}/a.jpg", date_dir(0)),
            format!("{}/b.jpg", date_dir(1)),
            format!("{}/c.jpg", date_dir(40)),
        ]
    );
}

#[test]
#[serial]
fn test_default_output_is_cwd() {
    let ws = Workspace::new();
    ws.media("a.jpg", "a", 0);

    let mut cmd = cargo_bin_cmd!("mcp");
    cmd.current_dir(ws.root.path())
        .arg("--image")
        .arg("--in")
        .arg(ws.input())
        .arg("--no-sync")
        .assert()
        .success();

    assert!(ws.root.path().join("a.jpg").exists());
    assert!(ws.resume_log().exists());
    // Temporary store is gone once the run ends.
    assert!(!ws.root.path().join(".mediacopy-db").exists());
}

#[test]
fn test_keep_store_leaves_database() {
    let ws = Workspace::new();
    ws.media("a.jpg", "a", 0);
    let store = ws.root.path().join("fingerprints");

    ws.mcp()
        .arg("--image")
        .arg("--store")
        .arg(&store)
        .arg("--keep-store")
        .assert()
        .success();

    assert!(store.is_dir());
}

#[test]
fn test_output_inside_input_is_not_recopied() {
    let ws = Workspace::new();
    ws.media("a.jpg", "a", 0);
    let nested_out = ws.input().join("sorted");

    let mut cmd = cargo_bin_cmd!("mcp");
    cmd.current_dir(ws.root.path())
        .arg("--image")
        .arg("-r")
        .arg("--in")
        .arg(ws.input())
        .arg("--out")
        .arg(&nested_out)
        .arg("--no-sync")
        .assert()
        .success();
    assert!(nested_out.join("a.jpg").exists());

    // The copy now sits in the input tree, but its content is already known.
    let mut cmd = cargo_bin_cmd!("mcp");
    cmd.current_dir(ws.root.path())
        .arg("--image")
        .arg("-r")
        .arg("--in")
        .arg(ws.input())
        .arg("--out")
        .arg(&nested_out)
        .arg("--no-sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied").not());
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let ws = Workspace::new();
    let outside = ws.root.path().join("elsewhere.jpg");
    fs::write(&outside, "linked").unwrap();
    std::os::unix::fs::symlink(&outside, ws.input().join("link.jpg")).unwrap();
    ws.media("real.jpg", "real", 0);

    ws.mcp().arg("--image").assert().success();

    assert_eq!(ws.output_files(), vec!["real.jpg"]);
}

#[test]
fn test_workers_zero_is_clamped() {
    let ws = Workspace::new();
    for i in 0..4 {
        ws.media(&format!("{i}.jpg"), &format!("content {i}"), i);
    }

    ws.mcp()
        .arg("--image")
        .arg("-j")
        .arg("0")
        .assert()
        .success();
    assert_eq!(ws.output_files().len(), 4);
}
