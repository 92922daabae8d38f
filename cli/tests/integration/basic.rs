//! Basic functionality integration tests for mcp CLI.

#[path = "../common/mod.rs"]
mod common;

use common::{Workspace, date_dir};
use predicates::prelude::*;
use rstest::rstest;
use std::fs;

#[test]
fn test_basic_image_copy() {
    let ws = Workspace::new();
    ws.media("a.jpg", "jpeg bytes", 0);
    ws.media("b.png", "png bytes", 1);

    ws.mcp()
        .arg("--image")
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied 2 files"));

    assert_eq!(ws.output_files(), vec!["a.jpg", "b.png"]);
    assert_eq!(
        fs::read_to_string(ws.output().join("a.jpg")).unwrap(),
        "jpeg bytes"
    );
}

#[rstest]
#[case("NOF", "a.jpg".to_string())]
#[case("DATE", format!("{}/a.jpg", date_dir(0)))]
#[case("YEAR-MONTH", "2021/06/a.jpg".to_string())]
#[case("weekly", "a.jpg".to_string())]
fn test_dirformat_layouts(#[case] format: &str, #[case] expected: String) {
    let ws = Workspace::new();
    ws.media("a.jpg", "jpeg bytes", 0);

    ws.mcp()
        .arg("--image")
        .arg("--dirformat")
        .arg(format)
        .assert()
        .success();

    assert_eq!(ws.output_files(), vec![expected]);
}

#[test]
fn test_video_mode_ignores_images() {
    let ws = Workspace::new();
    ws.media("clip.mkv", "frames", 0);
    ws.media("photo.jpg", "pixels", 0);

    ws.mcp().arg("--video").assert().success();

    assert_eq!(ws.output_files(), vec!["clip.mkv"]);
}

#[test]
fn test_image_mode_ignores_videos_and_other_files() {
    let ws = Workspace::new();
    ws.media("clip.mkv", "frames", 0);
    ws.media("notes.txt", "text", 0);
    ws.media("photo.JPG", "pixels", 0);

    ws.mcp().arg("--image").assert().success();

    assert_eq!(ws.output_files(), vec!["photo.JPG"]);
}

#[test]
fn test_recursive_flag() {
    let ws = Workspace::new();
    ws.media("top.jpg", "top", 0);
    ws.media("nested/deeper/inner.jpg", "inner", 2);

    ws.mcp().arg("--image").assert().success();
    assert_eq!(ws.output_files(), vec!["top.jpg"]);

    ws.mcp()
        .arg("--image")
        .arg("-r")
        .arg("--dirformat")
        .arg("DATE")
        .assert()
        .success();

    let files = ws.output_files();
    assert!(files.contains(&format!("{}/inner.jpg", date_dir(2))));
}

#[test]
fn test_mode_is_required() {
    let ws = Workspace::new();
    ws.mcp()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--image"));
}

#[test]
fn test_modes_are_exclusive() {
    let ws = Workspace::new();
    ws.mcp()
        .arg("--image")
        .arg("--scan")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_json_output() {
    let ws = Workspace::new();
    ws.media("a.jpg", "jpeg bytes", 0);

    let output = ws
        .mcp()
        .arg("--image")
        .arg("--output")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["schema_version"], "1.0");
    assert_eq!(json["mode"], "image");
    assert_eq!(json["summary"]["copied"], 1);
    assert_eq!(json["summary"]["bytes_copied"], 10);
    assert_eq!(json["copied"][0]["date"], date_dir(0));
    assert_eq!(json["effective_config"]["dirformat"], "Flat");
}

#[test]
fn test_empty_input() {
    let ws = Workspace::new();
    ws.mcp()
        .arg("--image")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to copy"));
    assert!(ws.output().is_dir());
}

#[test]
fn test_copy_preserves_mtime() {
    let ws = Workspace::new();
    ws.media("a.jpg", "jpeg bytes", 3);

    ws.mcp().arg("--image").arg("-q").assert().success();

    let meta = fs::metadata(ws.output().join("a.jpg")).unwrap();
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    assert_eq!(mtime.unix_seconds(), common::base_time(3));
}
