//! Scan mode integration tests for mcp CLI.
//!
//! `--scan` hashes both trees and lists input files whose content already
//! exists in the output tree. Nothing is copied.

#[path = "../common/mod.rs"]
mod common;

use common::Workspace;
use predicates::prelude::*;
use std::fs;

fn populate(ws: &Workspace) {
    ws.media("a.jpg", "alpha", 0);
    ws.media("b.mov", "bravo", 1);
    ws.media("nested/c.txt", "charlie", 2);
    ws.media("d.jpg", "only in input", 3);

    fs::create_dir_all(ws.output().join("2021/06")).unwrap();
    fs::write(ws.output().join("2021/06/a_copy.jpg"), "alpha").unwrap();
    fs::write(ws.output().join("b.mov"), "bravo").unwrap();
    fs::write(ws.output().join("c.txt"), "charlie").unwrap();
}

#[test]
fn test_scan_lists_matches() {
    let ws = Workspace::new();
    populate(&ws);

    ws.mcp()
        .arg("--scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("Files matched: 3"))
        .stdout(predicate::str::contains("a.jpg => Destination "))
        .stdout(predicate::str::contains("a_copy.jpg"))
        .stdout(predicate::str::contains("d.jpg").not());
}

#[test]
fn test_scan_copies_nothing() {
    let ws = Workspace::new();
    populate(&ws);
    let before = ws.output_files();

    ws.mcp().arg("--scan").assert().success();

    assert_eq!(ws.output_files(), before);
    assert!(ws.input().join("d.jpg").exists());
}

#[test]
fn test_scan_json() {
    let ws = Workspace::new();
    populate(&ws);

    let output = ws
        .mcp()
        .arg("--scan")
        .arg("--output")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["mode"], "scan");
    assert_eq!(json["summary"]["matched"], 3);
    assert_eq!(json["summary"]["source_fingerprints"], 4);
    assert_eq!(json["summary"]["destination_fingerprints"], 3);

    let sources: Vec<&str> = json["matches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["source"].as_str().unwrap())
        .collect();
    assert!(sources.iter().any(|s| s.ends_with("c.txt")));
    assert!(!sources.iter().any(|s| s.ends_with("d.jpg")));
}

#[test]
fn test_scan_missing_output_fails() {
    let ws = Workspace::new();
    ws.media("a.jpg", "alpha", 0);

    ws.mcp()
        .arg("--scan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("source_not_found"));
}

#[test]
fn test_scan_empty_trees() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.output()).unwrap();

    ws.mcp()
        .arg("--scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("Files matched: 0"));
}
