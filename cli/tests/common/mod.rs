//! Common test utilities for integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use chrono::{Duration, Local, TimeZone};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch working directory with `in/` and `out/` roots.
///
/// `mcp` runs with this directory as its cwd, so the default resume log and
/// fingerprint store land here instead of the repository.
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    /// Create a fresh workspace with an empty `in/` directory.
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp workspace");
        fs::create_dir(root.path().join("in")).expect("Failed to create input dir");
        Self { root }
    }

    pub fn input(&self) -> PathBuf {
        self.root.path().join("in")
    }

    pub fn output(&self) -> PathBuf {
        self.root.path().join("out")
    }

    pub fn resume_log(&self) -> PathBuf {
        self.root.path().join(".file_status.txt")
    }

    /// `mcp` with cwd set to the workspace and `--in`/`--out` filled in.
    pub fn mcp(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("mcp");
        cmd.current_dir(self.root.path())
            .arg("--in")
            .arg(self.input())
            .arg("--out")
            .arg(self.output())
            .arg("--no-sync");
        cmd
    }

    /// Write `content` to `in/<rel>` with an mtime `day` days after 2021-06-15 noon.
    pub fn media(&self, rel: &str, content: &str, day: i64) -> PathBuf {
        let path = self.input().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directory");
        }
        fs::write(&path, content).expect("Failed to write file");
        filetime::set_file_mtime(&path, FileTime::from_unix_time(base_time(day), 0))
            .expect("Failed to set mtime");
        path
    }

    /// Names of the regular files under `out/`, relative and sorted.
    pub fn output_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        collect_files(&self.output(), &self.output(), &mut files);
        files.sort();
        files
    }

    pub fn resume_entries(&self) -> usize {
        fs::read_to_string(self.resume_log())
            .map(|s| s.lines().filter(|l| !l.trim().is_empty()).count())
            .unwrap_or(0)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Unix seconds for local noon, `day` days after 2021-06-15.
pub fn base_time(day: i64) -> i64 {
    let base = Local
        .with_ymd_and_hms(2021, 6, 15, 12, 0, 0)
        .single()
        .expect("Unambiguous local time");
    (base + Duration::days(day)).timestamp()
}

/// The `YYYY-MM-DD` of `base_time(day)`.
pub fn date_dir(day: i64) -> String {
    Local
        .timestamp_opt(base_time(day), 0)
        .single()
        .expect("Valid timestamp")
        .format("%Y-%m-%d")
        .to_string()
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else {
            let rel = path.strip_prefix(root).expect("Path under root");
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}
