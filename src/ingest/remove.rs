//! Deleting sources that a previous run copied.

use crate::error::Result;
use crate::options::IngestOptions;
use crate::record::RemovedFile;
use crate::resume;
use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Delete every source listed in the resume log at `resume_log` that still exists.
///
/// Only regular files are removed. A missing log removes nothing. Failures to
/// stat or delete an individual file are reported through the warn handler
/// and do not stop the pass. The log itself is left untouched.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the log exists but cannot be read.
pub fn remove_copied_sources(
    resume_log: &Path,
    options: &IngestOptions,
) -> Result<Vec<RemovedFile>> {
    let mut paths: Vec<PathBuf> = resume::load(resume_log)?.into_iter().collect();
    paths.sort();

    let mut removed = Vec::new();
    for path in paths {
        if options.is_cancelled() {
            break;
        }
        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                options.warn(&format!("Cannot stat {}: {e}", path.display()));
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }
        let modified = meta
            .modified()
            .map_or_else(|_| Local::now(), DateTime::<Local>::from);

        match fs::remove_file(&path) {
            Ok(()) => {
                options.verbose(&format!("Removed {}", path.display()));
                removed.push(RemovedFile { path, modified });
            }
            Err(e) => options.warn(&format!("Failed to remove {}: {e}", path.display())),
        }
    }
    tracing::info!(removed = removed.len(), "source removal complete");
    Ok(removed)
}
