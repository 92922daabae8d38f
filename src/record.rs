//! Per-file results flowing between the resolve, copy, and reporting stages.

use crate::hash::Fingerprint;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A resolved media file: where it is, when it was taken, what it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Best-effort creation time (falls back to the modification time)
    pub timestamp: DateTime<Local>,
    /// Content fingerprint
    pub fingerprint: Fingerprint,
}

impl FileRecord {
    /// File name component.
    #[must_use]
    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    /// Containing directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

/// A file that could not be resolved or copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Path of the offending file
    pub path: PathBuf,
    /// When resolution failed, the failure time; for copy failures, the
    /// resolved creation time of the source
    pub timestamp: DateTime<Local>,
    /// Human-readable failure
    pub message: String,
}

impl ErrorRecord {
    pub(crate) fn now(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            timestamp: Local::now(),
            message: message.into(),
        }
    }

    /// File name component.
    #[must_use]
    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    /// Containing directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

/// A successful copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub timestamp: DateTime<Local>,
    pub bytes: u64,
}

/// Why a source was not copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Identical content is already indexed under the destination root
    DuplicateContent,
    /// A file with the same name exists at the destination path
    DestinationExists,
    /// The overwrite prompt said no
    Declined,
}

impl SkipReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateContent => "duplicate content",
            Self::DestinationExists => "destination exists",
            Self::Declined => "declined",
        }
    }
}

/// A source that was deliberately not copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub source: PathBuf,
    /// Existing destination (path derived for the copy, or the duplicate found in the store)
    pub destination: Option<PathBuf>,
    pub reason: SkipReason,
}

/// Source and destination paths sharing a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchObject {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// A source file deleted after it was copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedFile {
    pub path: PathBuf,
    pub modified: DateTime<Local>,
}

impl RemovedFile {
    /// File name component.
    #[must_use]
    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    /// Containing directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

/// Summary of an ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Files written to the destination
    pub copied: Vec<CopiedFile>,
    /// Files deliberately left alone
    pub skipped: Vec<SkippedFile>,
    /// Files that failed to resolve or copy
    pub errored: Vec<ErrorRecord>,
    /// Candidates excluded because the resume log lists them
    pub already_copied: usize,
    /// Candidates that resolved successfully
    pub candidates: usize,
    /// Total bytes written
    pub bytes_copied: u64,
    /// Wall time of the run
    pub duration: Duration,
}

/// Summary of a scan/validate run.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Source files whose content already exists under the destination
    pub matches: Vec<MatchObject>,
    /// Distinct fingerprints indexed from the source tree
    pub source_count: usize,
    /// Distinct fingerprints indexed from the destination tree
    pub destination_count: usize,
    /// Files that could not be hashed
    pub errored: Vec<ErrorRecord>,
    /// Wall time of the run
    pub duration: Duration,
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}
