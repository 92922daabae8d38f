//! Configuration options for ingestion runs.
//!
//! This module provides [`IngestOptions`] for configuring a run, plus the
//! small enums it is made of: [`MediaKind`], [`Overwrite`], and [`DateLayout`].
//!
//! # Example
//!
//! ```
//! use mediacopy::{DateLayout, IngestOptions, MediaKind, Overwrite};
//!
//! let options = IngestOptions::default()
//!     .with_kind(MediaKind::Video)
//!     .with_workers(4)
//!     .with_overwrite(Overwrite::Yes)
//!     .with_date_layout(DateLayout::YearMonth);
//! ```

use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default resume log file name, relative to the working directory.
pub const DEFAULT_RESUME_LOG: &str = ".file_status.txt";

/// Default content store directory, relative to the working directory.
pub const DEFAULT_STORE_PATH: &str = ".mediacopy-db";

/// Which family of media a run ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MediaKind {
    /// Still images (jpg, heic, raw variants, png, ...)
    #[default]
    Image,
    /// Video containers (mp4, mov, mpg, mkv, ...)
    Video,
}

/// Behavior when a file already exists at the destination path.
///
/// # Default
///
/// The default is [`Overwrite::No`], which makes repeated runs idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Overwrite {
    /// Replace the existing destination file.
    Yes,
    /// Leave the existing file alone and report the source as skipped.
    #[default]
    No,
    /// Ask the installed [`IngestOptions::prompt_handler`] for each conflict.
    ///
    /// Prompts are serialized: only one is outstanding at a time even though
    /// copies run in parallel. Without a handler this behaves as [`Overwrite::No`].
    Ask,
}

impl FromStr for Overwrite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(Self::Yes),
            "no" | "n" => Ok(Self::No),
            "ask" => Ok(Self::Ask),
            other => Err(format!("invalid overwrite policy '{other}' (expected yes|no|ask)")),
        }
    }
}

/// How the destination tree is organised by date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DateLayout {
    /// Everything lands directly under the output root.
    #[default]
    Flat,
    /// `YYYY-MM-DD` subdirectories.
    Date,
    /// `YYYY/MM` nested subdirectories.
    YearMonth,
}

impl FromStr for DateLayout {
    type Err = std::convert::Infallible;

    /// `DATE` and `YEAR-MONTH` select a layout; anything else (including `NOF`) is flat.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "DATE" => Self::Date,
            "YEAR-MONTH" => Self::YearMonth,
            _ => Self::Flat,
        })
    }
}

/// Options for an ingestion run.
///
/// Use [`Default::default()`] to get sensible defaults, then customize
/// using the builder methods.
///
/// # Default Values
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `kind` | `Image` | Media family to ingest |
/// | `overwrite` | `No` | Keep existing destination files |
/// | `force_copy` | `false` | Bypass dedupe and resume checks |
/// | `recursive` | `false` | Only the top level of the input tree |
/// | `date_layout` | `Flat` | No date subdirectories |
/// | `fast_hash` | `true` | Sample large files instead of hashing them fully |
/// | `workers` | 10 | Worker threads per stage |
/// | `queue_capacity` | 40 | Bounded job queue length |
/// | `resume_log` | `.file_status.txt` | Append-only copy log |
/// | `store_path` | `.mediacopy-db` | Fingerprint store directory |
/// | `keep_store` | `false` | Delete the store when the run ends |
/// | `fsync` | `true` | Sync to disk after write |
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct IngestOptions {
    /// Media family this run ingests
    pub kind: MediaKind,

    /// Behavior when the destination file already exists
    pub overwrite: Overwrite,

    /// Copy even if the content is already present at the destination or
    /// the source is recorded in the resume log.
    ///
    /// Also forces overwriting of an existing destination file.
    pub force_copy: bool,

    /// Descend into subdirectories of the input tree
    pub recursive: bool,

    /// Destination directory layout
    pub date_layout: DateLayout,

    /// Use sampled fingerprints for files above the fast-hash threshold
    pub fast_hash: bool,

    /// Number of worker threads per pipeline stage (default: 10)
    pub workers: usize,

    /// Capacity of the bounded job queue feeding the workers
    ///
    /// The tree walk blocks once this many jobs are waiting.
    pub queue_capacity: usize,

    /// Path of the append-only resume log
    pub resume_log: PathBuf,

    /// Directory of the fingerprint store
    pub store_path: PathBuf,

    /// Keep the store directory after the run instead of deleting it
    pub keep_store: bool,

    /// Whether to sync files to disk after writing (default: true)
    pub fsync: bool,

    /// Cancellation token for graceful shutdown (optional)
    ///
    /// When set to `true`, the pipelines stop dispatching new files. Work
    /// already in flight finishes and the run returns
    /// [`Error::Cancelled`](crate::Error::Cancelled).
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cancel_token: Option<Arc<AtomicBool>>,

    /// Lossy progress channel receiving `"Scanning: name"` / `"Copying: name"`
    ///
    /// A full channel drops the message; workers never block on it.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub progress: Option<Sender<String>>,

    /// Decides whether to overwrite an existing destination under [`Overwrite::Ask`]
    #[cfg_attr(feature = "serde", serde(skip))]
    pub prompt_handler: Option<fn(&Path) -> bool>,

    /// Callback for warnings (optional)
    ///
    /// If not set, warnings are logged via tracing.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub warn_handler: Option<fn(&str)>,

    /// Callback for per-file verbose messages (optional)
    ///
    /// If not set, messages are logged via tracing at debug level.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub verbose_handler: Option<fn(&str)>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            kind: MediaKind::Image,
            overwrite: Overwrite::No,
            force_copy: false,
            recursive: false,
            date_layout: DateLayout::Flat,
            fast_hash: true,
            workers: 10,
            queue_capacity: 40,
            resume_log: PathBuf::from(DEFAULT_RESUME_LOG),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            keep_store: false,
            fsync: true,
            cancel_token: None,
            progress: None,
            prompt_handler: None,
            warn_handler: None,
            verbose_handler: None,
        }
    }
}

impl IngestOptions {
    /// Set the media family
    #[must_use]
    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the number of worker threads
    ///
    /// Value is clamped to at least 1, and the queue is resized to four jobs
    /// per worker.
    #[must_use]
    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = n.max(1);
        self.queue_capacity = self.workers.saturating_mul(4);
        self
    }

    /// Set the overwrite policy
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: Overwrite) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Copy regardless of dedupe matches, resume log entries, or existing files
    #[must_use]
    pub fn with_force_copy(mut self) -> Self {
        self.force_copy = true;
        self
    }

    /// Walk the input tree recursively
    #[must_use]
    pub fn with_recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Set the destination layout
    #[must_use]
    pub fn with_date_layout(mut self, layout: DateLayout) -> Self {
        self.date_layout = layout;
        self
    }

    /// Always hash whole files
    #[must_use]
    pub fn without_fast_hash(mut self) -> Self {
        self.fast_hash = false;
        self
    }

    /// Set the resume log path
    #[must_use]
    pub fn with_resume_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.resume_log = path.into();
        self
    }

    /// Set the store directory
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Keep the store directory after the run
    #[must_use]
    pub fn with_keep_store(mut self) -> Self {
        self.keep_store = true;
        self
    }

    /// Disable fsync for faster (but less durable) copies
    #[must_use]
    pub fn without_fsync(mut self) -> Self {
        self.fsync = false;
        self
    }

    /// Set the cancellation token
    #[must_use]
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Set the progress channel
    #[must_use]
    pub fn with_progress(mut self, sender: Sender<String>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Set the overwrite prompt used by [`Overwrite::Ask`]
    #[must_use]
    pub fn with_prompt_handler(mut self, handler: fn(&Path) -> bool) -> Self {
        self.prompt_handler = Some(handler);
        self
    }

    /// Create options with a warning handler
    #[must_use]
    pub fn with_warn_handler(mut self, handler: fn(&str)) -> Self {
        self.warn_handler = Some(handler);
        self
    }

    /// Create options with a verbose message handler
    #[must_use]
    pub fn with_verbose_handler(mut self, handler: fn(&str)) -> Self {
        self.verbose_handler = Some(handler);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(|token| token.load(Ordering::Relaxed))
    }

    pub(crate) fn warn(&self, msg: &str) {
        if let Some(handler) = self.warn_handler {
            handler(msg);
        } else {
            tracing::warn!("{}", msg);
        }
    }

    pub(crate) fn verbose(&self, msg: &str) {
        if let Some(handler) = self.verbose_handler {
            handler(msg);
        } else {
            tracing::debug!("{}", msg);
        }
    }
}
