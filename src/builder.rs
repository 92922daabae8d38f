//! Builder API for ergonomic ingestion runs.
//!
//! The builder pattern provides a fluent interface for configuring and
//! executing runs. This is often more convenient than manually constructing
//! [`IngestOptions`].
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use mediacopy::IngestBuilder;
//!
//! // Copy the top level of a card's images into a flat folder
//! let report = IngestBuilder::new("/media/card", "/photos").run()?;
//! println!("Copied {} files", report.copied.len());
//! # Ok::<(), mediacopy::Error>(())
//! ```
//!
//! ## Videos by Month
//!
//! ```no_run
//! use mediacopy::{DateLayout, IngestBuilder};
//!
//! let report = IngestBuilder::new("/media/card", "/videos")
//!     .videos()
//!     .recursive()
//!     .date_layout(DateLayout::YearMonth)
//!     .workers(4)
//!     .run()?;
//! # Ok::<(), mediacopy::Error>(())
//! ```
//!
//! ## Checking What Is Already There
//!
//! ```no_run
//! use mediacopy::IngestBuilder;
//!
//! let report = IngestBuilder::new("/media/card", "/photos").scan()?;
//! println!("{} files already imported", report.matches.len());
//! # Ok::<(), mediacopy::Error>(())
//! ```

use crate::error::Result;
use crate::ingest::{ingest, remove_copied_sources, scan};
use crate::options::{DateLayout, IngestOptions, MediaKind, Overwrite};
use crate::record::{IngestReport, RemovedFile, ScanReport};
use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// A builder for configuring and executing ingestion runs.
///
/// # Example
///
/// ```no_run
/// use mediacopy::{IngestBuilder, Overwrite};
///
/// let report = IngestBuilder::new("/media/card", "/photos")
///     .recursive()
///     .overwrite(Overwrite::Yes)
///     .run()?;
/// # Ok::<(), mediacopy::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct IngestBuilder {
    src: PathBuf,
    dst: PathBuf,
    options: IngestOptions,
}

impl IngestBuilder {
    /// Create a new `IngestBuilder` for the given input and output roots.
    ///
    /// Uses default options (images, 10 workers, keep existing files, flat layout).
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Self {
        Self {
            src: src.as_ref().to_path_buf(),
            dst: dst.as_ref().to_path_buf(),
            options: IngestOptions::default(),
        }
    }

    /// Set the number of worker threads per stage.
    ///
    /// Default is 10. Set to 1 for sequential processing.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.options = self.options.with_workers(workers);
        self
    }

    /// Ingest still images (default).
    #[must_use]
    pub fn images(mut self) -> Self {
        self.options = self.options.with_kind(MediaKind::Image);
        self
    }

    /// Ingest videos instead of images.
    #[must_use]
    pub fn videos(mut self) -> Self {
        self.options = self.options.with_kind(MediaKind::Video);
        self
    }

    /// Descend into subdirectories of the input root.
    #[must_use]
    pub fn recursive(mut self) -> Self {
        self.options = self.options.with_recursive();
        self
    }

    /// Set the policy for destination files that already exist.
    #[must_use]
    pub fn overwrite(mut self, policy: Overwrite) -> Self {
        self.options = self.options.with_overwrite(policy);
        self
    }

    /// Copy everything, ignoring the resume log, known content, and existing files.
    #[must_use]
    pub fn force(mut self) -> Self {
        self.options = self.options.with_force_copy();
        self
    }

    /// Choose how the output tree is organised.
    #[must_use]
    pub fn date_layout(mut self, layout: DateLayout) -> Self {
        self.options = self.options.with_date_layout(layout);
        self
    }

    /// Hash large files in full rather than sampling them.
    ///
    /// Slower on big videos, but two files only match if every byte matches.
    #[must_use]
    pub fn full_hash(mut self) -> Self {
        self.options = self.options.without_fast_hash();
        self
    }

    /// Set where the resume log lives.
    #[must_use]
    pub fn resume_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.options = self.options.with_resume_log(path);
        self
    }

    /// Set where the fingerprint store lives.
    #[must_use]
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options = self.options.with_store_path(path);
        self
    }

    /// Leave the fingerprint store on disk after the run.
    #[must_use]
    pub fn keep_store(mut self) -> Self {
        self.options = self.options.with_keep_store();
        self
    }

    /// Disable fsync after writing files.
    ///
    /// This improves performance but reduces durability guarantees.
    #[must_use]
    pub fn no_fsync(mut self) -> Self {
        self.options = self.options.without_fsync();
        self
    }

    /// Set a cancellation token for cooperative cancellation.
    ///
    /// When the token is set to `true`, no new files are started and the run
    /// returns [`Error::Cancelled`](crate::Error::Cancelled) with partial
    /// counts. In-flight files always finish.
    #[must_use]
    pub fn cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.options = self.options.with_cancel_token(token);
        self
    }

    /// Receive lossy `"Scanning: name"` / `"Copying: name"` messages.
    #[must_use]
    pub fn progress(mut self, sender: Sender<String>) -> Self {
        self.options = self.options.with_progress(sender);
        self
    }

    /// Answer overwrite questions under [`Overwrite::Ask`].
    #[must_use]
    pub fn on_prompt(mut self, handler: fn(&Path) -> bool) -> Self {
        self.options = self.options.with_prompt_handler(handler);
        self
    }

    /// Set a warning handler for non-fatal issues.
    #[must_use]
    pub fn on_warning(mut self, handler: fn(&str)) -> Self {
        self.options = self.options.with_warn_handler(handler);
        self
    }

    /// Receive per-file detail (fallback dates, duplicate hits, removals).
    #[must_use]
    pub fn verbose(mut self, handler: fn(&str)) -> Self {
        self.options = self.options.with_verbose_handler(handler);
        self
    }

    /// Get a reference to the current options.
    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Copy the input tree into the output tree.
    ///
    /// # Errors
    ///
    /// See [`ingest`](crate::ingest()).
    pub fn run(self) -> Result<IngestReport> {
        ingest(&self.src, &self.dst, &self.options)
    }

    /// Report which input files already exist under the output root.
    ///
    /// # Errors
    ///
    /// See [`scan`](crate::scan()).
    pub fn scan(self) -> Result<ScanReport> {
        scan(&self.src, &self.dst, &self.options)
    }

    /// Delete the sources recorded in the resume log.
    ///
    /// # Errors
    ///
    /// See [`remove_copied_sources`].
    pub fn remove_sources(self) -> Result<Vec<RemovedFile>> {
        remove_copied_sources(&self.options.resume_log, &self.options)
    }
}
