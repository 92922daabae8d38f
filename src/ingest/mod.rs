//! Ingestion runs: resolve, dedupe, sort, resume-filter, and copy.
//!
//! [`ingest`] drives a whole run:
//!
//! 1. Walk the input tree and resolve each eligible file in parallel,
//!    fingerprinting it into the `src` namespace of the store.
//! 2. Fingerprint the output tree into the `dst` namespace, so content that is
//!    already there can be skipped without touching the filesystem.
//! 3. Sort the resolved records by timestamp.
//! 4. Drop records whose source is already in the resume log.
//! 5. Copy the survivors in parallel, appending each finished source to the log.
//!
//! The store is opened once per run and, unless
//! [`keep_store`](IngestOptions::keep_store) is set, destroyed when the run
//! ends on every exit path.

mod copy;
mod remove;
mod scan;
pub mod utils;

pub use remove::remove_copied_sources;
pub use scan::scan;

use crate::error::{Error, Result};
use crate::options::{IngestOptions, Overwrite};
use crate::pipeline::WorkerPool;
use crate::record::{FileRecord, IngestReport};
use crate::resume::{self, ResumeLog};
use crate::store::{ContentStore, Namespace};
use copy::Copier;
use scan::{WalkFilter, index_tree, resolve_tree};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Store handle and bookkeeping paths shared by the stages of one run.
pub(crate) struct Session {
    pub(crate) store: ContentStore,
    /// Absolute store and resume-log paths, pruned from every walk
    pub(crate) exclude: Vec<PathBuf>,
}

impl Session {
    pub(crate) fn open(options: &IngestOptions) -> Result<Self> {
        let store_path = std::path::absolute(&options.store_path)?;
        let store = if options.keep_store {
            ContentStore::open(&store_path)?
        } else {
            ContentStore::open_temporary(&store_path)?
        };
        let exclude = vec![store_path, std::path::absolute(&options.resume_log)?];
        Ok(Self { store, exclude })
    }
}

/// Absolute form of an existing directory.
pub(crate) fn check_root(path: &Path) -> Result<PathBuf> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(std::path::absolute(path)?),
        Ok(_) => Err(Error::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(Error::SourceNotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Copy the media under `src` into `dst`, organised by creation date.
///
/// Per-file failures are collected in [`IngestReport::errored`] and never
/// stop the run. Re-running with the same inputs copies nothing new: sources
/// in the resume log are excluded and, under [`Overwrite::No`](crate::Overwrite::No),
/// existing content and existing names are skipped.
///
/// # Errors
///
/// Returns an error if:
/// - `src` does not exist ([`Error::SourceNotFound`]) or is not a directory ([`Error::NotADirectory`])
/// - `dst` cannot be created ([`Error::CreateDir`])
/// - the store cannot be opened ([`Error::Store`])
/// - the resume log cannot be opened or read ([`Error::Io`])
/// - the cancel token fires ([`Error::Cancelled`], carrying partial counts)
///
/// # Example
///
/// ```no_run
/// use mediacopy::{DateLayout, IngestOptions, ingest};
/// use std::path::Path;
///
/// let options = IngestOptions::default()
///     .with_recursive()
///     .with_date_layout(DateLayout::Date);
/// let report = ingest(Path::new("/media/card/DCIM"), Path::new("/photos"), &options)?;
/// println!("copied {} files", report.copied.len());
/// # Ok::<(), mediacopy::Error>(())
/// ```
pub fn ingest(src: &Path, dst: &Path, options: &IngestOptions) -> Result<IngestReport> {
    let start = Instant::now();
    let src = check_root(src)?;
    fs::create_dir_all(dst).map_err(|e| Error::CreateDir {
        path: dst.to_path_buf(),
        source: e,
    })?;
    let dst = check_root(dst)?;

    let session = Session::open(options)?;
    let resume = ResumeLog::open(&options.resume_log)?;

    tracing::info!(src = %src.display(), kind = ?options.kind, "resolving source files");
    let source_filter = WalkFilter {
        recursive: options.recursive,
        kind: Some(options.kind),
        exclude: &session.exclude,
    };
    let resolved = resolve_tree(&session.store, &src, source_filter, options);
    let mut errored = resolved.failed;
    if resolved.cancelled {
        return Err(Error::Cancelled {
            copied: 0,
            skipped: 0,
            errored: errored.len(),
        });
    }

    // Only the dedupe check reads the `dst` namespace.
    if !options.force_copy && options.overwrite == Overwrite::No {
        tracing::info!(dst = %dst.display(), "indexing destination");
        let dest_filter = WalkFilter {
            recursive: true,
            ..source_filter
        };
        let indexed = index_tree(&session.store, Namespace::Dst, &dst, dest_filter, options);
        for e in &indexed.failed {
            options.warn(&format!(
                "Could not index {}: {}",
                e.path.display(),
                e.message
            ));
        }
        if indexed.cancelled {
            return Err(Error::Cancelled {
                copied: 0,
                skipped: 0,
                errored: errored.len(),
            });
        }
    }

    let mut records = resolved.done;
    let candidates = records.len();
    sort_by_timestamp(&mut records);

    let (pending, already_copied) = if options.force_copy {
        (records, 0)
    } else {
        resume::filter_pending(records, &resume.entries()?)
    };
    tracing::info!(
        candidates,
        already_copied,
        pending = pending.len(),
        "copying"
    );

    let copier = Copier::new(&session.store, options, &resume, &dst);
    let copied = WorkerPool::new(options).run(pending, |record, progress| {
        copier.copy(&record, progress)
    });
    errored.extend(copied.failed);

    if copied.cancelled {
        return Err(Error::Cancelled {
            copied: copied.done.len(),
            skipped: copied.skipped.len(),
            errored: errored.len(),
        });
    }

    let bytes_copied = copied.done.iter().map(|c| c.bytes).sum();
    let report = IngestReport {
        copied: copied.done,
        skipped: copied.skipped,
        errored,
        already_copied,
        candidates,
        bytes_copied,
        duration: start.elapsed(),
    };
    tracing::info!(
        copied = report.copied.len(),
        skipped = report.skipped.len(),
        errored = report.errored.len(),
        "ingest complete"
    );
    Ok(report)
}

/// Ascending by timestamp, ties broken by path for a stable order.
fn sort_by_timestamp(records: &mut [FileRecord]) {
    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.path.cmp(&b.path)));
}
