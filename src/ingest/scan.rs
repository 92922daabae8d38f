//! Tree walking, the resolve stage, destination indexing, and scan/validate.

use super::{Session, check_root};
use crate::error::{Error, Result};
use crate::hash::Fingerprint;
use crate::options::{IngestOptions, MediaKind};
use crate::pipeline::{Outcome, Outcomes, WorkerPool};
use crate::record::{ErrorRecord, FileRecord, ScanReport};
use crate::resolve::{Resolver, index_file};
use crate::store::{ContentStore, Namespace};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Which files of a tree a walk yields.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WalkFilter<'a> {
    pub recursive: bool,
    /// `None` yields every regular file
    pub kind: Option<MediaKind>,
    /// Paths pruned from the walk (the store and the resume log)
    pub exclude: &'a [PathBuf],
}

/// Lazily walk the regular files under `root`.
///
/// Unreadable entries are reported through `options.warn` and skipped.
pub(crate) fn walk<'a>(
    root: &Path,
    filter: WalkFilter<'a>,
    options: &'a IngestOptions,
) -> impl Iterator<Item = PathBuf> + 'a {
    let mut walker = WalkDir::new(root).min_depth(1);
    if !filter.recursive {
        walker = walker.max_depth(1);
    }

    walker
        .into_iter()
        .filter_entry(move |entry| !filter.exclude.iter().any(|p| p == entry.path()))
        .filter_map(move |entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                options.warn(&format!("Skipping unreadable entry: {e}"));
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(move |path| filter.kind.is_none_or(|kind| kind.accepts(path)))
}

/// Resolve every eligible file under `root` into a [`FileRecord`].
///
/// Each file is also indexed in the `src` namespace.
pub(crate) fn resolve_tree(
    store: &ContentStore,
    root: &Path,
    filter: WalkFilter<'_>,
    options: &IngestOptions,
) -> Outcomes<FileRecord, Infallible, ErrorRecord> {
    let resolver = Resolver::new(store, options);
    WorkerPool::new(options).run(walk(root, filter, options), |path, progress| {
        progress.file("Scanning", &path);
        match resolver.resolve(&path) {
            Ok(record) => Outcome::Done(record),
            Err(e) => Outcome::Failed(e),
        }
    })
}

/// Fingerprint every file under `root` into `namespace` without dating it.
pub(crate) fn index_tree(
    store: &ContentStore,
    namespace: Namespace,
    root: &Path,
    filter: WalkFilter<'_>,
    options: &IngestOptions,
) -> Outcomes<Fingerprint, Infallible, ErrorRecord> {
    let fast = options.fast_hash;
    WorkerPool::new(options).run(walk(root, filter, options), |path, progress| {
        progress.file("Scanning", &path);
        match index_file(store, namespace, &path, fast) {
            Ok(fingerprint) => Outcome::Done(fingerprint),
            Err(e) => Outcome::Failed(e),
        }
    })
}

/// Hash both trees and report which source files already exist under `dst`.
///
/// Both trees are walked recursively and every regular file is indexed,
/// whatever its extension. Files that cannot be hashed are reported but do
/// not stop the scan.
///
/// # Errors
///
/// Returns an error if either root is missing or not a directory, if the
/// store cannot be opened, or [`Error::Cancelled`] if the cancel token fires.
///
/// # Example
///
/// ```no_run
/// use mediacopy::{IngestOptions, scan};
/// use std::path::Path;
///
/// let report = scan(Path::new("/media/card"), Path::new("/photos"), &IngestOptions::default())?;
/// for m in &report.matches {
///     println!("{} == {}", m.source.display(), m.destination.display());
/// }
/// # Ok::<(), mediacopy::Error>(())
/// ```
pub fn scan(src: &Path, dst: &Path, options: &IngestOptions) -> Result<ScanReport> {
    let start = Instant::now();
    let src = check_root(src)?;
    let dst = check_root(dst)?;
    let session = Session::open(options)?;
    let filter = WalkFilter {
        recursive: true,
        kind: None,
        exclude: &session.exclude,
    };

    tracing::info!(src = %src.display(), dst = %dst.display(), "indexing trees");
    let src_outcomes = index_tree(&session.store, Namespace::Src, &src, filter, options);
    let dst_outcomes = index_tree(&session.store, Namespace::Dst, &dst, filter, options);

    let mut errored = src_outcomes.failed;
    errored.extend(dst_outcomes.failed);
    for e in &errored {
        options.warn(&format!("{}: {}", e.path.display(), e.message));
    }

    if src_outcomes.cancelled || dst_outcomes.cancelled {
        return Err(Error::Cancelled {
            copied: 0,
            skipped: 0,
            errored: errored.len(),
        });
    }

    let src_set = session.store.prefix_scan(Namespace::Src)?;
    let dst_set = session.store.prefix_scan(Namespace::Dst)?;
    let mut matches = session.store.match_sets(&src_set, &dst_set)?;
    matches.sort();
    tracing::info!(matches = matches.len(), "scan complete");

    Ok(ScanReport {
        matches,
        source_count: src_set.len(),
        destination_count: dst_set.len(),
        errored,
        duration: start.elapsed(),
    })
}
