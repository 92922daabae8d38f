//! Fingerprint store over RocksDB.
//!
//! Keys are `"{namespace}-{fingerprint}"`, values are absolute paths. A key
//! holds one path at a time (last writer wins), so the store answers "is this
//! content present, and where is one copy of it", not "how many copies".

use crate::error::{Error, Result};
use crate::hash::Fingerprint;
use crate::record::MatchObject;
use rocksdb::{DB, Direction, IteratorMode, Options};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Logical partition of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Files under the input root
    Src,
    /// Files under the output root
    Dst,
}

impl Namespace {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Src => "src",
            Self::Dst => "dst",
        }
    }

    fn key(self, fingerprint: &Fingerprint) -> String {
        format!("{}-{}", self.as_str(), fingerprint)
    }

    fn prefix(self) -> String {
        format!("{}-", self.as_str())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned handle on the on-disk fingerprint store.
///
/// Opened once per run and passed by reference to every stage. When created
/// with [`ContentStore::open_temporary`], the store's files are removed on
/// drop, including on early returns and panics.
pub struct ContentStore {
    // Declared before `cleanup`: RocksDB holds a lock on the directory until
    // the handle closes, and fields drop in declaration order.
    db: DB,
    path: PathBuf,
    cleanup: Option<RemoveOnDrop>,
}

struct RemoveOnDrop(PathBuf);

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Err(e) = DB::destroy(&Options::default(), &self.0) {
            tracing::warn!(path = %self.0.display(), "failed to destroy content store: {e}");
        }
        if let Err(e) = remove_store_files(&self.0) {
            tracing::warn!(path = %self.0.display(), "failed to clean content store: {e}");
        }
        // Non-recursive: anything RocksDB did not write stays put.
        if let Err(e) = fs::remove_dir(&self.0) {
            tracing::debug!(path = %self.0.display(), "content store directory kept: {e}");
        }
    }
}

/// Whether `name` is a file RocksDB creates in its directory.
fn is_store_file(name: &str) -> bool {
    matches!(name, "CURRENT" | "IDENTITY" | "LOCK" | "LOG")
        || name.starts_with("LOG.old.")
        || name.starts_with("MANIFEST-")
        || name.starts_with("OPTIONS-")
        || [".log", ".sst", ".blob", ".dbtmp"]
            .iter()
            .any(|ext| name.ends_with(ext))
}

fn is_store_dir(path: &Path) -> bool {
    path.join("CURRENT").is_file()
}

/// Delete RocksDB leftovers in `dir`, leaving every other entry alone.
fn remove_store_files(dir: &Path) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let entry = entry?;
        let ours = entry.file_name().to_str().is_some_and(is_store_file);
        if ours && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Byte form of `path` as written to the store and the resume log.
///
/// Exact on Unix. Elsewhere a path must be valid Unicode.
///
/// # Errors
///
/// Returns [`Error::UnencodablePath`] if the path has no exact byte form.
pub(crate) fn encode_path(path: &Path) -> Result<&[u8]> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Ok(path.as_os_str().as_bytes())
    }
    #[cfg(not(unix))]
    {
        path.to_str()
            .map(str::as_bytes)
            .ok_or_else(|| Error::UnencodablePath(path.to_path_buf()))
    }
}

/// Inverse of [`encode_path`].
///
/// # Errors
///
/// Returns [`Error::Malformed`] if the bytes cannot name a path on this platform.
pub(crate) fn decode_path(bytes: &[u8]) -> Result<PathBuf> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Ok(PathBuf::from(std::ffi::OsStr::from_bytes(bytes)))
    }
    #[cfg(not(unix))]
    {
        std::str::from_utf8(bytes)
            .map(PathBuf::from)
            .map_err(|_| Error::Malformed("stored path"))
    }
}

impl fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStore")
            .field("path", &self.path)
            .field("temporary", &self.cleanup.is_some())
            .finish_non_exhaustive()
    }
}

impl ContentStore {
    /// Open (or create) a store that persists after the handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`](crate::Error::Store) if RocksDB cannot open the directory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let db = DB::open(&db_options(), &path)?;
        tracing::debug!(path = %path.display(), "opened content store");
        Ok(Self {
            db,
            path,
            cleanup: None,
        })
    }

    /// Open a fresh store that is deleted when the handle is dropped.
    ///
    /// Leftovers from an interrupted run at the same path are discarded first.
    /// An existing directory is only reused when it is empty or already holds
    /// a RocksDB store; on drop only RocksDB's own files are removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreConflict`] if `path` is a non-empty directory
    /// that is not a store, or any other existing non-directory entry.
    /// Returns [`Error::Store`](crate::Error::Store) if RocksDB cannot open the directory.
    pub fn open_temporary(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if is_store_dir(&path) {
            DB::destroy(&Options::default(), &path)?;
            remove_store_files(&path)?;
        } else if path.exists() {
            let empty = path.is_dir() && fs::read_dir(&path)?.next().is_none();
            if !empty {
                return Err(Error::StoreConflict(path));
            }
        }
        let mut store = Self::open(path)?;
        store.cleanup = Some(RemoveOnDrop(store.path.clone()));
        Ok(store)
    }

    /// Directory backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `path` under `fingerprint` in `namespace`, replacing any previous path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`](crate::Error::Store) on write failure, or
    /// [`Error::UnencodablePath`] if `path` cannot be stored exactly.
    pub fn put(&self, namespace: Namespace, fingerprint: &Fingerprint, path: &Path) -> Result<()> {
        self.db.put(namespace.key(fingerprint), encode_path(path)?)?;
        Ok(())
    }

    /// Path recorded under `fingerprint` in `namespace`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`](crate::Error::Store) on read failure.
    pub fn get(&self, namespace: Namespace, fingerprint: &Fingerprint) -> Result<Option<PathBuf>> {
        let value = self.db.get(namespace.key(fingerprint))?;
        value.map(|bytes| decode_path(&bytes)).transpose()
    }

    /// Every fingerprint recorded in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`](crate::Error::Store) on iteration failure.
    pub fn prefix_scan(&self, namespace: Namespace) -> Result<HashSet<Fingerprint>> {
        let prefix = namespace.prefix();
        let mut out = HashSet::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            let Some(rest) = key.strip_prefix(prefix.as_bytes()) else {
                break;
            };
            out.insert(Fingerprint::new(String::from_utf8_lossy(rest).into_owned()));
        }
        Ok(out)
    }

    /// Pair up source and destination paths for every fingerprint in both sets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`](crate::Error::Store) if a path lookup fails.
    pub fn match_sets(
        &self,
        src: &HashSet<Fingerprint>,
        dst: &HashSet<Fingerprint>,
    ) -> Result<Vec<MatchObject>> {
        let mut out = Vec::new();
        for fingerprint in intersect(src, dst) {
            let source = self.get(Namespace::Src, fingerprint)?;
            let destination = self.get(Namespace::Dst, fingerprint)?;
            if let (Some(source), Some(destination)) = (source, destination) {
                out.push(MatchObject {
                    source,
                    destination,
                });
            }
        }
        Ok(out)
    }

    /// Scan both namespaces and match them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`](crate::Error::Store) on any store failure.
    pub fn matches(&self) -> Result<Vec<MatchObject>> {
        let src = self.prefix_scan(Namespace::Src)?;
        let dst = self.prefix_scan(Namespace::Dst)?;
        self.match_sets(&src, &dst)
    }
}

fn db_options() -> Options {
    let mut options = Options::default();
    options.create_if_missing(true);
    options
}

/// Fingerprints present in both sets, in sorted order.
///
/// The smaller set is indexed and the larger one probed against it.
#[must_use]
pub fn intersect<'a>(a: &'a HashSet<Fingerprint>, b: &'a HashSet<Fingerprint>) -> Vec<&'a Fingerprint> {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let index: HashSet<&Fingerprint> = small.iter().collect();
    let mut out: Vec<&Fingerprint> = large.iter().filter(|f| index.contains(f)).collect();
    out.sort();
    out
}
