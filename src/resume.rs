//! Append-only log of copied sources.
//!
//! One absolute source path per line, stored as the path's exact bytes and
//! written only after the destination file is fully in place. Duplicate lines are harmless. The log is read once
//! per run to exclude already-copied sources and is never rewritten.

use crate::error::{Error, Result};
use crate::record::FileRecord;
use crate::store::{decode_path, encode_path};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Shared writer over the resume log file.
///
/// Appends from concurrent copy workers are serialized through a mutex.
#[derive(Debug)]
pub struct ResumeLog {
    path: PathBuf,
    writer: Mutex<File>,
}

impl ResumeLog {
    /// Open the log for appending, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the file cannot be created or opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(file),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every path recorded so far.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the file cannot be read.
    pub fn entries(&self) -> Result<HashSet<PathBuf>> {
        load(&self.path)
    }

    /// Append `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the write fails, or
    /// [`Error::UnencodablePath`] if `source` contains a newline or has no
    /// exact byte form.
    pub fn record(&self, source: &Path) -> Result<()> {
        let bytes = encode_path(source)?;
        if bytes.contains(&b'\n') {
            return Err(Error::UnencodablePath(source.to_path_buf()));
        }
        let mut line = Vec::with_capacity(bytes.len() + 1);
        line.extend_from_slice(bytes);
        line.push(b'\n');
        // A poisoned lock only means another writer panicked mid-append; the
        // file handle itself is still usable.
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Read the set of recorded paths. A missing file is an empty set.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) for any read failure other than not-found.
pub fn load(path: &Path) -> Result<HashSet<PathBuf>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(e.into()),
    };
    let mut out = HashSet::new();
    for line in BufReader::new(file).split(b'\n') {
        let line = line?;
        if !line.is_empty() {
            out.insert(decode_path(&line)?);
        }
    }
    Ok(out)
}

/// Split `records` into those not yet in the log and a count of the rest.
#[must_use]
pub fn filter_pending(
    records: Vec<FileRecord>,
    copied: &HashSet<PathBuf>,
) -> (Vec<FileRecord>, usize) {
    let before = records.len();
    let pending: Vec<FileRecord> = records
        .into_iter()
        .filter(|r| !copied.contains(&r.path))
        .collect();
    let excluded = before - pending.len();
    (pending, excluded)
}
