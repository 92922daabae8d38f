//! Content fingerprints.
//!
//! A fingerprint is either the MD5 of the whole file, or, for large files with
//! fast hashing enabled, the MD5 of three 1 MiB samples plus the file size,
//! prefixed with `fast-`. The prefix keeps the two encodings disjoint.

use crate::error::{Error, Result};
use md5::{Digest, Md5};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Files at or below this size are always hashed in full.
pub const FAST_HASH_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Size of each sampled window.
pub const CHUNK_SIZE: u64 = 1024 * 1024;

const FAST_PREFIX: &str = "fast-";

/// Opaque content identifier used as the dedupe key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a stored fingerprint string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Whether this fingerprint came from sampled hashing.
    #[must_use]
    pub fn is_fast(&self) -> bool {
        self.0.starts_with(FAST_PREFIX)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Sampling {
    pub threshold: u64,
    pub chunk: u64,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            threshold: FAST_HASH_THRESHOLD,
            chunk: CHUNK_SIZE,
        }
    }
}

/// Compute the fingerprint of the file at `path`.
///
/// # Errors
///
/// - [`Error::Io`] if the file cannot be opened, statted, or read
/// - [`Error::ShortRead`] if a sampled chunk cannot be read in full
pub fn fingerprint(path: &Path, fast: bool) -> Result<Fingerprint> {
    fingerprint_with(path, fast, Sampling::default())
}

pub(crate) fn fingerprint_with(path: &Path, fast: bool, sampling: Sampling) -> Result<Fingerprint> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();

    if !fast || size <= sampling.threshold {
        return Ok(Fingerprint(full_digest(&mut file)?));
    }

    if size <= sampling.chunk * 3 {
        return Ok(Fingerprint(format!("{FAST_PREFIX}{}", full_digest(&mut file)?)));
    }

    let mut hasher = Md5::new();
    let mut buf = vec![0u8; sampling.chunk as usize];
    let offsets = [
        0,
        size / 2 - sampling.chunk / 2,
        size - sampling.chunk,
    ];
    for offset in offsets {
        read_chunk(&mut file, path, offset, &mut buf)?;
        hasher.update(&buf);
    }
    hasher.update(format!("|{size}").as_bytes());

    Ok(Fingerprint(format!("{FAST_PREFIX}{:x}", hasher.finalize())))
}

fn full_digest(file: &mut File) -> io::Result<String> {
    let mut hasher = Md5::new();
    io::copy(&mut BufReader::new(file), &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn read_chunk(file: &mut File, path: &Path, offset: u64, buf: &mut [u8]) -> Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    if filled < buf.len() {
        return Err(Error::ShortRead {
            path: path.to_path_buf(),
            offset,
            expected: buf.len() as u64,
            actual: filled as u64,
        });
    }
    Ok(())
}
