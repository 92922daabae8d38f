//! Error types for mediacopy.
//!
//! This module provides the [`Error`] enum containing all possible errors
//! that can occur while fingerprinting, parsing, indexing, and copying media,
//! together with the [`Result`] type alias and stable [`ErrorCode`]s.
//!
//! # Error Categories
//!
//! | Category | Errors |
//! |----------|--------|
//! | IO | [`Error::Io`], [`Error::ShortRead`], [`Error::TempFile`], [`Error::Persist`], [`Error::CreateDir`] |
//! | Container structure | [`Error::BoxNotFound`], [`Error::ItemNotFound`], [`Error::UnexpectedAtom`], [`Error::Truncated`], [`Error::Malformed`], [`Error::InvalidSignature`] |
//! | Store | [`Error::Store`], [`Error::StoreConflict`], [`Error::UnencodablePath`] |
//! | Validation | [`Error::SourceNotFound`], [`Error::NotADirectory`], [`Error::IsADirectory`] |
//! | Control | [`Error::Cancelled`] |
//!
//! Only store failures, invalid input roots, and cancellation end a run.
//! Everything else is reported per file as an [`ErrorRecord`](crate::ErrorRecord).

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for mediacopy operations.
///
/// This is a type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Check if an IO error indicates "no space left on device".
///
/// # Platform Support
///
/// | Platform | Error Detection |
/// |----------|-----------------|
/// | Unix | `ENOSPC` (errno 28) |
/// | Windows | `ERROR_DISK_FULL` (0x70) |
pub fn is_no_space_error(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::StorageFull {
        return true;
    }

    #[cfg(unix)]
    {
        if let Some(raw_error) = error.raw_os_error() {
            const ENOSPC: i32 = 28;
            return raw_error == ENOSPC;
        }
    }

    #[cfg(windows)]
    {
        if let Some(raw_error) = error.raw_os_error() {
            const ERROR_DISK_FULL: i32 = 112;
            return raw_error == ERROR_DISK_FULL;
        }
    }

    false
}

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A sampled chunk could not be read in full (the file shrank or is truncated)
    #[error("Short read in {path} at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// File being read
        path: PathBuf,
        /// Offset of the chunk
        offset: u64,
        /// Bytes requested
        expected: u64,
        /// Bytes actually available
        actual: u64,
    },

    /// A required ISOBMFF box is missing
    #[error("'{0}' box not found")]
    BoxNotFound(&'static str),

    /// A required item is missing from the HEIC item tables
    #[error("{0} item not found")]
    ItemNotFound(&'static str),

    /// A QuickTime atom of the wrong type was found where another was required
    #[error("Unexpected atom '{found}', expected '{expected}'")]
    UnexpectedAtom {
        /// Atom type that had to follow
        expected: &'static str,
        /// Atom type actually present
        found: String,
    },

    /// A structure ended before a field could be read
    #[error("Truncated {what} at offset {offset}")]
    Truncated {
        /// Field or structure being read
        what: &'static str,
        /// Absolute offset of the read
        offset: u64,
    },

    /// A structure carries values that cannot be valid
    #[error("Malformed {0}")]
    Malformed(&'static str),

    /// The container signature does not match the file extension
    #[error("Invalid container signature: {0}")]
    InvalidSignature(PathBuf),

    /// Failure in the embedded key-value store
    #[error("Store error: {0}")]
    Store(#[from] rocksdb::Error),

    /// Source path does not exist
    #[error("Source path does not exist: {0}")]
    SourceNotFound(PathBuf),

    /// Source is not a directory
    #[error("Source is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A directory occupies the destination file path
    #[error("Destination is a directory: {0}")]
    IsADirectory(PathBuf),

    /// The store path holds something other than a fingerprint store
    #[error("Refusing to use {0} as a temporary store: directory is not empty")]
    StoreConflict(PathBuf),

    /// A path that cannot be recorded byte-for-byte in the store or resume log
    #[error("Cannot record path {0}: not representable as stored bytes")]
    UnencodablePath(PathBuf),

    /// Failed to create a destination directory
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Failed to create temporary file
    #[error("Failed to create temporary file in {path}: {source}")]
    TempFile {
        /// Directory where temp file creation was attempted
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Failed to persist temporary file
    #[error("Failed to persist temporary file to {path}: {source}")]
    Persist {
        /// Target path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Operation was cancelled via cancellation token
    ///
    /// Files recorded in the resume log before cancellation are skipped
    /// when the same run is repeated.
    #[error("Operation cancelled ({copied} copied, {skipped} skipped, {errored} failed)")]
    Cancelled {
        /// Files copied before cancellation
        copied: usize,
        /// Files skipped before cancellation
        skipped: usize,
        /// Files that failed before cancellation
        errored: usize,
    },
}

/// Stable, machine-readable error classification.
///
/// The string forms are part of the CLI's JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Generic IO failure
    IoError,
    /// Destination storage is full
    NoSpace,
    /// Permission denied by the OS
    PermissionDenied,
    /// A sampled chunk was not fully readable
    ShortRead,
    /// Container structure could not be parsed
    ParseError,
    /// The key-value store failed
    StoreError,
    /// Input root missing
    SourceNotFound,
    /// Invalid arguments or input
    InvalidInput,
    /// Run was cancelled
    Cancelled,
    /// Anything else
    Internal,
}

impl ErrorCode {
    /// Stable string form of the code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IoError => "io_error",
            Self::NoSpace => "no_space",
            Self::PermissionDenied => "permission_denied",
            Self::ShortRead => "short_read",
            Self::ParseError => "parse_error",
            Self::StoreError => "store_error",
            Self::SourceNotFound => "source_not_found",
            Self::InvalidInput => "invalid_input",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn io_code(error: &io::Error) -> ErrorCode {
    if is_no_space_error(error) {
        ErrorCode::NoSpace
    } else if error.kind() == io::ErrorKind::PermissionDenied {
        ErrorCode::PermissionDenied
    } else {
        ErrorCode::IoError
    }
}

impl Error {
    /// Classify this error into a stable [`ErrorCode`].
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(e) => io_code(e),
            Self::CreateDir { source, .. }
            | Self::TempFile { source, .. }
            | Self::Persist { source, .. } => io_code(source),
            Self::ShortRead { .. } => ErrorCode::ShortRead,
            Self::BoxNotFound(_)
            | Self::ItemNotFound(_)
            | Self::UnexpectedAtom { .. }
            | Self::Truncated { .. }
            | Self::Malformed(_)
            | Self::InvalidSignature(_) => ErrorCode::ParseError,
            Self::Store(_) => ErrorCode::StoreError,
            Self::SourceNotFound(_) => ErrorCode::SourceNotFound,
            Self::NotADirectory(_)
            | Self::IsADirectory(_)
            | Self::StoreConflict(_)
            | Self::UnencodablePath(_) => ErrorCode::InvalidInput,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
        }
    }
}
