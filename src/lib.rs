//! # mediacopy
//!
//! Date-organised, deduplicating, resumable photo and video ingestion.
//!
//! ## Core Features
//!
//! - **Creation dates from metadata**: EXIF for JPEG/TIFF/raw, the Exif item of
//!   HEIC files, and the `mvhd` atom of QuickTime/MP4 containers, falling back
//!   to the modification time
//! - **Content deduplication**: every file is fingerprinted into an embedded
//!   RocksDB store, and content already under the output root is skipped
//! - **Fast hashing**: files above 50 MiB are sampled at three 1 MiB windows
//!   plus their size instead of being read in full
//! - **Parallel pipeline**: a bounded queue feeds a fixed pool of rayon workers,
//!   so walking and hashing overlap
//! - **Resumable**: every finished copy is appended to a log, and re-runs skip
//!   what the log lists
//! - **Atomic writes**: temp file + rename, so no partial file ever carries the
//!   final name
//!
//! ## Quick Start with Builder API
//!
//! ```no_run
//! use mediacopy::{DateLayout, IngestBuilder};
//!
//! let report = IngestBuilder::new("/media/card/DCIM", "/photos")
//!     .recursive()
//!     .date_layout(DateLayout::Date)
//!     .run()?;
//! println!(
//!     "Copied {} files ({} bytes), skipped {}, {} errors",
//!     report.copied.len(),
//!     report.bytes_copied,
//!     report.skipped.len(),
//!     report.errored.len()
//! );
//! # Ok::<(), mediacopy::Error>(())
//! ```
//!
//! ## Function API
//!
//! ```no_run
//! use mediacopy::{IngestOptions, MediaKind, Overwrite, ingest};
//! use std::path::Path;
//!
//! let options = IngestOptions::default()
//!     .with_kind(MediaKind::Video)
//!     .with_workers(4)
//!     .with_overwrite(Overwrite::Yes);
//!
//! let report = ingest(Path::new("/media/card"), Path::new("/videos"), &options)?;
//! # Ok::<(), mediacopy::Error>(())
//! ```
//!
//! ## Building Blocks
//!
//! The stages are usable on their own:
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`fingerprint`] | full or sampled MD5 of a file |
//! | [`parse::heic::extract_exif`] | raw TIFF bytes of a HEIC file's Exif item |
//! | [`parse::quicktime::creation_time`] | `mvhd` creation time |
//! | [`Resolver`] | fingerprint, index, and date one file |
//! | [`ContentStore`] | namespaced fingerprint index with set matching |
//! | [`WorkerPool`] | bounded fan-out/fan-in over a job iterator |
//! | [`ResumeLog`] | append-only record of finished copies |
//!
//! ## Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `progress` | Spinner fed by the progress channel, with indicatif |
//! | `serde` | Serialize/Deserialize for [`IngestOptions`] |
//! | `full` | Enable all optional features |

#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
mod error;
mod hash;
mod ingest;
mod media;
mod options;
pub mod parse;
mod pipeline;
mod record;
mod resolve;
mod resume;
mod store;

#[cfg(feature = "progress")]
mod progress;

pub use builder::IngestBuilder;
pub use error::{Error, ErrorCode, Result, is_no_space_error};
pub use hash::{CHUNK_SIZE, FAST_HASH_THRESHOLD, Fingerprint, fingerprint};
pub use ingest::utils::{destination_dir, sanitize_file_name};
pub use ingest::{ingest, remove_copied_sources, scan};
pub use media::MediaFormat;
pub use options::{
    DEFAULT_RESUME_LOG, DEFAULT_STORE_PATH, DateLayout, IngestOptions, MediaKind, Overwrite,
};
pub use pipeline::{Outcome, Outcomes, Progress, WorkerPool};
pub use record::{
    CopiedFile, ErrorRecord, FileRecord, IngestReport, MatchObject, RemovedFile, ScanReport,
    SkipReason, SkippedFile,
};
pub use resolve::Resolver;
pub use resume::{ResumeLog, filter_pending, load as load_resume_log};
pub use store::{ContentStore, Namespace, intersect};

#[cfg(feature = "progress")]
#[cfg_attr(docsrs, doc(cfg(feature = "progress")))]
pub use progress::{Spinner, create_spinner};
