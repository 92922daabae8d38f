//! Per-format creation-time policy.
//!
//! | Format | Source of the timestamp | On parse failure |
//! |--------|------------------------|------------------|
//! | EXIF (jpg, tiff, raw) | EXIF `DateTimeOriginal`/`DateTimeDigitized`/`DateTime` | modification time |
//! | HEIC | Exif item from `meta`, then EXIF | modification time |
//! | QuickTime family | `mvhd` creation time | no `moov`: modification time; corrupt `mvhd`: error |
//! | MPEG-PS | modification time | bad pack header: error |
//! | everything else | modification time | n/a |
//!
//! Every resolved file is fingerprinted and indexed in the `src` namespace.

use crate::error::Result;
use crate::hash::{self, Fingerprint};
use crate::media::MediaFormat;
use crate::options::IngestOptions;
use crate::parse::{heic, quicktime};
use crate::record::{ErrorRecord, FileRecord};
use crate::store::{ContentStore, Namespace};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone};
use exif::{In, Tag, Value};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

const EXIF_DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Resolves source files into [`FileRecord`]s.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    store: &'a ContentStore,
    options: &'a IngestOptions,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(store: &'a ContentStore, options: &'a IngestOptions) -> Self {
        Self { store, options }
    }

    /// Fingerprint, index, and date one file.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorRecord`] if the file cannot be hashed, indexed, or
    /// statted, or if its container is present but corrupt.
    pub fn resolve(&self, path: &Path) -> std::result::Result<FileRecord, ErrorRecord> {
        let fingerprint = hash::fingerprint(path, self.options.fast_hash)
            .map_err(|e| ErrorRecord::now(path, e.to_string()))?;
        self.store
            .put(Namespace::Src, &fingerprint, path)
            .map_err(|e| ErrorRecord::now(path, e.to_string()))?;

        let timestamp = self
            .timestamp(path)
            .map_err(|e| ErrorRecord::now(path, e.to_string()))?;

        Ok(FileRecord {
            path: path.to_path_buf(),
            timestamp,
            fingerprint,
        })
    }

    fn timestamp(&self, path: &Path) -> Result<DateTime<Local>> {
        match MediaFormat::from_path(path) {
            MediaFormat::Exif => match exif_from_file(path) {
                Some(ts) => Ok(ts),
                None => self.fallback(path, "no EXIF date"),
            },
            MediaFormat::Heic => match exif_from_heic(path) {
                Ok(Some(ts)) => Ok(ts),
                Ok(None) => self.fallback(path, "no EXIF date"),
                Err(e) => self.fallback(path, &e.to_string()),
            },
            MediaFormat::QuickTime => {
                let mut reader = BufReader::new(File::open(path)?);
                match quicktime::creation_time(&mut reader)? {
                    Some(ts) => Ok(ts.with_timezone(&Local)),
                    None => self.fallback(path, "no movie header"),
                }
            }
            MediaFormat::MpegPs => {
                let mut file = File::open(path)?;
                quicktime::validate_program_stream(&mut file, path)?;
                modification_time(path)
            }
            MediaFormat::Plain => modification_time(path),
        }
    }

    fn fallback(&self, path: &Path, why: &str) -> Result<DateTime<Local>> {
        self.options.verbose(&format!(
            "{}: {why}, using modification time",
            path.display()
        ));
        modification_time(path)
    }
}

/// Fingerprint a file and index it in `namespace` without dating it.
pub(crate) fn index_file(
    store: &ContentStore,
    namespace: Namespace,
    path: &Path,
    fast: bool,
) -> std::result::Result<Fingerprint, ErrorRecord> {
    let fingerprint =
        hash::fingerprint(path, fast).map_err(|e| ErrorRecord::now(path, e.to_string()))?;
    store
        .put(namespace, &fingerprint, path)
        .map_err(|e| ErrorRecord::now(path, e.to_string()))?;
    Ok(fingerprint)
}

pub(crate) fn modification_time(path: &Path) -> Result<DateTime<Local>> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified))
}

fn exif_from_file(path: &Path) -> Option<DateTime<Local>> {
    let file = File::open(path).ok()?;
    let exif = exif::Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()?;
    exif_timestamp(&exif)
}

fn exif_from_heic(path: &Path) -> Result<Option<DateTime<Local>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let raw = heic::extract_exif(&mut reader)?;
    Ok(exif::Reader::new()
        .read_raw(raw)
        .ok()
        .and_then(|exif| exif_timestamp(&exif)))
}

fn exif_timestamp(exif: &exif::Exif) -> Option<DateTime<Local>> {
    EXIF_DATE_TAGS.iter().find_map(|&tag| {
        let field = exif.get_field(tag, In::PRIMARY)?;
        let Value::Ascii(ref values) = field.value else {
            return None;
        };
        let stamp = exif::DateTime::from_ascii(values.first()?).ok()?;
        to_local(&stamp)
    })
}

fn to_local(stamp: &exif::DateTime) -> Option<DateTime<Local>> {
    let naive = NaiveDate::from_ymd_opt(
        i32::from(stamp.year),
        u32::from(stamp.month),
        u32::from(stamp.day),
    )?
    .and_hms_opt(
        u32::from(stamp.hour),
        u32::from(stamp.minute),
        u32::from(stamp.second),
    )?;
    match stamp.offset {
        Some(minutes) => FixedOffset::east_opt(i32::from(minutes) * 60)?
            .from_local_datetime(&naive)
            .single()
            .map(|ts| ts.with_timezone(&Local)),
        None => Local.from_local_datetime(&naive).earliest(),
    }
}
