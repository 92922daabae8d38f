//! Extension allow-lists and per-extension container classification.

use crate::options::MediaKind;
use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "gif", "png", "bmp", "heic", "tiff", "tif", "webp", "svg", "psd", "ai", "cr2",
    "nef", "arw", "dng", "orf", "rw2", "raf", "cr3",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "wmv", "avi", "mpg", "3gp", "m4v", "mkv", "webm", "flv", "ts", "mts", "m2ts",
    "vob", "ogg", "qt", "yuv", "rm", "rmvb", "viv", "asf", "amv", "svi", "3g2", "mxf", "roq",
    "nsv", "f4v", "f4p", "f4a", "f4b",
];

// TIFF-framed: the EXIF decoder reads these directly.
const EXIF_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "tiff", "tif", "cr2", "nef", "arw", "dng", "orf", "rw2", "raf",
];

const QUICKTIME_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "3gp", "m4v", "qt", "3g2", "f4v", "f4p", "f4a", "f4b",
];

const MPEG_PS_EXTENSIONS: &[&str] = &["mpg", "vob"];

/// Lowercased extension of `path`, if any.
pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

impl MediaKind {
    /// Whether a file with this path is eligible for this kind of run.
    #[must_use]
    pub fn accepts(self, path: &Path) -> bool {
        let Some(ext) = extension(path) else {
            return false;
        };
        let list = match self {
            Self::Image => IMAGE_EXTENSIONS,
            Self::Video => VIDEO_EXTENSIONS,
        };
        list.contains(&ext.as_str())
    }
}

/// How a file's creation time is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    /// EXIF decoded straight from the file
    Exif,
    /// EXIF block extracted from the HEIC item tables
    Heic,
    /// `moov`/`mvhd` creation time
    QuickTime,
    /// MPEG program stream: signature check only
    MpegPs,
    /// Modification time only
    Plain,
}

impl MediaFormat {
    /// Classify a path by its lowercase extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = extension(path) else {
            return Self::Plain;
        };
        let ext = ext.as_str();
        if EXIF_EXTENSIONS.contains(&ext) {
            Self::Exif
        } else if ext == "heic" {
            Self::Heic
        } else if QUICKTIME_EXTENSIONS.contains(&ext) {
            Self::QuickTime
        } else if MPEG_PS_EXTENSIONS.contains(&ext) {
            Self::MpegPs
        } else {
            Self::Plain
        }
    }
}
