//! Helpers for the copy stage: destination layout, file names, content
//! copying, and timestamps.

use crate::options::DateLayout;
use chrono::{DateTime, TimeZone};
use filetime::{FileTime, set_file_times};
use std::fmt;
use std::fs::{File, Metadata};
use std::io;
use std::path::{Path, PathBuf};

// =============================================================================
// Destination layout
// =============================================================================

/// Directory a file dated `timestamp` lands in under `root`.
///
/// | Layout | Result |
/// |--------|--------|
/// | `Date` | `root/YYYY-MM-DD` |
/// | `YearMonth` | `root/YYYY/MM` |
/// | `Flat` | `root` |
pub fn destination_dir<Tz>(root: &Path, timestamp: &DateTime<Tz>, layout: DateLayout) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    match layout {
        DateLayout::Date => root.join(timestamp.format("%Y-%m-%d").to_string()),
        DateLayout::YearMonth => root
            .join(timestamp.format("%Y").to_string())
            .join(timestamp.format("%m").to_string()),
        DateLayout::Flat => root.to_path_buf(),
    }
}

/// Replace URL-encoded and literal spaces with underscores.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    name.replace("%20", "_").replace(' ', "_")
}

// =============================================================================
// File content copying
// =============================================================================

/// Efficiently copy file contents using the best available method.
///
/// On Linux 4.5+, uses `copy_file_range` for zero-copy kernel-to-kernel transfer.
/// Falls back to `std::io::copy` on other platforms or on error.
///
/// Fails with [`io::ErrorKind::UnexpectedEof`] when the number of bytes
/// copied differs from `len`, i.e. the source changed size mid-copy.
pub(crate) fn copy_file_contents(src: &File, dst: &File, len: u64) -> io::Result<u64> {
    #[cfg(target_os = "linux")]
    let copied = copy_file_range_all(src, dst, len)?;
    #[cfg(not(target_os = "linux"))]
    let copied = {
        use std::io::BufReader;
        io::copy(&mut BufReader::new(src), &mut &*dst)?
    };

    if copied != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("source changed size during copy: expected {len} bytes, copied {copied}"),
        ));
    }
    Ok(copied)
}

#[cfg(target_os = "linux")]
fn copy_file_range_all(src: &File, dst: &File, len: u64) -> io::Result<u64> {
    use std::os::unix::io::AsRawFd;

    let src_fd = src.as_raw_fd();
    let dst_fd = dst.as_raw_fd();
    let mut remaining = len;
    let mut copied: u64 = 0;

    while remaining > 0 {
        let chunk_size = remaining.min(128 * 1024 * 1024) as usize;

        // SAFETY: both descriptors are open for the duration of the call and
        // null offsets mean "use and advance the file position".
        let result = unsafe {
            libc::copy_file_range(
                src_fd,
                std::ptr::null_mut(),
                dst_fd,
                std::ptr::null_mut(),
                chunk_size,
                0,
            )
        };

        if result < 0 {
            let err = io::Error::last_os_error();
            // EXDEV: cross-device, ENOSYS: not supported, EINVAL: fs doesn't support it
            if copied == 0
                && matches!(
                    err.raw_os_error(),
                    Some(libc::EXDEV | libc::ENOSYS | libc::EINVAL | libc::EOPNOTSUPP)
                )
            {
                use std::io::BufReader;
                return io::copy(&mut BufReader::new(src), &mut &*dst);
            }
            return Err(err);
        }

        if result == 0 {
            // source shrank underneath us
            break;
        }

        let bytes_copied = result as u64;
        copied += bytes_copied;
        remaining = remaining.saturating_sub(bytes_copied);
    }

    Ok(copied)
}

// =============================================================================
// Timestamps
// =============================================================================

/// Set both mtime and atime of `dst` to the source's modification time.
pub(crate) fn apply_source_mtime(src_meta: &Metadata, dst: &Path) -> io::Result<()> {
    let mtime = FileTime::from_last_modification_time(src_meta);
    set_file_times(dst, mtime, mtime)
}
