//! QuickTime/MP4 creation time and MPEG program stream validation.

use super::cursor::{self, Cursor};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Seconds between 1904-01-01 (QuickTime epoch) and 1970-01-01.
pub const APPLE_EPOCH_OFFSET: i64 = 2_082_844_800;

/// Pack header start code of an MPEG program stream.
pub const PACK_START_CODE: [u8; 4] = [0x00, 0x00, 0x01, 0xba];

/// Read the movie creation time from the `mvhd` atom.
///
/// Returns `Ok(None)` when the file has no usable `moov` atom (end of file
/// reached first, or a top-level atom with an unusable size) or when the
/// creation time field is zero. Callers fall back to the modification time.
///
/// # Errors
///
/// - [`Error::UnexpectedAtom`] if `moov` does not begin with `mvhd`
/// - [`Error::Truncated`] if `mvhd` is cut short
/// - [`Error::Io`] for read failures
pub fn creation_time<R: Read + Seek>(reader: &mut R) -> Result<Option<DateTime<Utc>>> {
    reader.seek(SeekFrom::Start(0))?;
    loop {
        let Some(atom) = cursor::read_header(reader)? else {
            return Ok(None);
        };
        if atom.is(b"moov") {
            break;
        }
        if !cursor::skip_box(reader, &atom)? {
            return Ok(None);
        }
    }

    let position = reader.stream_position()?;
    let Some(first) = cursor::read_header(reader)? else {
        return Err(Error::Truncated {
            what: "moov",
            offset: position,
        });
    };
    if !first.is(b"mvhd") {
        return Err(Error::UnexpectedAtom {
            expected: "mvhd",
            found: first.kind_str(),
        });
    }

    // version + flags, then a 32- or 64-bit creation time
    let mut head = [0u8; 12];
    let offset = first.payload_offset();
    let available = cursor::read_full(reader, &mut head[..8])?;
    if !available {
        return Err(Error::Truncated {
            what: "mvhd",
            offset,
        });
    }
    let seconds = if head[0] == 1 {
        if !cursor::read_full(reader, &mut head[8..])? {
            return Err(Error::Truncated {
                what: "mvhd",
                offset,
            });
        }
        let mut c = Cursor::new(&head[4..], offset + 4);
        c.read_u64("mvhd creation time")?
    } else {
        let mut c = Cursor::new(&head[4..8], offset + 4);
        u64::from(c.read_u32("mvhd creation time")?)
    };

    if seconds == 0 {
        return Ok(None);
    }
    let seconds = i64::try_from(seconds).map_err(|_| Error::Malformed("mvhd creation time"))?;
    DateTime::from_timestamp(seconds - APPLE_EPOCH_OFFSET, 0)
        .map(Some)
        .ok_or(Error::Malformed("mvhd creation time"))
}

/// Check that an MPEG program stream starts with a pack header.
///
/// An empty file passes; there is nothing to contradict the extension.
///
/// # Errors
///
/// - [`Error::InvalidSignature`] if the first four bytes are not `00 00 01 BA`
/// - [`Error::Io`] for read failures
pub fn validate_program_stream<R: Read>(reader: &mut R, path: &Path) -> Result<()> {
    let mut head = Vec::with_capacity(4);
    reader.take(4).read_to_end(&mut head)?;
    if head.is_empty() || head == PACK_START_CODE {
        Ok(())
    } else {
        Err(Error::InvalidSignature(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::fixtures::{make_box, quicktime_with_creation};
    use std::io::Cursor as IoCursor;

    #[test]
    fn test_creation_time_past_epoch() {
        let file = quicktime_with_creation(2_082_844_900);
        let time = creation_time(&mut IoCursor::new(file)).unwrap().unwrap();
        assert_eq!(time.to_rfc3339(), "1970-01-01T00:01:40+00:00");
    }

    #[test]
    fn test_version_one_mvhd() {
        let mut mvhd = vec![1, 0, 0, 0];
        mvhd.extend_from_slice(&(2_082_844_800u64 + 86_400).to_be_bytes());
        mvhd.extend_from_slice(&[0; 20]);
        let file = make_box(b"moov", &make_box(b"mvhd", &mvhd));

        let time = creation_time(&mut IoCursor::new(file)).unwrap().unwrap();
        assert_eq!(time.to_rfc3339(), "1970-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_no_moov_falls_back() {
        let mut file = make_box(b"ftyp", b"isom");
        file.extend(make_box(b"mdat", &[0; 16]));
        assert_eq!(creation_time(&mut IoCursor::new(file)).unwrap(), None);
    }

    #[test]
    fn test_short_atom_falls_back() {
        let mut file = make_box(b"ftyp", b"isom");
        file.extend_from_slice(&4u32.to_be_bytes());
        file.extend_from_slice(b"junk");
        assert_eq!(creation_time(&mut IoCursor::new(file)).unwrap(), None);
    }

    #[test]
    fn test_overflowing_extended_size_falls_back() {
        let mut file = make_box(b"ftyp", &[]);
        file.extend_from_slice(&1u32.to_be_bytes());
        file.extend_from_slice(b"free");
        file.extend_from_slice(&(u64::MAX - 7).to_be_bytes());
        assert_eq!(creation_time(&mut IoCursor::new(file)).unwrap(), None);
    }

    #[test]
    fn test_extended_size_below_header_falls_back() {
        let mut file = make_box(b"ftyp", &[]);
        file.extend_from_slice(&1u32.to_be_bytes());
        file.extend_from_slice(b"free");
        file.extend_from_slice(&8u64.to_be_bytes());
        file.extend(quicktime_with_creation(1));
        assert_eq!(creation_time(&mut IoCursor::new(file)).unwrap(), None);
    }

    #[test]
    fn test_empty_file_falls_back() {
        assert_eq!(creation_time(&mut IoCursor::new(Vec::new())).unwrap(), None);
    }

    #[test]
    fn test_moov_must_start_with_mvhd() {
        let file = make_box(b"moov", &make_box(b"trak", &[0; 8]));
        match creation_time(&mut IoCursor::new(file)) {
            Err(Error::UnexpectedAtom { expected, found }) => {
                assert_eq!(expected, "mvhd");
                assert_eq!(found, "trak");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_truncated_mvhd() {
        let mut file = make_box(b"moov", &[]);
        file[3] = 20;
        file.extend_from_slice(&20u32.to_be_bytes());
        file.extend_from_slice(b"mvhd");
        file.extend_from_slice(&[0, 0]);
        let err = creation_time(&mut IoCursor::new(file)).unwrap_err();
        assert!(matches!(err, Error::Truncated { what: "mvhd", .. }));
    }

    #[test]
    fn test_zero_creation_time() {
        let file = quicktime_with_creation(0);
        assert_eq!(creation_time(&mut IoCursor::new(file)).unwrap(), None);
    }

    #[test]
    fn test_program_stream_signature() {
        let path = Path::new("clip.mpg");
        let good = [0x00, 0x00, 0x01, 0xba, 0x44];
        assert!(validate_program_stream(&mut &good[..], path).is_ok());
        assert!(validate_program_stream(&mut &[][..], path).is_ok());

        let bad = [0x00, 0x00, 0x01, 0xb3];
        let err = validate_program_stream(&mut &bad[..], path).unwrap_err();
        assert!(matches!(err, Error::InvalidSignature(_)));
        assert!(validate_program_stream(&mut &[0x00, 0x00][..], path).is_err());
    }
}
