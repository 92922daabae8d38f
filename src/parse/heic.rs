//! HEIC/HEIF Exif extraction.
//!
//! The Exif block of a HEIC image is stored as an item: `meta/iinf` names it,
//! `meta/iloc` says where its bytes live. This module finds those tables,
//! reads the item, and returns the TIFF-framed bytes the EXIF decoder expects.

use super::cursor::{self, BoxHeader, Cursor, boxes};
use crate::error::{Error, Result};
use std::io::{Read, Seek, SeekFrom};

/// The `meta` box must start within this many bytes of the file start.
pub const META_SEARCH_LIMIT: u64 = 1024 * 1024;

// Upper bound for any single allocation driven by on-disk sizes.
const MAX_READ: u64 = 64 * 1024 * 1024;

const EXIF_MARKER: &[u8] = b"Exif\0\0";

/// Extract the raw Exif block of a HEIC file.
///
/// The returned bytes start at the TIFF header when the item carries the
/// usual `Exif\0\0` marker.
///
/// # Errors
///
/// - [`Error::BoxNotFound`] if `meta` is not within the first MiB, or lacks `iinf`/`iloc`
/// - [`Error::ItemNotFound`] if no `Exif` item is declared or located
/// - [`Error::Truncated`] / [`Error::Malformed`] for inconsistent tables
/// - [`Error::Io`] for read failures
pub fn extract_exif<R: Read + Seek>(reader: &mut R) -> Result<Vec<u8>> {
    let meta = find_meta(reader)?;
    let data = read_payload(reader, &meta)?;
    let base = meta.payload_offset();

    // FullBox: version + flags precede the children
    Cursor::new(&data, base).skip(4, "meta version")?;

    let mut iinf = None;
    let mut iloc = None;
    let mut idat = None;
    for header in boxes(&data[4..], base + 4) {
        let header = header?;
        match &header.kind {
            b"iinf" => iinf = Some(header),
            b"iloc" => iloc = Some(header),
            b"idat" => idat = Some(header),
            _ => {}
        }
    }
    let iinf = iinf.ok_or(Error::BoxNotFound("iinf"))?;
    let iloc = iloc.ok_or(Error::BoxNotFound("iloc"))?;

    let item_id = exif_item_id(cursor::payload(&data, base, &iinf), iinf.payload_offset())?;
    let location = locate_item(
        cursor::payload(&data, base, &iloc),
        iloc.payload_offset(),
        item_id,
    )?;

    let item = match location.method {
        ConstructionMethod::File => read_extents(reader, &location)?,
        ConstructionMethod::Idat => {
            let idat = idat.ok_or(Error::BoxNotFound("idat"))?;
            let idat_data = cursor::payload(&data, base, &idat);
            slice_extents(idat_data, &location)?
        }
    };

    Ok(strip_exif_header(item))
}

fn find_meta<R: Read + Seek>(reader: &mut R) -> Result<BoxHeader> {
    reader.seek(SeekFrom::Start(0))?;
    loop {
        let position = reader.stream_position()?;
        if position >= META_SEARCH_LIMIT {
            break;
        }
        let Some(header) = cursor::read_header(reader)? else {
            break;
        };
        // size 0 runs to end of file; nothing follows it
        if header.size == 0 {
            break;
        }
        if header.size < header.header_len {
            return Err(Error::Malformed("box size"));
        }
        if header.is(b"meta") {
            return Ok(header);
        }
        if !cursor::skip_box(reader, &header)? {
            break;
        }
    }
    Err(Error::BoxNotFound("meta"))
}

fn read_payload<R: Read + Seek>(reader: &mut R, header: &BoxHeader) -> Result<Vec<u8>> {
    let len = header.payload_len();
    if len > MAX_READ {
        return Err(Error::Malformed("meta size"));
    }
    reader.seek(SeekFrom::Start(header.payload_offset()))?;
    let mut data = vec![0u8; len as usize];
    if !cursor::read_full(reader, &mut data)? {
        return Err(Error::Truncated {
            what: "meta",
            offset: header.offset,
        });
    }
    Ok(data)
}

/// Scan `iinf` for the `infe` entry whose item type is `Exif`.
fn exif_item_id(payload: &[u8], base: u64) -> Result<u32> {
    let mut c = Cursor::new(payload, base);
    let version = c.read_u8("iinf version")?;
    c.skip(3, "iinf flags")?;
    if version == 0 {
        c.read_u16("iinf entry count")?;
    } else {
        c.read_u32("iinf entry count")?;
    }

    let offset = c.position();
    for header in boxes(&payload[offset..], base + offset as u64) {
        let header = header?;
        if !header.is(b"infe") {
            continue;
        }
        let body = cursor::payload(payload, base, &header);
        let mut e = Cursor::new(body, header.payload_offset());
        let version = e.read_u8("infe version")?;
        e.skip(3, "infe flags")?;
        let item_id = match version {
            2 => u32::from(e.read_u16("infe item id")?),
            3 => e.read_u32("infe item id")?,
            _ => continue,
        };
        e.skip(2, "infe protection index")?;
        if &e.read_fourcc("infe item type")? == b"Exif" {
            return Ok(item_id);
        }
    }
    Err(Error::ItemNotFound("Exif"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstructionMethod {
    File,
    Idat,
}

#[derive(Debug)]
struct ItemLocation {
    method: ConstructionMethod,
    base_offset: u64,
    extents: Vec<(u64, u64)>,
}

/// Parse `iloc` and return the extents of `item_id`.
fn locate_item(payload: &[u8], base: u64, item_id: u32) -> Result<ItemLocation> {
    let mut c = Cursor::new(payload, base);
    let version = c.read_u8("iloc version")?;
    c.skip(3, "iloc flags")?;
    let sizes = c.read_u8("iloc sizes")?;
    let offset_size = sizes >> 4;
    let length_size = sizes & 0x0f;
    let sizes = c.read_u8("iloc sizes")?;
    let base_offset_size = sizes >> 4;
    let index_size = if version == 1 || version == 2 {
        sizes & 0x0f
    } else {
        0
    };

    let item_count = if version < 2 {
        u32::from(c.read_u16("iloc item count")?)
    } else {
        c.read_u32("iloc item count")?
    };

    for _ in 0..item_count {
        let id = if version < 2 {
            u32::from(c.read_u16("iloc item id")?)
        } else {
            c.read_u32("iloc item id")?
        };
        let method = if version == 1 || version == 2 {
            match c.read_u16("iloc construction method")? & 0x0f {
                0 => Some(ConstructionMethod::File),
                1 => Some(ConstructionMethod::Idat),
                _ => None,
            }
        } else {
            Some(ConstructionMethod::File)
        };
        c.skip(2, "iloc data reference index")?;
        let base_offset = c.read_uint(base_offset_size, "iloc base offset")?;
        let extent_count = c.read_u16("iloc extent count")?;

        let mut extents = Vec::with_capacity(usize::from(extent_count));
        for _ in 0..extent_count {
            if index_size > 0 {
                c.read_uint(index_size, "iloc extent index")?;
            }
            let offset = c.read_uint(offset_size, "iloc extent offset")?;
            let length = c.read_uint(length_size, "iloc extent length")?;
            extents.push((offset, length));
        }

        if id == item_id {
            let method = method.ok_or(Error::Malformed("iloc construction method"))?;
            return Ok(ItemLocation {
                method,
                base_offset,
                extents,
            });
        }
    }
    Err(Error::ItemNotFound("Exif"))
}

fn read_extents<R: Read + Seek>(reader: &mut R, location: &ItemLocation) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for &(offset, length) in &location.extents {
        let start = extent_start(location, offset)?;
        let length = if length == 0 {
            // zero length means "to end of file"
            reader.seek(SeekFrom::End(0))?.saturating_sub(start)
        } else {
            length
        };
        let total = (out.len() as u64).checked_add(length);
        if total.is_none_or(|total| total > MAX_READ) {
            return Err(Error::Malformed("Exif item size"));
        }
        reader.seek(SeekFrom::Start(start))?;
        let mut chunk = vec![0u8; length as usize];
        if !cursor::read_full(reader, &mut chunk)? {
            return Err(Error::Truncated {
                what: "Exif item",
                offset: start,
            });
        }
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

fn slice_extents(idat: &[u8], location: &ItemLocation) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for &(offset, length) in &location.extents {
        let start = extent_start(location, offset)?;
        let end = if length == 0 {
            idat.len() as u64
        } else {
            start
                .checked_add(length)
                .ok_or(Error::Malformed("iloc extent length"))?
        };
        if start > end || end > idat.len() as u64 {
            return Err(Error::Truncated {
                what: "idat extent",
                offset: start,
            });
        }
        out.extend_from_slice(&idat[start as usize..end as usize]);
    }
    Ok(out)
}

fn extent_start(location: &ItemLocation, offset: u64) -> Result<u64> {
    location
        .base_offset
        .checked_add(offset)
        .ok_or(Error::Malformed("iloc extent offset"))
}

/// Drop whatever precedes the TIFF header.
///
/// Prefer the `Exif\0\0` marker; keep data that already starts with a
/// byte-order mark; otherwise assume the 4-byte header-offset prefix.
fn strip_exif_header(mut item: Vec<u8>) -> Vec<u8> {
    if let Some(index) = item
        .windows(EXIF_MARKER.len())
        .position(|w| w == EXIF_MARKER)
    {
        return item.split_off(index + EXIF_MARKER.len());
    }
    if item.starts_with(b"II") || item.starts_with(b"MM") {
        return item;
    }
    if item.len() > 4 {
        return item.split_off(4);
    }
    item
}
