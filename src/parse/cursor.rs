//! Bounds-checked big-endian reads and the ISOBMFF box walk.
//!
//! [`Cursor`] never panics on short input: every read returns
//! [`Error::Truncated`] with the absolute offset of the failed read.
//! [`boxes`] turns a byte slice into a sequence of [`BoxHeader`]s without
//! interpreting any payload; the HEIC and QuickTime extractors consume it.

use crate::error::{Error, Result};
use std::io::{self, Read, Seek, SeekFrom};

/// A read position over an in-memory slice.
///
/// `base` is the absolute file offset of `data[0]`, used only for error reporting.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: u64,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8], base: u64) -> Self {
        Self { data, pos: 0, base }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated {
                what,
                offset: self.base + self.pos as u64,
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn skip(&mut self, n: usize, what: &'static str) -> Result<()> {
        self.take(n, what).map(|_| ())
    }

    pub fn read_u8(&mut self, what: &'static str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub fn read_u16(&mut self, what: &'static str) -> Result<u16> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self, what: &'static str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self, what: &'static str) -> Result<u64> {
        let b = self.take(8, what)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    /// Read an unsigned field of 0, 4, or 8 bytes (the `iloc` width encoding).
    pub fn read_uint(&mut self, width: u8, what: &'static str) -> Result<u64> {
        match width {
            0 => Ok(0),
            4 => self.read_u32(what).map(u64::from),
            8 => self.read_u64(what),
            _ => Err(Error::Malformed(what)),
        }
    }

    pub fn read_fourcc(&mut self, what: &'static str) -> Result<[u8; 4]> {
        let b = self.take(4, what)?;
        Ok([b[0], b[1], b[2], b[3]])
    }
}

/// Type, position, and size of one box or atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoxHeader {
    pub kind: [u8; 4],
    /// Absolute offset of the size field
    pub offset: u64,
    /// 8, or 16 when the 64-bit extended size is used
    pub header_len: u64,
    /// Total size including the header
    pub size: u64,
}

impl BoxHeader {
    pub fn is(&self, kind: &[u8; 4]) -> bool {
        &self.kind == kind
    }

    pub fn payload_offset(&self) -> u64 {
        self.offset + self.header_len
    }

    pub fn payload_len(&self) -> u64 {
        self.size - self.header_len
    }

    /// Absolute offset just past this box.
    ///
    /// `None` when the size is smaller than the header or the end does not
    /// fit in a seekable offset.
    pub fn end_offset(&self) -> Option<u64> {
        if self.size < self.header_len {
            return None;
        }
        self.offset
            .checked_add(self.size)
            .filter(|end| i64::try_from(*end).is_ok())
    }

    pub fn kind_str(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }
}

/// Iterator over the sibling boxes of `data`, whose first byte sits at
/// absolute offset `base`.
///
/// Size 0 extends the box to the end of `data`; size 1 reads a 64-bit size
/// after the type. A box running past the end of `data` yields
/// [`Error::Truncated`] and ends the iteration.
pub(crate) fn boxes(data: &[u8], base: u64) -> Boxes<'_> {
    Boxes {
        data,
        pos: 0,
        base,
        done: false,
    }
}

pub(crate) struct Boxes<'a> {
    data: &'a [u8],
    pos: usize,
    base: u64,
    done: bool,
}

impl Boxes<'_> {
    fn next_header(&mut self) -> Result<BoxHeader> {
        let mut cursor = Cursor::new(&self.data[self.pos..], self.base + self.pos as u64);
        let offset = self.base + self.pos as u64;
        let size = cursor.read_u32("box size")?;
        let kind = cursor.read_fourcc("box type")?;
        let (header_len, size) = match size {
            0 => (8, (self.data.len() - self.pos) as u64),
            1 => (16, cursor.read_u64("extended box size")?),
            n => (8, u64::from(n)),
        };
        if size < header_len {
            return Err(Error::Malformed("box size"));
        }
        if size > (self.data.len() - self.pos) as u64 {
            return Err(Error::Truncated {
                what: "box payload",
                offset,
            });
        }
        Ok(BoxHeader {
            kind,
            offset,
            header_len,
            size,
        })
    }
}

impl Iterator for Boxes<'_> {
    type Item = Result<BoxHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.data.len() {
            return None;
        }
        match self.next_header() {
            Ok(header) => {
                self.pos += header.size as usize;
                Some(Ok(header))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Payload bytes of a header produced by [`boxes`] over `data` at `base`.
pub(crate) fn payload<'a>(data: &'a [u8], base: u64, header: &BoxHeader) -> &'a [u8] {
    let start = (header.payload_offset() - base) as usize;
    let end = (header.offset + header.size - base) as usize;
    &data[start..end]
}

/// Read a box header from a stream positioned at the start of a box.
///
/// Returns `Ok(None)` at end of stream. The reported `size` is the raw field
/// value (0 and 2..8 are left to the caller to interpret).
pub(crate) fn read_header<R: Read + Seek>(reader: &mut R) -> io::Result<Option<BoxHeader>> {
    let offset = reader.stream_position()?;
    let mut head = [0u8; 8];
    if !read_full(reader, &mut head)? {
        return Ok(None);
    }
    let size = u32::from_be_bytes([head[0], head[1], head[2], head[3]]);
    let kind = [head[4], head[5], head[6], head[7]];
    if size == 1 {
        let mut ext = [0u8; 8];
        if !read_full(reader, &mut ext)? {
            return Ok(None);
        }
        return Ok(Some(BoxHeader {
            kind,
            offset,
            header_len: 16,
            size: u64::from_be_bytes(ext),
        }));
    }
    Ok(Some(BoxHeader {
        kind,
        offset,
        header_len: 8,
        size: u64::from(size),
    }))
}

/// Fill `buf`, returning `false` if the stream ends first.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Seek to just past the box described by `header`.
///
/// Returns `false`, leaving the stream where it is, when the box has no
/// valid end (see [`BoxHeader::end_offset`]). The walk cannot advance then.
pub(crate) fn skip_box<R: Seek>(reader: &mut R, header: &BoxHeader) -> io::Result<bool> {
    let Some(end) = header.end_offset() else {
        return Ok(false);
    };
    reader.seek(SeekFrom::Start(end))?;
    Ok(true)
}
