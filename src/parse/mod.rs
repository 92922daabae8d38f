//! Container metadata extraction without a demuxer.
//!
//! - [`heic`]: pull the Exif item out of a HEIC/HEIF `meta` box
//! - [`quicktime`]: read the `mvhd` creation time, validate MPEG-PS headers

pub(crate) mod cursor;
pub mod heic;
pub mod quicktime;
