//! TIFF header and directory record parsing.
//!
//! The header is read in two steps so that the reader never requests more
//! than the file declares it needs:
//!
//! ## File header (4 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (42 = classic TIFF, 43 = BigTIFF)
//! ```
//!
//! ## Second header, classic TIFF (4 bytes at offset 4)
//! ```text
//! Bytes 4-7: Offset to first IFD (u32)
//! ```
//!
//! ## Second header, BigTIFF (12 bytes at offset 4)
//! ```text
//! Bytes 4-5: Offset byte size (must be 8)
//! Bytes 6-7: Reserved (must be 0)
//! Bytes 8-15: Offset to first IFD (u64)
//! ```
//!
//! Directory records are 12 bytes (classic) or 20 bytes (BigTIFF):
//! code (u16), type (u16), count (u32/u64), value-or-offset (u32/u64).

use bytes::Bytes;
use tracing::warn;

use super::tag::{RawTag, Tag, TagLocation};
use super::tags::FieldType;
use crate::error::TiffError;
use crate::io::{read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le};

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: [u8; 2] = *b"II";

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: [u8; 2] = *b"MM";

/// Version number for classic TIFF
const VERSION_TIFF: u16 = 42;

/// Version number for BigTIFF
const VERSION_BIGTIFF: u16 = 43;

/// Size of the byte order + version prefix
pub const FILE_HEADER_SIZE: usize = 4;

/// Size of the classic TIFF second header
pub const TIFF_SECOND_HEADER_SIZE: usize = 4;

/// Size of the BigTIFF second header
pub const BIGTIFF_SECOND_HEADER_SIZE: usize = 12;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
///
/// TIFF files declare their byte order in the first two bytes of the header.
/// All multi-byte values in the file must be read respecting this order.
///
/// The `read_*` methods panic on short slices; callers check lengths first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    /// Read a u64 from a byte slice using this byte order.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => read_u64_le(bytes),
            ByteOrder::BigEndian => read_u64_be(bytes),
        }
    }

    #[inline]
    pub fn read_i16(self, bytes: &[u8]) -> i16 {
        self.read_u16(bytes) as i16
    }

    #[inline]
    pub fn read_i32(self, bytes: &[u8]) -> i32 {
        self.read_u32(bytes) as i32
    }

    #[inline]
    pub fn read_f32(self, bytes: &[u8]) -> f32 {
        f32::from_bits(self.read_u32(bytes))
    }

    #[inline]
    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        f64::from_bits(self.read_u64(bytes))
    }

    /// Human-readable name, as printed by the CLI.
    pub const fn name(self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "little-endian",
            ByteOrder::BigEndian => "big-endian",
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
///
/// Fixes the decoding context for the whole file:
/// - Byte order for reading all subsequent values
/// - Whether this is classic TIFF or BigTIFF (pointer and count widths)
/// - Location of the first IFD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Whether this is a BigTIFF file (64-bit offsets)
    pub is_bigtiff: bool,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse the 4-byte file header into byte order and BigTIFF flag.
    ///
    /// # Errors
    /// - `InvalidMagic` if byte order bytes are not II or MM
    /// - `InvalidVersion` if version is not 42 or 43
    pub fn parse_file_header(bytes: &[u8]) -> Result<(ByteOrder, bool), TiffError> {
        ensure_len(bytes, FILE_HEADER_SIZE)?;

        let byte_order = match [bytes[0], bytes[1]] {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(u16::from_be_bytes([bytes[0], bytes[1]]))),
        };

        match byte_order.read_u16(&bytes[2..4]) {
            VERSION_TIFF => Ok((byte_order, false)),
            VERSION_BIGTIFF => Ok((byte_order, true)),
            version => Err(TiffError::InvalidVersion(version)),
        }
    }

    /// Number of bytes of second header that follow the file header.
    #[inline]
    pub const fn second_header_size(is_bigtiff: bool) -> usize {
        if is_bigtiff {
            BIGTIFF_SECOND_HEADER_SIZE
        } else {
            TIFF_SECOND_HEADER_SIZE
        }
    }

    /// Parse the second header (the bytes starting at offset 4).
    ///
    /// # Errors
    /// - `InvalidBigTiffOffsetSize` if the BigTIFF offset size is not 8
    /// - `InvalidBigTiffReserved` if the BigTIFF reserved field is not 0
    pub fn parse_second_header(
        byte_order: ByteOrder,
        is_bigtiff: bool,
        bytes: &[u8],
    ) -> Result<Self, TiffError> {
        ensure_len(bytes, Self::second_header_size(is_bigtiff))?;

        let first_ifd_offset = if is_bigtiff {
            let offset_size = byte_order.read_u16(&bytes[0..2]);
            if offset_size != 8 {
                return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
            }

            let reserved = byte_order.read_u16(&bytes[2..4]);
            if reserved != 0 {
                return Err(TiffError::InvalidBigTiffReserved(reserved));
            }

            byte_order.read_u64(&bytes[4..12])
        } else {
            byte_order.read_u32(&bytes[0..4]) as u64
        };

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Parse a complete header held in one buffer (8 or 16 bytes).
    pub fn parse(bytes: &[u8]) -> Result<Self, TiffError> {
        let (byte_order, is_bigtiff) = Self::parse_file_header(bytes)?;
        Self::parse_second_header(byte_order, is_bigtiff, &bytes[FILE_HEADER_SIZE..])
    }

    /// Width of file offsets and of the value/offset field in a record.
    ///
    /// This is also the inline value threshold.
    #[inline]
    pub const fn pointer_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Width of the entry count field at the start of an IFD.
    #[inline]
    pub const fn directory_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Size of one directory record.
    ///
    /// Classic TIFF: 12 bytes (2 tag + 2 type + 4 count + 4 value/offset)
    /// BigTIFF: 20 bytes (2 tag + 2 type + 8 count + 8 value/offset)
    #[inline]
    pub const fn tag_record_size(&self) -> usize {
        4 + 2 * self.pointer_size()
    }

    /// Read a pointer-sized unsigned value.
    #[inline]
    pub fn read_pointer(&self, bytes: &[u8]) -> u64 {
        if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            self.byte_order.read_u32(bytes) as u64
        }
    }

    /// Read the directory entry count.
    pub fn read_directory_count(&self, bytes: &[u8]) -> Result<u64, TiffError> {
        ensure_len(bytes, self.directory_count_size())?;
        Ok(if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            self.byte_order.read_u16(bytes) as u64
        })
    }
}

// =============================================================================
// Directory Records
// =============================================================================

/// Parse one fixed-size directory record.
///
/// # Errors
/// - `UnknownFieldType` if the type id is not a recognized TIFF type
/// - `TagDataTooLarge` if `count * element_size` overflows
pub fn parse_tag_record(record: &[u8], header: &TiffHeader) -> Result<RawTag, TiffError> {
    ensure_len(record, header.tag_record_size())?;

    let order = header.byte_order;
    let pointer_size = header.pointer_size();

    let code = order.read_u16(&record[0..2]);
    let field_type_raw = order.read_u16(&record[2..4]);
    let count = header.read_pointer(&record[4..4 + pointer_size]);
    let field = &record[4 + pointer_size..4 + 2 * pointer_size];

    let field_type = FieldType::from_u16(field_type_raw).ok_or(TiffError::UnknownFieldType {
        tag: code,
        field_type: field_type_raw,
    })?;

    let size = field_type
        .data_size(count)
        .ok_or(TiffError::TagDataTooLarge { tag: code, count })?;

    let location = if size <= pointer_size as u64 {
        TagLocation::Inline(Bytes::copy_from_slice(&field[..size as usize]))
    } else {
        TagLocation::Offset(header.read_pointer(field))
    };

    Ok(RawTag {
        code,
        field_type,
        count,
        location,
    })
}

/// Parse a directory table of `count` records.
///
/// Records with an unusable type or size are skipped with a warning.
/// Inline values are decoded right away.
pub fn parse_tag_table(bytes: &[u8], count: u64, header: &TiffHeader) -> Result<Vec<Tag>, TiffError> {
    let record_size = header.tag_record_size();
    let needed = (count as usize)
        .checked_mul(record_size)
        .ok_or(TiffError::TruncatedValue {
            expected: usize::MAX,
            actual: bytes.len(),
        })?;
    ensure_len(bytes, needed)?;

    let mut tags = Vec::with_capacity(count as usize);
    for record in bytes[..needed].chunks_exact(record_size) {
        let raw = match parse_tag_record(record, header) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Skipping directory entry");
                continue;
            }
        };

        match Tag::from_raw(raw, header.byte_order) {
            Ok(tag) => tags.push(tag),
            Err(e) => warn!(error = %e, "Skipping directory entry"),
        }
    }

    Ok(tags)
}

fn ensure_len(bytes: &[u8], expected: usize) -> Result<(), TiffError> {
    if bytes.len() < expected {
        return Err(TiffError::TruncatedValue {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
