//! TIFF and BigTIFF container parsing.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets and 16-bit entry counts,
//!   BigTIFF uses 64-bit for both. The header fixes which one applies for the whole file.
//!
//! - **IFD (Image File Directory)**: A table of typed tags describing one image plus a
//!   pointer to the next directory. A COG stores one IFD per resolution level.
//!
//! - **Inline vs offset values**: Values no larger than the pointer width are packed into
//!   the directory record; larger ones live elsewhere and are fetched on demand.
//!
//! - **GeoKeys**: GeoTIFF packs coordinate reference metadata into the GeoKeyDirectoryTag,
//!   with strings and doubles stored in companion parameter tags.

mod geokeys;
mod ifd;
mod parser;
mod tag;
mod tags;
mod values;

pub use geokeys::{geokey_name, GeoKey, GeoKeyDirectory, GeoKeyEntry};
pub use ifd::{Ifd, PixelDtype, SampleKind};
pub use parser::{
    parse_tag_record, parse_tag_table, ByteOrder, TiffHeader, BIGTIFF_SECOND_HEADER_SIZE,
    FILE_HEADER_SIZE, TIFF_SECOND_HEADER_SIZE,
};
pub use tag::{RawTag, Tag, TagLocation};
pub use tags::{tag_arity, tag_code, tag_name, Compression, FieldType, TagArity, TiffTag, GEOKEY_TAGS};
pub use values::{decode_value, Fraction, Number, TagValue};
