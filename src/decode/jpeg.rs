//! JPEG tile decoding.
//!
//! # Abbreviated JPEG Streams
//!
//! TIFF writers usually store the quantization (DQT) and Huffman (DHT)
//! tables once in the `JPEGTables` tag and leave them out of every tile.
//! Such tiles must be merged with the tables before a standard decoder can
//! read them:
//!
//! 1. JPEGTables starts with SOI (FFD8) and ends with EOI (FFD9)
//! 2. Tile data also starts with SOI and ends with EOI
//! 3. To merge: strip EOI from tables, strip SOI from tile, concatenate
//!
//! Result: SOI + tables_content + tile_content + EOI

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use image::{DynamicImage, ImageFormat, ImageReader};

use super::{Decoder, PixelGrid, TileMetadata};
use crate::error::DecodeError;
use crate::format::tiff::PixelDtype;

// =============================================================================
// JPEG Markers
// =============================================================================

/// Start Of Image marker
const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Define Huffman Table marker
const DHT: [u8; 2] = [0xFF, 0xC4];

/// Define Quantization Table marker
const DQT: [u8; 2] = [0xFF, 0xDB];

/// Start Of Scan marker
const SOS: [u8; 2] = [0xFF, 0xDA];

// =============================================================================
// Stream Handling
// =============================================================================

/// Check if JPEG data is an abbreviated stream (missing tables).
///
/// An abbreviated stream reaches SOS without passing any DQT or DHT segment.
pub fn is_abbreviated_stream(data: &[u8]) -> bool {
    if data.len() < 4 || data[0..2] != SOI {
        return false;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = [data[pos], data[pos + 1]];
        if marker == DQT || marker == DHT {
            return false;
        }
        if marker == SOS {
            return true;
        }

        // Skip marker segment (marker + 2-byte length + data)
        if pos + 3 < data.len() && marker[1] != 0x00 && marker[1] != 0xD8 && marker[1] != 0xD9 {
            let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            pos += 2 + length;
        } else {
            pos += 2;
        }
    }

    false
}

/// Merge JPEGTables with abbreviated tile data into a complete stream.
pub fn merge_jpeg_tables(tables: &[u8], tile_data: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(tile_data);
    }
    if tile_data.is_empty() {
        return Bytes::new();
    }

    let tables_end = if tables.len() >= 2 && tables[tables.len() - 2..] == EOI {
        tables.len() - 2
    } else {
        tables.len()
    };
    let tile_start = if tile_data.len() >= 2 && tile_data[0..2] == SOI {
        2
    } else {
        0
    };

    let mut result = BytesMut::with_capacity(tables_end + tile_data.len() - tile_start);
    result.extend_from_slice(&tables[..tables_end]);
    result.extend_from_slice(&tile_data[tile_start..]);
    result.freeze()
}

// =============================================================================
// Decoder
// =============================================================================

/// Decoder for JPEG tiles (Compression = 7), 8-bit samples only.
///
/// Three-band tiles come out as RGB, single-band tiles as luma.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegDecoder;

impl Decoder for JpegDecoder {
    fn decode(&self, meta: &TileMetadata, data: &[u8]) -> Result<PixelGrid, DecodeError> {
        let stream = match &meta.jpeg_tables {
            Some(tables) if is_abbreviated_stream(data) => merge_jpeg_tables(tables, data),
            _ => Bytes::copy_from_slice(data),
        };

        let image = ImageReader::with_format(Cursor::new(stream.as_ref()), ImageFormat::Jpeg)
            .decode()
            .map_err(|e| DecodeError::Jpeg(e.to_string()))?;

        let (width, height) = (image.width(), image.height());
        let (bands, pixels) = match image {
            DynamicImage::ImageLuma8(gray) => (1, gray.into_raw()),
            DynamicImage::ImageRgb8(rgb) => (3, rgb.into_raw()),
            DynamicImage::ImageRgba8(rgba) => (4, rgba.into_raw()),
            other if meta.samples_per_pixel == 1 => (1, other.to_luma8().into_raw()),
            other => (3, other.to_rgb8().into_raw()),
        };

        PixelGrid::new(width, height, bands, PixelDtype::UINT8, Bytes::from(pixels))
    }
}

// =============================================================================
// Tests
// =============================================================================
