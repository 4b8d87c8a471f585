//! Test utilities for integration tests.
//!
//! This module provides a request-tracking mock reader and a builder for
//! synthetic TIFF/BigTIFF files in either byte order.

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, Luma};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use async_cog::error::IoError;
use async_cog::io::RangeReader;

// =============================================================================
// Mock Range Reader with Request Tracking
// =============================================================================

/// A mock range reader that tracks all read requests.
pub struct TrackingMockReader {
    data: Bytes,
    identifier: String,
    request_count: Arc<AtomicUsize>,
    requests: Arc<RwLock<Vec<(u64, usize)>>>,
}

impl TrackingMockReader {
    pub fn new(data: Vec<u8>, identifier: impl Into<String>) -> Self {
        Self {
            data: Bytes::from(data),
            identifier: identifier.into(),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub async fn get_requests(&self) -> Vec<(u64, usize)> {
        self.requests.read().await.clone()
    }

    pub fn reset_tracking(&self) {
        self.request_count.store(0, Ordering::SeqCst);
    }
}

impl Clone for TrackingMockReader {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            identifier: self.identifier.clone(),
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
        }
    }
}

#[async_trait]
impl RangeReader for TrackingMockReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.write().await.push((offset, len));

        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Test Tile Creation
// =============================================================================

/// Create a grayscale JPEG with a simple gradient pattern.
pub fn create_test_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |x, y| {
        let val = ((x + y) % 256) as u8;
        Luma([val])
    });

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(&img).unwrap();
    buf
}

/// Uncompressed 8-bit tile filled with `value`.
pub fn create_raw_tile(width: u32, height: u32, bands: u32, value: u8) -> Vec<u8> {
    vec![value; (width * height * bands) as usize]
}

// =============================================================================
// TIFF File Builders
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

/// Builder for synthetic TIFF files.
///
/// Layout: header, then per IFD the tag table, its tile data and its
/// out-of-line values, chained in insertion order.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    is_bigtiff: bool,
    ifds: Vec<IfdBuilder>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
            ifds: Vec::new(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    pub fn add_ifd(mut self, ifd: IfdBuilder) -> Self {
        self.ifds.push(ifd);
        self
    }

    /// Build the file data.
    pub fn build(self) -> Vec<u8> {
        self.build_with_offsets().0
    }

    /// Build the file data and report where each IFD starts.
    pub fn build_with_offsets(self) -> (Vec<u8>, Vec<u64>) {
        let w = Writer {
            order: self.byte_order,
            big: self.is_bigtiff,
        };
        let mut data = Vec::new();

        match self.byte_order {
            ByteOrderType::LittleEndian => data.extend_from_slice(b"II"),
            ByteOrderType::BigEndian => data.extend_from_slice(b"MM"),
        }
        if self.is_bigtiff {
            w.put(&mut data, 43, 2);
            w.put(&mut data, 8, 2);
            w.put(&mut data, 0, 2);
        } else {
            w.put(&mut data, 42, 2);
        }
        let first_pointer_pos = data.len();
        w.put(&mut data, 0, w.pointer_size());

        let mut offsets = Vec::new();
        let mut pointer_pos = first_pointer_pos;
        for ifd in &self.ifds {
            let ifd_offset = data.len() as u64;
            w.patch(&mut data, pointer_pos, ifd_offset, w.pointer_size());
            offsets.push(ifd_offset);
            pointer_pos = ifd.write_to(&mut data, w);
        }

        (data, offsets)
    }
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
struct Writer {
    order: ByteOrderType,
    big: bool,
}

impl Writer {
    fn pointer_size(&self) -> usize {
        if self.big {
            8
        } else {
            4
        }
    }

    fn count_size(&self) -> usize {
        if self.big {
            8
        } else {
            2
        }
    }

    fn encode(&self, value: u64, size: usize) -> Vec<u8> {
        match self.order {
            ByteOrderType::LittleEndian => value.to_le_bytes()[..size].to_vec(),
            ByteOrderType::BigEndian => value.to_be_bytes()[8 - size..].to_vec(),
        }
    }

    fn put(&self, data: &mut Vec<u8>, value: u64, size: usize) {
        data.extend(self.encode(value, size));
    }

    fn patch(&self, data: &mut [u8], pos: usize, value: u64, size: usize) {
        data[pos..pos + size].copy_from_slice(&self.encode(value, size));
    }
}

/// Tag values the builder knows how to encode.
#[derive(Clone, Debug)]
pub enum Value {
    Bytes(Vec<u8>),
    Ascii(String),
    Shorts(Vec<u16>),
    Longs(Vec<u32>),
    Rationals(Vec<(u32, u32)>),
    Doubles(Vec<f64>),
    /// Arbitrary field type with pre-encoded payload
    Raw {
        field_type: u16,
        count: u64,
        payload: Vec<u8>,
    },
    TileOffsets,
    TileByteCounts,
}

/// Builder for a single IFD.
#[derive(Clone, Default)]
pub struct IfdBuilder {
    entries: Vec<(u16, Value)>,
    tiles: Vec<Option<Vec<u8>>>,
}

impl IfdBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tiled image geometry with 8-bit samples and the given compression.
    pub fn tiled(
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        compression: u16,
    ) -> Self {
        Self::new()
            .long(256, &[width])
            .long(257, &[height])
            .short(258, &[8])
            .short(259, &[compression])
            .short(277, &[1])
            .short(322, &[tile_width as u16])
            .short(323, &[tile_height as u16])
    }

    pub fn entry(mut self, tag: u16, value: Value) -> Self {
        self.entries.retain(|(t, _)| *t != tag);
        self.entries.push((tag, value));
        self
    }

    pub fn short(self, tag: u16, values: &[u16]) -> Self {
        self.entry(tag, Value::Shorts(values.to_vec()))
    }

    pub fn long(self, tag: u16, values: &[u32]) -> Self {
        self.entry(tag, Value::Longs(values.to_vec()))
    }

    pub fn double(self, tag: u16, values: &[f64]) -> Self {
        self.entry(tag, Value::Doubles(values.to_vec()))
    }

    pub fn ascii(self, tag: u16, text: &str) -> Self {
        self.entry(tag, Value::Ascii(text.to_string()))
    }

    pub fn rational(self, tag: u16, values: &[(u32, u32)]) -> Self {
        self.entry(tag, Value::Rationals(values.to_vec()))
    }

    pub fn bytes(self, tag: u16, data: &[u8]) -> Self {
        self.entry(tag, Value::Bytes(data.to_vec()))
    }

    /// Append tiles in row-major order and emit TileOffsets/TileByteCounts.
    ///
    /// `None` writes a sparse tile (offset 0, byte count 0).
    pub fn tiles(mut self, tiles: Vec<Option<Vec<u8>>>) -> Self {
        self.tiles = tiles;
        self.entry(324, Value::TileOffsets)
            .entry(325, Value::TileByteCounts)
    }

    /// Write this IFD at the end of `data`; returns the position of its
    /// next-IFD pointer.
    fn write_to(&self, data: &mut Vec<u8>, w: Writer) -> usize {
        let ifd_offset = data.len();
        let record_size = 4 + 2 * w.pointer_size();
        let table_len = w.count_size() + self.entries.len() * record_size + w.pointer_size();

        // Tile data goes right after the table
        let mut cursor = ifd_offset + table_len;
        let mut tile_offsets = Vec::new();
        let mut tile_counts = Vec::new();
        for tile in &self.tiles {
            match tile {
                Some(bytes) => {
                    tile_offsets.push(cursor as u64);
                    tile_counts.push(bytes.len() as u64);
                    cursor += bytes.len();
                }
                None => {
                    tile_offsets.push(0);
                    tile_counts.push(0);
                }
            }
        }

        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by_key(|(tag, _)| *tag);

        let mut table = Vec::new();
        let mut overflow = Vec::new();
        w.put(&mut table, entries.len() as u64, w.count_size());
        for (tag, value) in entries {
            let (field_type, count, payload) = encode_value(value, w, &tile_offsets, &tile_counts);
            w.put(&mut table, *tag as u64, 2);
            w.put(&mut table, field_type as u64, 2);
            w.put(&mut table, count, w.pointer_size());
            if payload.len() <= w.pointer_size() {
                let mut inline = payload;
                inline.resize(w.pointer_size(), 0);
                table.extend(inline);
            } else {
                if (cursor + overflow.len()) % 2 == 1 {
                    overflow.push(0);
                }
                w.put(&mut table, (cursor + overflow.len()) as u64, w.pointer_size());
                overflow.extend(payload);
            }
        }
        let next_pointer_pos = ifd_offset + table.len();
        w.put(&mut table, 0, w.pointer_size());

        data.extend(table);
        for tile in self.tiles.iter().flatten() {
            data.extend_from_slice(tile);
        }
        data.extend(overflow);
        if data.len() % 2 == 1 {
            data.push(0);
        }

        next_pointer_pos
    }
}

fn encode_value(
    value: &Value,
    w: Writer,
    tile_offsets: &[u64],
    tile_counts: &[u64],
) -> (u16, u64, Vec<u8>) {
    let pointers = |values: &[u64]| {
        let (field_type, size) = if w.big { (16, 8) } else { (4, 4) };
        let payload = values.iter().flat_map(|v| w.encode(*v, size)).collect();
        (field_type, values.len() as u64, payload)
    };

    match value {
        Value::Bytes(bytes) => (7, bytes.len() as u64, bytes.clone()),
        Value::Ascii(text) => {
            let mut payload = text.as_bytes().to_vec();
            payload.push(0);
            (2, payload.len() as u64, payload)
        }
        Value::Shorts(values) => (
            3,
            values.len() as u64,
            values.iter().flat_map(|v| w.encode(*v as u64, 2)).collect(),
        ),
        Value::Longs(values) => (
            4,
            values.len() as u64,
            values.iter().flat_map(|v| w.encode(*v as u64, 4)).collect(),
        ),
        Value::Rationals(values) => (
            5,
            values.len() as u64,
            values
                .iter()
                .flat_map(|(n, d)| {
                    let mut pair = w.encode(*n as u64, 4);
                    pair.extend(w.encode(*d as u64, 4));
                    pair
                })
                .collect(),
        ),
        Value::Doubles(values) => (
            12,
            values.len() as u64,
            values
                .iter()
                .flat_map(|v| w.encode(v.to_bits(), 8))
                .collect(),
        ),
        Value::Raw {
            field_type,
            count,
            payload,
        } => (*field_type, *count, payload.clone()),
        Value::TileOffsets => pointers(tile_offsets),
        Value::TileByteCounts => pointers(tile_counts),
    }
}

// =============================================================================
// Canned Files
// =============================================================================

/// GeoKeyDirectoryTag for a Web Mercator COG with an ASCII citation.
pub const WEB_MERCATOR_GEOKEYS: [u16; 32] = [
    1, 1, 0, 7, //
    1024, 0, 1, 1, // GTModelType = Projected
    1025, 0, 1, 1, // GTRasterType = PixelIsArea
    1026, 34737, 25, 0, // GTCitation
    2049, 34737, 7, 25, // GeogCitation
    2054, 0, 1, 9102, // GeogAngularUnits
    3072, 0, 1, 3857, // ProjectedCSType
    3076, 0, 1, 9001, // ProjLinearUnits
];

pub const WEB_MERCATOR_ASCII: &str = "WGS 84 / Pseudo-Mercator|WGS 84|";

/// Five-level pyramid: 512/256/128/64/32 px, 256 px tiles, raw 8-bit.
pub fn create_pyramid(byte_order: ByteOrderType, bigtiff: bool) -> (Vec<u8>, Vec<u64>) {
    let mut builder = TiffBuilder::new()
        .with_byte_order(byte_order)
        .with_bigtiff(bigtiff);

    for level in 0..5u32 {
        let size: u32 = 512 >> level;
        let tiles_per_side = size.div_ceil(256);
        let tiles = (0..tiles_per_side * tiles_per_side)
            .map(|i| Some(create_raw_tile(256, 256, 1, (level * 16 + i) as u8)))
            .collect();

        let mut ifd = IfdBuilder::tiled(size, size, 256, 256, 1).tiles(tiles);
        if level == 0 {
            ifd = ifd
                .double(33550, &[10.0, 10.0, 0.0])
                .double(33922, &[0.0, 0.0, 0.0, 500000.0, 4000000.0, 0.0])
                .short(34735, &WEB_MERCATOR_GEOKEYS)
                .ascii(34737, WEB_MERCATOR_ASCII);
        }
        builder = builder.add_ifd(ifd);
    }

    builder.build_with_offsets()
}

/// Check whether data starts with a TIFF magic number.
pub fn is_tiff_magic(data: &[u8]) -> bool {
    data.len() >= 4
        && ((data[0..2] == *b"II" && data[2] == 42) || (data[0..2] == *b"MM" && data[3] == 42))
}

/// Split a complete JPEG into (JPEGTables, abbreviated tile).
///
/// DQT and DHT segments move into the tables stream, which is wrapped in
/// SOI/EOI the way TIFF writers store it.
pub fn split_jpeg_tables(full: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut tables = vec![0xFF, 0xD8];
    let mut tile = vec![0xFF, 0xD8];
    let mut pos = 2;
    loop {
        let marker = full[pos + 1];
        if marker == 0xDA {
            tile.extend_from_slice(&full[pos..]);
            break;
        }
        let len = u16::from_be_bytes([full[pos + 2], full[pos + 3]]) as usize;
        let segment = &full[pos..pos + 2 + len];
        if marker == 0xDB || marker == 0xC4 {
            tables.extend_from_slice(segment);
        } else {
            tile.extend_from_slice(segment);
        }
        pos += 2 + len;
    }
    tables.extend_from_slice(&[0xFF, 0xD9]);
    (tables, tile)
}
