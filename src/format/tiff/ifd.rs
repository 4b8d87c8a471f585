//! Image File Directories.
//!
//! An [`Ifd`] holds the tags of one directory in file order plus the GeoKeys
//! decoded from its GeoKeyDirectoryTag. Lookups are by catalog name; the
//! tile geometry helpers read the well-known tags directly by code.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use super::geokeys::{GeoKey, GeoKeyDirectory};
use super::parser::{parse_tag_table, TiffHeader};
use super::tag::Tag;
use super::tags::{tag_code, TiffTag, GEOKEY_TAGS};
use super::values::TagValue;
use crate::error::{GeoKeyError, TiffError};

// =============================================================================
// Pixel Data Type
// =============================================================================

/// Interpretation of each sample, from the SampleFormat tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Unsigned,
    Signed,
    Float,
}

/// Data type of one sample: kind plus bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelDtype {
    pub kind: SampleKind,
    pub bits: u16,
}

impl PixelDtype {
    pub const UINT8: PixelDtype = PixelDtype {
        kind: SampleKind::Unsigned,
        bits: 8,
    };

    /// Bytes per sample, rounding sub-byte widths up.
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits as usize).div_ceil(8)
    }
}

impl fmt::Display for PixelDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            SampleKind::Unsigned => "uint",
            SampleKind::Signed => "int",
            SampleKind::Float => "float",
        };
        write!(f, "{}{}", kind, self.bits)
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// One Image File Directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Ifd {
    offset: u64,
    tag_count: u64,
    next_ifd_offset: u64,
    tags: Vec<Tag>,
    geo_keys: Vec<GeoKey>,
}

impl Ifd {
    /// Build a directory from parsed tags.
    ///
    /// A later tag with the same code replaces an earlier one.
    pub fn new(offset: u64, tag_count: u64, next_ifd_offset: u64, tags: Vec<Tag>) -> Self {
        let mut ifd = Self {
            offset,
            tag_count,
            next_ifd_offset,
            tags: Vec::with_capacity(tags.len()),
            geo_keys: Vec::new(),
        };
        for tag in tags {
            ifd.put(tag);
        }
        ifd
    }

    /// Parse a directory from its tag table followed by the next-IFD pointer.
    ///
    /// `bytes` must start at the first record, right after the entry count.
    pub fn parse(
        offset: u64,
        tag_count: u64,
        bytes: &[u8],
        header: &TiffHeader,
    ) -> Result<Self, TiffError> {
        let table_len = (tag_count as usize)
            .checked_mul(header.tag_record_size())
            .ok_or(TiffError::TagDataTooLarge {
                tag: 0,
                count: tag_count,
            })?;
        let expected = table_len + header.pointer_size();
        if bytes.len() < expected {
            return Err(TiffError::TruncatedValue {
                expected,
                actual: bytes.len(),
            });
        }

        let tags = parse_tag_table(&bytes[..table_len], tag_count, header)?;
        let next_ifd_offset = header.read_pointer(&bytes[table_len..expected]);

        debug!(
            offset,
            tag_count,
            parsed = tags.len(),
            next_ifd_offset,
            "Parsed IFD"
        );

        Ok(Self::new(offset, tag_count, next_ifd_offset, tags))
    }

    fn put(&mut self, tag: Tag) {
        match self.tags.iter_mut().find(|t| t.code() == tag.code()) {
            Some(existing) => *existing = tag,
            None => self.tags.push(tag),
        }
    }

    /// File offset of this directory.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Entry count as declared by the file (including skipped entries).
    #[inline]
    pub fn tag_count(&self) -> u64 {
        self.tag_count
    }

    /// Offset of the next directory, 0 for the last one.
    #[inline]
    pub fn next_ifd_offset(&self) -> u64 {
        self.next_ifd_offset
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.next_ifd_offset == 0
    }

    /// Tags in file order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut [Tag] {
        &mut self.tags
    }

    /// Resolved GeoKeys, empty until [`Ifd::resolve_geo_keys`] succeeds.
    pub fn geo_keys(&self) -> &[GeoKey] {
        &self.geo_keys
    }

    /// Tag by catalog name or by its `"UNKNOWN TAG <code>"` name.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        match tag_code(name) {
            Some(code) => self.tag_by_code(code),
            None => self.tags.iter().find(|t| t.name() == name),
        }
    }

    pub fn tag_by_code(&self, code: u16) -> Option<&Tag> {
        self.tags.iter().find(|t| t.code() == code)
    }

    pub fn tag_by_code_mut(&mut self, code: u16) -> Option<&mut Tag> {
        self.tags.iter_mut().find(|t| t.code() == code)
    }

    fn geo_key(&self, name: &str) -> Option<&GeoKey> {
        self.geo_keys.iter().find(|k| k.name() == name)
    }

    /// Decoded value of a GeoKey or tag by name.
    ///
    /// GeoKeys are checked first.
    ///
    /// # Errors
    /// - `TagNotFound` if no GeoKey or tag has this name
    /// - `TagNotLoaded` if the tag exists but its value was not fetched
    pub fn lookup(&self, name: &str) -> Result<&TagValue, TiffError> {
        if let Some(key) = self.geo_key(name) {
            return Ok(&key.value);
        }
        match self.tag(name) {
            Some(tag) => tag.try_value(),
            None => Err(TiffError::TagNotFound(name.to_string())),
        }
    }

    /// Like [`Ifd::lookup`], returning `None` instead of failing.
    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.lookup(name).ok()
    }

    /// Whether a GeoKey or tag with this name exists, loaded or not.
    pub fn contains(&self, name: &str) -> bool {
        self.geo_key(name).is_some() || self.tag(name).is_some()
    }

    /// Add or replace a tag under its catalog name.
    ///
    /// # Errors
    /// `InvalidTagValue` if `name` is not the tag's catalog name.
    pub fn insert_tag(&mut self, name: &str, tag: Tag) -> Result<(), TiffError> {
        if tag.name() != name {
            return Err(TiffError::InvalidTagValue {
                tag: name.to_string(),
                message: format!("tag code {} is named {}", tag.code(), tag.name()),
            });
        }
        self.put(tag);
        Ok(())
    }

    /// Snapshot of all decoded values by name.
    ///
    /// Byte-valued tags, unloaded tags and the three GeoTIFF container tags
    /// are left out; GeoKeys are merged in.
    pub fn to_mapping(&self) -> BTreeMap<String, TagValue> {
        let mut mapping: BTreeMap<String, TagValue> = self
            .tags
            .iter()
            .filter(|t| !GEOKEY_TAGS.contains(&t.code()))
            .filter_map(|t| match t.value() {
                Some(value) if !value.is_bytes() => Some((t.name().into_owned(), value.clone())),
                _ => None,
            })
            .collect();

        for key in &self.geo_keys {
            mapping.insert(key.name().into_owned(), key.value.clone());
        }
        mapping
    }

    /// Decode the GeoKeyDirectoryTag into GeoKeys.
    ///
    /// Does nothing when the directory has no GeoKeyDirectoryTag. The
    /// directory tag and any parameter tags it references must be loaded.
    pub fn resolve_geo_keys(&mut self) -> Result<(), GeoKeyError> {
        let code = TiffTag::GeoKeyDirectory.as_u16();
        let Some(tag) = self.tag_by_code(code) else {
            return Ok(());
        };
        let value = tag.value().ok_or_else(|| GeoKeyError::SourceTagNotLoaded {
            key: tag.name().into_owned(),
            tag: code,
        })?;

        let directory = GeoKeyDirectory::from_value(value)?;
        self.geo_keys = directory.resolve(&self.tags)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tile Geometry
    // -------------------------------------------------------------------------

    fn scalar(&self, tag: TiffTag) -> Option<u64> {
        self.tag_by_code(tag.as_u16())?.value()?.as_u64()
    }

    fn list(&self, tag: TiffTag) -> Option<Vec<u64>> {
        self.tag_by_code(tag.as_u16())?.value()?.to_u64_vec()
    }

    /// Number of tiles across and down: `ceil(image / tile)`.
    ///
    /// `(0, 0)` when any of the four dimension tags is missing or zero.
    pub fn tile_grid_dimensions(&self) -> (u64, u64) {
        let dims = (
            self.scalar(TiffTag::ImageWidth),
            self.scalar(TiffTag::ImageHeight),
            self.scalar(TiffTag::TileWidth),
            self.scalar(TiffTag::TileHeight),
        );
        match dims {
            (Some(w), Some(h), Some(tw), Some(th)) if tw > 0 && th > 0 => {
                (w.div_ceil(tw), h.div_ceil(th))
            }
            _ => (0, 0),
        }
    }

    /// Index of tile `(x, y)` in TileOffsets/TileByteCounts, if it exists.
    pub fn tile_index(&self, x: u64, y: u64) -> Option<usize> {
        let (grid_width, grid_height) = self.tile_grid_dimensions();
        if x >= grid_width || y >= grid_height {
            return None;
        }

        let index = usize::try_from(y.checked_mul(grid_width)?.checked_add(x)?).ok()?;
        let offsets = self.tag_by_code(TiffTag::TileOffsets.as_u16())?.value()?.numbers()?;
        let counts = self.tag_by_code(TiffTag::TileByteCounts.as_u16())?.value()?.numbers()?;

        (index < offsets.len() && index < counts.len()).then_some(index)
    }

    /// Whether tile `(x, y)` is inside the grid and in both offset tables.
    pub fn has_tile(&self, x: u64, y: u64) -> bool {
        self.tile_index(x, y).is_some()
    }

    /// File offset and byte length of tile `(x, y)`.
    pub fn tile_location(&self, x: u64, y: u64) -> Option<(u64, u64)> {
        let index = self.tile_index(x, y)?;
        let offset = self.list(TiffTag::TileOffsets)?.get(index).copied()?;
        let length = self.list(TiffTag::TileByteCounts)?.get(index).copied()?;
        Some((offset, length))
    }

    /// `(TileWidth, TileHeight, SamplesPerPixel)` as far as they are known.
    pub fn tile_shape(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        (
            self.scalar(TiffTag::TileWidth),
            self.scalar(TiffTag::TileHeight),
            self.scalar(TiffTag::SamplesPerPixel),
        )
    }

    /// Sample data type from SampleFormat[0] and BitsPerSample[0].
    ///
    /// SampleFormat defaults to unsigned and BitsPerSample to 1, as in TIFF.
    pub fn pixel_dtype(&self) -> PixelDtype {
        let kind = match self.list(TiffTag::SampleFormat).and_then(|v| v.first().copied()) {
            Some(2) => SampleKind::Signed,
            Some(3) => SampleKind::Float,
            _ => SampleKind::Unsigned,
        };
        let bits = self
            .list(TiffTag::BitsPerSample)
            .and_then(|v| v.first().copied())
            .and_then(|b| u16::try_from(b).ok())
            .unwrap_or(1);

        PixelDtype { kind, bits }
    }

    /// Compression code, if the tag is present and loaded.
    pub fn compression(&self) -> Option<u16> {
        self.scalar(TiffTag::Compression)
            .and_then(|c| u16::try_from(c).ok())
    }
}

// =============================================================================
// Tests
// =============================================================================
