//! Pixel decoders for compressed tiles.
//!
//! The reader hands a tile's compressed bytes together with [`TileMetadata`]
//! to a [`DecoderRegistry`], which dispatches on the TIFF Compression code.
//! Decoders produce an interleaved [`PixelGrid`].
//!
//! # Default decoders
//!
//! | Compression | Decoder            |
//! |-------------|--------------------|
//! | 1           | [`RawDecoder`]     |
//! | 7           | [`JpegDecoder`]    |
//! | 8, 32946    | [`DeflateDecoder`] |

mod deflate;
mod jpeg;
mod raw;

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::DecodeError;
use crate::format::tiff::{Compression, Ifd, PixelDtype, TagValue, TiffTag};

pub use deflate::DeflateDecoder;
pub use jpeg::{is_abbreviated_stream, merge_jpeg_tables, JpegDecoder};
pub use raw::RawDecoder;

// =============================================================================
// Tile Metadata
// =============================================================================

/// Everything a decoder needs to know about a tile besides its bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMetadata {
    pub compression: u16,
    pub tile_width: u32,
    pub tile_height: u32,
    pub samples_per_pixel: u32,
    pub dtype: PixelDtype,
    pub jpeg_tables: Option<Bytes>,
}

impl TileMetadata {
    /// Collect tile metadata from a loaded IFD.
    ///
    /// Compression, TileWidth and TileHeight must be loaded. SamplesPerPixel
    /// defaults to 1.
    pub fn from_ifd(ifd: &Ifd) -> Result<Self, DecodeError> {
        let compression = ifd
            .compression()
            .ok_or(DecodeError::MissingMetadata("Compression"))?;

        let (tile_width, tile_height, samples) = ifd.tile_shape();
        let tile_width = tile_width
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(DecodeError::MissingMetadata("TileWidth"))?;
        let tile_height = tile_height
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(DecodeError::MissingMetadata("TileHeight"))?;
        let samples_per_pixel = samples.and_then(|v| u32::try_from(v).ok()).unwrap_or(1);

        let jpeg_tables = ifd
            .tag_by_code(TiffTag::JpegTables.as_u16())
            .and_then(|t| t.value())
            .and_then(table_bytes);

        Ok(Self {
            compression,
            tile_width,
            tile_height,
            samples_per_pixel,
            dtype: ifd.pixel_dtype(),
            jpeg_tables,
        })
    }

    /// Size in bytes of the fully decoded tile.
    ///
    /// # Errors
    /// `TileTooLarge` if the geometry does not fit in `usize`.
    pub fn decoded_len(&self) -> Result<usize, DecodeError> {
        grid_len(
            self.tile_width,
            self.tile_height,
            self.samples_per_pixel,
            self.dtype,
        )
    }
}

/// JPEGTables is UNDEFINED in practice, but some writers use BYTE.
fn table_bytes(value: &TagValue) -> Option<Bytes> {
    match value {
        TagValue::Bytes(b) => Some(b.clone()),
        other => other
            .numbers()?
            .iter()
            .map(|n| n.as_u64().and_then(|v| u8::try_from(v).ok()))
            .collect::<Option<Vec<u8>>>()
            .map(Bytes::from),
    }
}

// =============================================================================
// Pixel Grid
// =============================================================================

/// A decoded tile: `height` rows of `width` pixels of `bands` interleaved samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    pub width: u32,
    pub height: u32,
    pub bands: u32,
    pub dtype: PixelDtype,
    pub data: Bytes,
}

impl PixelGrid {
    /// Wrap decoded samples, checking the buffer matches the shape.
    pub fn new(
        width: u32,
        height: u32,
        bands: u32,
        dtype: PixelDtype,
        data: Bytes,
    ) -> Result<Self, DecodeError> {
        let expected = grid_len(width, height, bands, dtype)?;
        if data.len() != expected {
            return Err(DecodeError::InvalidLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bands,
            dtype,
            data,
        })
    }

    /// `(width, height, bands)`
    pub fn shape(&self) -> (u32, u32, u32) {
        (self.width, self.height, self.bands)
    }
}

fn grid_len(width: u32, height: u32, bands: u32, dtype: PixelDtype) -> Result<usize, DecodeError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(bands as usize))
        .and_then(|n| n.checked_mul(dtype.bytes_per_sample()))
        .ok_or(DecodeError::TileTooLarge {
            width,
            height,
            bands,
        })
}

// =============================================================================
// Registry
// =============================================================================

/// Turns one compressed tile into pixels.
pub trait Decoder: Send + Sync {
    fn decode(&self, meta: &TileMetadata, data: &[u8]) -> Result<PixelGrid, DecodeError>;
}

/// Decoders keyed by TIFF Compression code.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<u16, Arc<dyn Decoder>>,
}

impl DecoderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register `decoder` for `compression`, replacing any previous one.
    pub fn register<D>(&mut self, compression: u16, decoder: D)
    where
        D: Decoder + 'static,
    {
        self.decoders.insert(compression, Arc::new(decoder));
    }

    pub fn contains(&self, compression: u16) -> bool {
        self.decoders.contains_key(&compression)
    }

    pub fn get(&self, compression: u16) -> Option<&Arc<dyn Decoder>> {
        self.decoders.get(&compression)
    }

    /// Decode with the decoder registered for `meta.compression`.
    pub fn decode(&self, meta: &TileMetadata, data: &[u8]) -> Result<PixelGrid, DecodeError> {
        self.get(meta.compression)
            .ok_or(DecodeError::UnsupportedCompression(meta.compression))?
            .decode(meta, data)
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Compression::None as u16, RawDecoder);
        registry.register(Compression::Jpeg as u16, JpegDecoder);
        registry.register(Compression::Deflate as u16, DeflateDecoder);
        registry.register(Compression::AdobeDeflate as u16, DeflateDecoder);
        registry
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut codes: Vec<_> = self.decoders.keys().copied().collect();
        codes.sort_unstable();
        f.debug_struct("DecoderRegistry")
            .field("compressions", &codes)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
