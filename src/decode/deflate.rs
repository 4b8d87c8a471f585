use std::io::Read;

use bytes::Bytes;
use flate2::read::ZlibDecoder;

use super::{Decoder, PixelGrid, TileMetadata};
use crate::error::DecodeError;

/// Upper bound on the buffer reserved before inflating.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// Decoder for zlib-wrapped Deflate tiles (Compression = 8 or 32946).
///
/// Horizontal predictors are not undone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateDecoder;

impl Decoder for DeflateDecoder {
    fn decode(&self, meta: &TileMetadata, data: &[u8]) -> Result<PixelGrid, DecodeError> {
        let expected = meta.decoded_len()?;

        // Inflate at most one byte past the tile so a bad stream fails the length check
        let mut decoded = Vec::with_capacity(expected.min(MAX_PREALLOC));
        ZlibDecoder::new(data)
            .take((expected as u64).saturating_add(1))
            .read_to_end(&mut decoded)
            .map_err(|e| DecodeError::Deflate(e.to_string()))?;

        PixelGrid::new(
            meta.tile_width,
            meta.tile_height,
            meta.samples_per_pixel,
            meta.dtype,
            Bytes::from(decoded),
        )
    }
}
