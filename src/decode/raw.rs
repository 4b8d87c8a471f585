use bytes::Bytes;

use super::{Decoder, PixelGrid, TileMetadata};
use crate::error::DecodeError;

/// Decoder for uncompressed tiles (Compression = 1).
///
/// The bytes already are the interleaved samples; only the length is checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl Decoder for RawDecoder {
    fn decode(&self, meta: &TileMetadata, data: &[u8]) -> Result<PixelGrid, DecodeError> {
        PixelGrid::new(
            meta.tile_width,
            meta.tile_height,
            meta.samples_per_pixel,
            meta.dtype,
            Bytes::copy_from_slice(data),
        )
    }
}
