//! Directory-chain reader for Cloud-Optimized GeoTIFFs.
//!
//! Opening a file costs two reads for the header and two per IFD: one for
//! the entry count, one for the whole tag table plus the next-IFD pointer.
//! Out-of-line tag values are fetched only when asked for.

use std::collections::HashSet;

use bytes::Bytes;
use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::decode::{DecoderRegistry, PixelGrid, TileMetadata};
use crate::error::{CogError, TiffError};
use crate::format::tiff::{ByteOrder, Ifd, TiffHeader, TiffTag, FILE_HEADER_SIZE};
use crate::io::RangeReader;

/// Default bound on the length of the IFD chain.
pub const DEFAULT_MAX_IFDS: usize = 1024;

/// Tags needed to locate a tile.
const GEOMETRY_TAGS: [TiffTag; 6] = [
    TiffTag::ImageWidth,
    TiffTag::ImageHeight,
    TiffTag::TileWidth,
    TiffTag::TileHeight,
    TiffTag::TileOffsets,
    TiffTag::TileByteCounts,
];

/// Tags needed to decode a tile.
const DECODE_TAGS: [TiffTag; 5] = [
    TiffTag::Compression,
    TiffTag::BitsPerSample,
    TiffTag::SamplesPerPixel,
    TiffTag::SampleFormat,
    TiffTag::JpegTables,
];

// =============================================================================
// Options
// =============================================================================

/// Library-side reader configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Longest IFD chain accepted before failing with `TooManyIfds`
    pub max_ifds: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_ifds: DEFAULT_MAX_IFDS,
        }
    }
}

// =============================================================================
// CogReader
// =============================================================================

/// An open COG: the parsed header and IFD chain over a range reader.
///
/// The reader owns its transport for its whole lifetime. Dropping it (or
/// calling [`CogReader::close`]) releases the transport on every path.
pub struct CogReader<R: RangeReader> {
    reader: R,
    header: TiffHeader,
    ifds: Vec<Ifd>,
}

impl<R: RangeReader> CogReader<R> {
    /// Open a COG with default options.
    pub async fn open(reader: R) -> Result<Self, CogError> {
        Self::open_with_options(reader, ReaderOptions::default()).await
    }

    /// Read the header and walk the whole IFD chain.
    ///
    /// # Errors
    /// - Any `InvalidFormat`-class `TiffError` for a bad header
    /// - `IfdCycle` / `TooManyIfds` for a chain that does not terminate
    /// - `Io` if a read fails or comes back short
    pub async fn open_with_options(reader: R, options: ReaderOptions) -> Result<Self, CogError> {
        let header = read_header(&reader).await?;
        let ifds = walk_chain(&reader, &header, options.max_ifds).await?;

        info!(
            source = reader.identifier(),
            bigtiff = header.is_bigtiff,
            byte_order = header.byte_order.name(),
            ifds = ifds.len(),
            "Opened COG"
        );

        Ok(Self {
            reader,
            header,
            ifds,
        })
    }

    /// Release the transport.
    pub fn close(self) {
        debug!(source = self.reader.identifier(), "Closing COG");
    }

    /// Give back the underlying transport.
    pub fn into_inner(self) -> R {
        self.reader
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn identifier(&self) -> &str {
        self.reader.identifier()
    }

    pub fn header(&self) -> &TiffHeader {
        &self.header
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    pub fn is_big_tiff(&self) -> bool {
        self.header.is_bigtiff
    }

    /// All IFDs in file order.
    pub fn ifds(&self) -> &[Ifd] {
        &self.ifds
    }

    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }

    pub fn ifd(&self, level: usize) -> Option<&Ifd> {
        self.ifds.get(level)
    }

    pub fn ifd_mut(&mut self, level: usize) -> Option<&mut Ifd> {
        self.ifds.get_mut(level)
    }

    /// Fetch every tag of one IFD, then resolve its GeoKeys.
    ///
    /// Tag fetches run concurrently; tags that are already loaded cost nothing.
    pub async fn load_ifd(&mut self, level: usize) -> Result<&Ifd, CogError> {
        let count = self.ifds.len();
        let byte_order = self.header.byte_order;
        let reader = &self.reader;
        let ifd = self
            .ifds
            .get_mut(level)
            .ok_or(CogError::LevelOutOfRange { level, count })?;

        try_join_all(
            ifd.tags_mut()
                .iter_mut()
                .map(|tag| tag.load(reader, byte_order)),
        )
        .await?;

        ifd.resolve_geo_keys()?;
        Ok(ifd)
    }

    /// Load every IFD in order.
    ///
    /// A broken GeoKey directory is logged and skipped; other errors abort.
    pub async fn load_all(&mut self) -> Result<(), CogError> {
        for level in 0..self.ifds.len() {
            match self.load_ifd(level).await {
                Ok(_) => {}
                Err(CogError::GeoKeys(e)) => {
                    warn!(level, error = %e, "Failed to resolve GeoKeys");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Load the listed tags of one IFD if present.
    async fn load_tags(&mut self, level: usize, tags: &[TiffTag]) -> Result<(), TiffError> {
        let byte_order = self.header.byte_order;
        let reader = &self.reader;
        let Some(ifd) = self.ifds.get_mut(level) else {
            return Ok(());
        };

        try_join_all(
            ifd.tags_mut()
                .iter_mut()
                .filter(|tag| tags.iter().any(|t| t.as_u16() == tag.code()))
                .map(|tag| tag.load(reader, byte_order)),
        )
        .await?;
        Ok(())
    }

    /// Fetch the compressed bytes of tile `(x, y)` at IFD `level`.
    ///
    /// # Errors
    /// `TileNotFound` if the level does not exist, the coordinates fall
    /// outside the tile grid, the offset tables are too short, or the tile
    /// has zero length.
    pub async fn read_tile(&mut self, level: usize, x: u64, y: u64) -> Result<Bytes, CogError> {
        let not_found = CogError::TileNotFound { level, x, y };
        if level >= self.ifds.len() {
            return Err(not_found);
        }

        self.load_tags(level, &GEOMETRY_TAGS).await?;

        let (offset, length) = self.ifds[level]
            .tile_location(x, y)
            .filter(|&(_, length)| length > 0)
            .ok_or(not_found)?;
        let length = usize::try_from(length).map_err(|_| TiffError::TagDataTooLarge {
            tag: TiffTag::TileByteCounts.as_u16(),
            count: length,
        })?;

        debug!(level, x, y, offset, length, "Reading tile");
        Ok(self.reader.read_exact_at(offset, length).await?)
    }

    /// Fetch tile `(x, y)` and decode it with `registry`.
    pub async fn read_decoded_tile(
        &mut self,
        level: usize,
        x: u64,
        y: u64,
        registry: &DecoderRegistry,
    ) -> Result<PixelGrid, CogError> {
        let data = self.read_tile(level, x, y).await?;
        self.load_tags(level, &DECODE_TAGS).await?;

        let meta = TileMetadata::from_ifd(&self.ifds[level])?;
        Ok(registry.decode(&meta, &data)?)
    }
}

// =============================================================================
// Header and Chain
// =============================================================================

async fn read_header<R: RangeReader + ?Sized>(reader: &R) -> Result<TiffHeader, TiffError> {
    let prefix = reader.read_exact_at(0, FILE_HEADER_SIZE).await?;
    let (byte_order, is_bigtiff) = TiffHeader::parse_file_header(&prefix)?;

    let second = reader
        .read_exact_at(
            FILE_HEADER_SIZE as u64,
            TiffHeader::second_header_size(is_bigtiff),
        )
        .await?;
    TiffHeader::parse_second_header(byte_order, is_bigtiff, &second)
}

async fn walk_chain<R: RangeReader + ?Sized>(
    reader: &R,
    header: &TiffHeader,
    max_ifds: usize,
) -> Result<Vec<Ifd>, TiffError> {
    let mut ifds = Vec::new();
    let mut visited = HashSet::new();
    let mut offset = header.first_ifd_offset;

    while offset != 0 {
        if !visited.insert(offset) {
            return Err(TiffError::IfdCycle(offset));
        }
        if ifds.len() >= max_ifds {
            return Err(TiffError::TooManyIfds(max_ifds));
        }

        let count_size = header.directory_count_size();
        let count_bytes = reader.read_exact_at(offset, count_size).await?;
        let tag_count = header.read_directory_count(&count_bytes)?;

        let table_len = tag_count
            .checked_mul(header.tag_record_size() as u64)
            .and_then(|n| n.checked_add(header.pointer_size() as u64))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(TiffError::TagDataTooLarge {
                tag: 0,
                count: tag_count,
            })?;
        let table = reader
            .read_exact_at(offset.saturating_add(count_size as u64), table_len)
            .await?;

        let ifd = Ifd::parse(offset, tag_count, &table, header)?;
        offset = ifd.next_ifd_offset();
        ifds.push(ifd);
    }

    Ok(ifds)
}

// =============================================================================
// Tests
// =============================================================================
