//! # async-cog
//!
//! An asynchronous reader for Cloud-Optimized GeoTIFFs (COGs).
//!
//! The reader fetches only the bytes it needs through ranged reads: the
//! header, each IFD's tag table, out-of-line tag values on demand, and
//! individual tiles. Sources can be HTTP(S) URLs, S3 objects or local files.
//!
//! ## Features
//!
//! - **Range-based reading**: Every access goes through a [`RangeReader`]
//! - **TIFF and BigTIFF**: Both byte orders, 32- and 64-bit offsets
//! - **Lazy tags**: Out-of-line values load on first request, once
//! - **GeoKeys**: The GeoKeyDirectory is unpacked into named geo keys
//! - **Tiles**: Compressed tile bytes, or decoded pixels via a [`DecoderRegistry`]
//!
//! ## Architecture
//!
//! - [`io`] - Range readers for HTTP, S3 and local files
//! - [`mod@format`] - TIFF header, tag catalog, values, IFDs and GeoKeys
//! - [`cog`] - The [`CogReader`] tying transport and parser together
//! - [`decode`] - Compression decoders for tile pixels
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use async_cog::{CogReader, HttpRangeReader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reader = HttpRangeReader::new("https://example.com/cog.tif").await?;
//!     let mut cog = CogReader::open(reader).await?;
//!
//!     let ifd = cog.load_ifd(0).await?;
//!     println!("{}", ifd.lookup("ImageWidth")?);
//!
//!     let tile = cog.read_tile(0, 0, 0).await?;
//!     println!("tile is {} bytes", tile.len());
//!     Ok(())
//! }
//! ```

pub mod cog;
pub mod config;
pub mod decode;
pub mod error;
pub mod format;
pub mod io;

// Re-export commonly used types
pub use cog::{CogReader, ReaderOptions, DEFAULT_MAX_IFDS};
pub use config::{Cli, Command, SourceLocation};
pub use decode::{
    Decoder, DecoderRegistry, DeflateDecoder, JpegDecoder, PixelGrid, RawDecoder, TileMetadata,
};
pub use error::{CogError, DecodeError, GeoKeyError, IoError, TiffError};
pub use format::tiff::{
    geokey_name, tag_code, tag_name, ByteOrder, Compression, FieldType, Fraction, GeoKey, Ifd,
    Number, PixelDtype, SampleKind, Tag, TagValue, TiffHeader, TiffTag,
};
pub use io::{create_s3_client, FileRangeReader, HttpRangeReader, RangeReader, S3RangeReader};
