//! Configuration for the `async-cog` command-line tool.
//!
//! This module provides:
//! - Command-line arguments via clap
//! - Environment variables with `COG_` prefix
//! - Parsing of source locations (HTTP URL, `s3://` URL or local path)
//!
//! # Environment Variables
//!
//! - `COG_MAX_IFDS` - Longest IFD chain accepted (default: 1024)
//! - `COG_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `COG_S3_REGION` - AWS region (default: us-east-1)
//! - `COG_HTTP_TIMEOUT` - HTTP request timeout in seconds (default: 30)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::cog::{ReaderOptions, DEFAULT_MAX_IFDS};

// =============================================================================
// Default Values
// =============================================================================

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default HTTP timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// CLI Arguments
// =============================================================================

/// async-cog - read Cloud-Optimized GeoTIFFs with range requests.
///
/// Reads headers, IFDs, GeoKeys and single tiles from COGs over HTTP(S),
/// S3 or the local filesystem without downloading whole files.
#[derive(Parser, Debug, Clone)]
#[command(name = "async-cog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Longest IFD chain to follow before giving up.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_IFDS, env = "COG_MAX_IFDS")]
    pub max_ifds: usize,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, global = true, env = "COG_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, global = true, default_value = DEFAULT_REGION, env = "COG_S3_REGION")]
    pub s3_region: String,

    /// HTTP request timeout in seconds.
    #[arg(long, global = true, default_value_t = DEFAULT_HTTP_TIMEOUT_SECS, env = "COG_HTTP_TIMEOUT")]
    pub http_timeout: u64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the header and every IFD of a COG.
    Info(InfoArgs),

    /// Fetch a single tile.
    Tile(TileArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    /// HTTP(S) URL, s3://bucket/key, or local path.
    pub source: String,

    /// Fetch and decode all tag values, including GeoKeys.
    #[arg(long, default_value_t = false)]
    pub load: bool,

    /// Print IFD contents as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TileArgs {
    /// HTTP(S) URL, s3://bucket/key, or local path.
    pub source: String,

    /// IFD index (0 = full resolution).
    #[arg(long, default_value_t = 0)]
    pub level: usize,

    /// Tile column.
    #[arg(long)]
    pub x: u64,

    /// Tile row.
    #[arg(long)]
    pub y: u64,

    /// Write the tile to this file (decoded samples with --decode).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Decode the tile and report its shape.
    #[arg(long, default_value_t = false)]
    pub decode: bool,
}

impl Cli {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_ifds == 0 {
            return Err("max_ifds must be greater than 0".to_string());
        }
        if self.http_timeout == 0 {
            return Err("http_timeout must be greater than 0".to_string());
        }
        if self.s3_region.is_empty() {
            return Err("S3 region must not be empty. Set --s3-region or COG_S3_REGION".to_string());
        }

        SourceLocation::parse(self.source())?;
        Ok(())
    }

    /// Source argument of the selected subcommand.
    pub fn source(&self) -> &str {
        match &self.command {
            Command::Info(args) => &args.source,
            Command::Tile(args) => &args.source,
        }
    }

    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            max_ifds: self.max_ifds,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }
}

// =============================================================================
// Source Location
// =============================================================================

/// Where a COG is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Http(Url),
    S3 { bucket: String, key: String },
    File(PathBuf),
}

impl SourceLocation {
    /// Classify a source string.
    ///
    /// `http://` and `https://` become [`SourceLocation::Http`], `s3://bucket/key`
    /// becomes [`SourceLocation::S3`], and anything without a scheme is a path.
    pub fn parse(source: &str) -> Result<Self, String> {
        if source.is_empty() {
            return Err("source must not be empty".to_string());
        }

        let url = match Url::parse(source) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                return Ok(SourceLocation::File(PathBuf::from(source)))
            }
            Err(e) => return Err(format!("invalid source '{}': {}", source, e)),
        };

        match url.scheme() {
            "http" | "https" => Ok(SourceLocation::Http(url)),
            "s3" => {
                let bucket = url
                    .host_str()
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| format!("missing bucket in '{}'", source))?
                    .to_string();
                let key = url.path().trim_start_matches('/').to_string();
                if key.is_empty() {
                    return Err(format!("missing object key in '{}'", source));
                }
                Ok(SourceLocation::S3 { bucket, key })
            }
            "file" => url
                .to_file_path()
                .map(SourceLocation::File)
                .map_err(|_| format!("invalid file URL '{}'", source)),
            // Windows drive letters parse as a one-letter scheme
            scheme if scheme.len() == 1 => Ok(SourceLocation::File(PathBuf::from(source))),
            scheme => Err(format!("unsupported scheme '{}' in '{}'", scheme, source)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
