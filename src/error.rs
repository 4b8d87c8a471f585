use thiserror::Error;

/// I/O errors that can occur when reading byte ranges from a source
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// HTTP request failed or returned a non-success status
    #[error("HTTP error: {0}")]
    Http(String),

    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Error reading a local file
    #[error("File error: {0}")]
    File(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// The transport returned a different number of bytes than requested
    #[error("Short read at offset {offset}: requested {requested} bytes, received {received}")]
    ShortRead {
        offset: u64,
        requested: u64,
        received: u64,
    },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// Invalid BigTIFF reserved header field (must be 0)
    #[error("Invalid BigTIFF reserved field: expected 0, got {0}")]
    InvalidBigTiffReserved(u16),

    /// Tag uses a field type outside the 13 known TIFF types
    #[error("Unknown field type {field_type} for tag {tag}")]
    UnknownFieldType { tag: u16, field_type: u16 },

    /// Tag declares more data than can be addressed
    #[error("Tag {tag} declares too many values: {count}")]
    TagDataTooLarge { tag: u16, count: u64 },

    /// Buffer is shorter than the values it should contain
    #[error("Truncated value: expected {expected} bytes, got {actual}")]
    TruncatedValue { expected: usize, actual: usize },

    /// The IFD chain points back to an already visited directory
    #[error("IFD chain cycles back to offset {0}")]
    IfdCycle(u64),

    /// The IFD chain is longer than the configured limit
    #[error("IFD chain exceeds the limit of {0} directories")]
    TooManyIfds(usize),

    /// No tag or GeoKey with this name in the IFD
    #[error("Tag not found: {0}")]
    TagNotFound(String),

    /// Tag is present but its data has not been fetched yet
    #[error("Tag not loaded: {0}")]
    TagNotLoaded(String),

    /// Tag has an unexpected type, count or name
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: String, message: String },
}

impl TiffError {
    /// Whether this error means the file is not a TIFF/BigTIFF at all.
    pub fn is_invalid_format(&self) -> bool {
        matches!(
            self,
            TiffError::InvalidMagic(_)
                | TiffError::InvalidVersion(_)
                | TiffError::InvalidBigTiffOffsetSize(_)
                | TiffError::InvalidBigTiffReserved(_)
        )
    }
}

/// Errors raised while unpacking a GeoKeyDirectoryTag
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoKeyError {
    /// Directory header version is not 1
    #[error("Unsupported GeoKey directory version: {0}")]
    UnsupportedVersion(u16),

    /// Declared key count does not fit in the directory array
    #[error("GeoKey directory declares {declared} keys but holds data for {available}")]
    Truncated { declared: usize, available: usize },

    /// Key references a parameter tag that is absent from the IFD
    #[error("GeoKey {key} references missing tag {tag}")]
    MissingSourceTag { key: String, tag: u16 },

    /// Key references a parameter tag whose data is not loaded
    #[error("GeoKey {key} references tag {tag} which has not been loaded")]
    SourceTagNotLoaded { key: String, tag: u16 },

    /// Key offset points past the end of the parameter tag
    #[error("GeoKey {key} offset {offset} is out of range for {len} values")]
    OffsetOutOfRange { key: String, offset: usize, len: usize },

    /// Directory tag has an unusable value
    #[error("Invalid GeoKey directory: {0}")]
    InvalidDirectory(String),
}

/// Errors from pixel decoders
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// No decoder registered for this Compression code
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(u16),

    /// A metadata tag the decoder needs is absent
    #[error("Missing metadata for decoding: {0}")]
    MissingMetadata(&'static str),

    /// Decoded buffer size does not match the tile geometry
    #[error("Decoded length mismatch: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Tile geometry overflows the address space
    #[error("Tile too large: {width}x{height}x{bands}")]
    TileTooLarge { width: u32, height: u32, bands: u32 },

    /// JPEG decoder failure
    #[error("JPEG decode error: {0}")]
    Jpeg(String),

    /// Deflate decoder failure
    #[error("Deflate decode error: {0}")]
    Deflate(String),
}

/// Errors surfaced by [`crate::CogReader`]
#[derive(Debug, Clone, Error)]
pub enum CogError {
    /// Transport failure
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Container parsing failure
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// GeoKey resolution failure
    #[error("GeoKey error: {0}")]
    GeoKeys(#[from] GeoKeyError),

    /// Pixel decoding failure
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Requested tile is outside the grid or missing from the offset tables
    #[error("Tile ({x}, {y}) does not exist at level {level}")]
    TileNotFound { level: usize, x: u64, y: u64 },

    /// Requested IFD index is past the end of the chain
    #[error("Level {level} does not exist (file has {count} IFDs)")]
    LevelOutOfRange { level: usize, count: usize },
}
