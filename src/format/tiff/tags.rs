//! TIFF field types and the tag catalog.
//!
//! This module defines the vocabulary for TIFF parsing:
//! - Field types that determine how values are encoded
//! - The catalog mapping numeric tag codes to names and expected arity
//! - Compression codes used to pick a pixel decoder
//!
//! Unknown tag codes are never rejected; they get a synthesized
//! `"UNKNOWN TAG <code>"` name and are treated as lists.

use std::borrow::Cow;

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF field types that determine how values are encoded.
///
/// Each field type has a fixed element size in bytes, which determines
/// whether a value fits inline in a directory entry and how arrays are split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte = 1,

    /// 8-bit ASCII character, NUL-terminated
    Ascii = 2,

    /// Unsigned 16-bit integer
    Short = 3,

    /// Unsigned 32-bit integer
    Long = 4,

    /// Two unsigned 32-bit integers: numerator, denominator
    Rational = 5,

    /// Signed 8-bit integer
    SByte = 6,

    /// Opaque byte data
    Undefined = 7,

    /// Signed 16-bit integer
    SShort = 8,

    /// Signed 32-bit integer
    SLong = 9,

    /// Two signed 32-bit integers: numerator, denominator
    SRational = 10,

    /// IEEE-754 single precision
    Float = 11,

    /// IEEE-754 double precision
    Double = 12,

    /// Unsigned 64-bit integer (BigTIFF)
    Long8 = 16,
}

impl FieldType {
    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational
            | FieldType::SRational
            | FieldType::Double
            | FieldType::Long8 => 8,
        }
    }

    /// Create a FieldType from its numeric value.
    ///
    /// Returns `None` for type ids outside the 13 recognized types.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            16 => Some(FieldType::Long8),
            _ => None,
        }
    }

    /// Total byte size of `count` values, or `None` on overflow.
    #[inline]
    pub fn data_size(self, count: u64) -> Option<u64> {
        count.checked_mul(self.size_in_bytes() as u64)
    }

    /// Check if `count` values fit in a value/offset field of `pointer_size` bytes.
    #[inline]
    pub fn fits_inline(self, count: u64, pointer_size: usize) -> bool {
        self.data_size(count)
            .map(|size| size <= pointer_size as u64)
            .unwrap_or(false)
    }
}

// =============================================================================
// Tag Catalog
// =============================================================================

/// Expected arity of a tag's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagArity {
    /// A one-element result collapses to a scalar
    Single,
    /// Always a sequence, even with a single element
    List,
}

// Sorted by code for binary search.
// https://www.awaresystems.be/imaging/tiff/tifftags/baseline.html
// http://geotiff.maptools.org/spec/geotiff2.4.html
static SINGLE_VALUE_TAGS: &[(u16, &str)] = &[
    (254, "NewSubfileType"),
    (255, "SubfileType"),
    (256, "ImageWidth"),
    (257, "ImageHeight"),
    (259, "Compression"),
    (262, "PhotometricInterpretation"),
    (263, "Threshholding"),
    (264, "CellWidth"),
    (265, "CellLength"),
    (266, "FillOrder"),
    (269, "DocumentName"),
    (270, "ImageDescription"),
    (271, "Make"),
    (272, "Model"),
    (274, "Orientation"),
    (277, "SamplesPerPixel"),
    (278, "RowsPerStrip"),
    (282, "XResolution"),
    (283, "YResolution"),
    (284, "PlanarConfiguration"),
    (285, "PageName"),
    (286, "XPosition"),
    (287, "YPosition"),
    (290, "GrayResponseUnit"),
    (291, "GrayResponseCurve"),
    (292, "T4Options"),
    (293, "T6Options"),
    (296, "ResolutionUnit"),
    (297, "PageNumber"),
    (301, "TransferFunction"),
    (305, "Software"),
    (306, "DateTime"),
    (315, "Artist"),
    (316, "HostComputer"),
    (317, "Predictor"),
    (318, "WhitePoint"),
    (319, "PrimaryChromaticities"),
    (322, "TileWidth"),
    (323, "TileHeight"),
    (332, "InkSet"),
    (333, "InkNames"),
    (334, "NumberOfInks"),
    (336, "DotRange"),
    (337, "TargetPrinter"),
    (340, "SMinSampleValue"),
    (341, "SMaxSampleValue"),
    (347, "JPEGTables"),
    (512, "JPEGProc"),
    (513, "JPEGInterchangeFormat"),
    (514, "JPEGInterchangeFormatLength"),
    (515, "JPEGRestartInterval"),
    (517, "JPEGLosslessPredictors"),
    (518, "JPEGPointTransforms"),
    (519, "JPEGQTables"),
    (520, "JPEGDCTables"),
    (521, "JPEGACTables"),
    (531, "YCbCrPositioning"),
    (700, "XMP"),
    (33432, "Copyright"),
];

static LIST_TAGS: &[(u16, &str)] = &[
    (258, "BitsPerSample"),
    (273, "StripOffsets"),
    (279, "StripByteCounts"),
    (280, "MinSampleValue"),
    (281, "MaxSampleValue"),
    (288, "FreeOffsets"),
    (289, "FreeByteCounts"),
    (320, "ColorMap"),
    (321, "HalftoneHints"),
    (324, "TileOffsets"),
    (325, "TileByteCounts"),
    (338, "ExtraSamples"),
    (339, "SampleFormat"),
    (342, "TransferRange"),
    (529, "YCbCrCoefficients"),
    (530, "YCbCrSubSampling"),
    (532, "ReferenceBlackWhite"),
    (33550, "ModelPixelScaleTag"),
    (33920, "ModelTransformationTag"),
    (33922, "ModelTiepointTag"),
    (34735, "GeoKeyDirectoryTag"),
    (34736, "GeoDoubleParamsTag"),
    (34737, "GeoAsciiParamsTag"),
];

fn lookup(table: &'static [(u16, &'static str)], code: u16) -> Option<&'static str> {
    table
        .binary_search_by_key(&code, |&(c, _)| c)
        .ok()
        .map(|idx| table[idx].1)
}

/// Semantic name of a tag code.
pub fn tag_name(code: u16) -> Cow<'static, str> {
    match lookup(SINGLE_VALUE_TAGS, code).or_else(|| lookup(LIST_TAGS, code)) {
        Some(name) => Cow::Borrowed(name),
        None => Cow::Owned(format!("UNKNOWN TAG {}", code)),
    }
}

/// Expected arity of a tag code. Unknown codes are lists.
pub fn tag_arity(code: u16) -> TagArity {
    if lookup(SINGLE_VALUE_TAGS, code).is_some() {
        TagArity::Single
    } else {
        TagArity::List
    }
}

/// Reverse lookup of a catalog name to its code.
pub fn tag_code(name: &str) -> Option<u16> {
    SINGLE_VALUE_TAGS
        .iter()
        .chain(LIST_TAGS.iter())
        .find(|&&(_, n)| n == name)
        .map(|&(c, _)| c)
}

// =============================================================================
// Well-known Tags
// =============================================================================

/// Tags the reader itself interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    ImageWidth = 256,
    ImageHeight = 257,
    BitsPerSample = 258,
    Compression = 259,
    SamplesPerPixel = 277,
    TileWidth = 322,
    TileHeight = 323,
    TileOffsets = 324,
    TileByteCounts = 325,
    SampleFormat = 339,
    JpegTables = 347,
    GeoKeyDirectory = 34735,
    GeoDoubleParams = 34736,
    GeoAsciiParams = 34737,
}

impl TiffTag {
    /// Get the numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Catalog name of this tag.
    pub fn name(self) -> &'static str {
        lookup(SINGLE_VALUE_TAGS, self.as_u16())
            .or_else(|| lookup(LIST_TAGS, self.as_u16()))
            .unwrap_or("")
    }
}

/// The three GeoTIFF container tags whose content is exposed through GeoKeys.
pub const GEOKEY_TAGS: [u16; 3] = [
    TiffTag::GeoKeyDirectory.as_u16(),
    TiffTag::GeoDoubleParams.as_u16(),
    TiffTag::GeoAsciiParams.as_u16(),
];

// =============================================================================
// Compression Values
// =============================================================================

/// TIFF compression scheme identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Compression {
    /// No compression
    None = 1,

    /// LZW compression
    Lzw = 5,

    /// "Old-style" JPEG
    OldJpeg = 6,

    /// JPEG compression
    Jpeg = 7,

    /// Deflate/zlib compression
    Deflate = 8,

    /// Adobe Deflate
    AdobeDeflate = 32946,

    /// JPEG 2000
    Jpeg2000 = 33003,

    /// WebP
    WebP = 50001,
}

impl Compression {
    /// Create a Compression from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Compression::None),
            5 => Some(Compression::Lzw),
            6 => Some(Compression::OldJpeg),
            7 => Some(Compression::Jpeg),
            8 => Some(Compression::Deflate),
            32946 => Some(Compression::AdobeDeflate),
            33003 => Some(Compression::Jpeg2000),
            50001 => Some(Compression::WebP),
            _ => None,
        }
    }

    /// Get a human-readable name for the compression scheme.
    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Lzw => "LZW",
            Compression::OldJpeg => "Old JPEG",
            Compression::Jpeg => "JPEG",
            Compression::Deflate => "Deflate",
            Compression::AdobeDeflate => "Adobe Deflate",
            Compression::Jpeg2000 => "JPEG 2000",
            Compression::WebP => "WebP",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
