//! GeoTIFF GeoKey directory decoding.
//!
//! The GeoKeyDirectoryTag holds a flat u16 array:
//!
//! ```text
//! [version, revision, minor_revision, key_count,
//!  key_code, source_tag, count, value_or_offset,   // key 1
//!  ...]                                            // key_count entries
//! ```
//!
//! A `source_tag` of 0 means `value_or_offset` is the value itself. Otherwise
//! it names a companion tag in the same IFD (GeoDoubleParamsTag or
//! GeoAsciiParamsTag) and `value_or_offset` indexes into it.

use std::borrow::Cow;
use std::fmt;

use super::tag::Tag;
use super::values::{Number, TagValue};
use crate::error::GeoKeyError;

/// Only directory version this decoder understands.
const SUPPORTED_VERSION: u16 = 1;

// http://geotiff.maptools.org/spec/geotiff6.html
static GEOKEY_NAMES: &[(u16, &str)] = &[
    (1024, "GTModelType"),
    (1025, "GTRasterType"),
    (1026, "GTCitation"),
    (2048, "GeographicType"),
    (2049, "GeogCitation"),
    (2050, "GeogGeodeticDatum"),
    (2051, "GeogPrimeMeridian"),
    (2052, "GeogLinearUnits"),
    (2053, "GeogLinearUnitSize"),
    (2054, "GeogAngularUnits"),
    (2055, "GeogAngularUnitSize"),
    (2056, "GeogEllipsoid"),
    (2057, "GeogSemiMajorAxis"),
    (2058, "GeogSemiMinorAxis"),
    (2059, "GeogInvFlattening"),
    (2060, "GeogAzimuthUnits"),
    (2061, "GeogPrimeMeridianLong"),
    (3072, "ProjectedCSType"),
    (3073, "PCSCitation"),
    (3074, "Projection"),
    (3075, "ProjCoordTrans"),
    (3076, "ProjLinearUnits"),
    (3077, "ProjLinearUnitSize"),
    (3078, "ProjStdParallel"),
    (3079, "ProjStdParallel2"),
    (3080, "ProjOriginLong"),
    (3081, "ProjOriginLat"),
    (3082, "ProjFalseEasting"),
    (3083, "ProjFalseNorthing"),
    (3084, "ProjFalseOriginLong"),
    (3085, "ProjFalseOriginLat"),
    (3086, "ProjFalseOriginEasting"),
    (3087, "ProjFalseOriginNorthing"),
    (3088, "ProjCenterLong"),
    (3089, "ProjCenterLat"),
    (3090, "ProjCenterEasting"),
    (3091, "ProjCenterNorthing"),
    (3092, "ProjScaleAtOrigin"),
    (3093, "ProjScaleAtCenter"),
    (3094, "ProjAzimuthAngle"),
    (3095, "ProjStraightVertPoleLong"),
];

/// Semantic name of a GeoKey code, or `"UNKNOWN GEOKEY <code>"`.
pub fn geokey_name(code: u16) -> Cow<'static, str> {
    match GEOKEY_NAMES.binary_search_by_key(&code, |&(c, _)| c) {
        Ok(idx) => Cow::Borrowed(GEOKEY_NAMES[idx].1),
        Err(_) => Cow::Owned(format!("UNKNOWN GEOKEY {}", code)),
    }
}

// =============================================================================
// Directory
// =============================================================================

/// One undecoded key record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub code: u16,
    pub source_tag: u16,
    pub count: u16,
    pub value_or_offset: u16,
}

/// Parsed GeoKeyDirectoryTag contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoKeyDirectory {
    pub version: u16,
    pub revision: u16,
    pub minor_revision: u16,
    pub entries: Vec<GeoKeyEntry>,
}

impl GeoKeyDirectory {
    /// Parse the raw u16 array.
    ///
    /// Values past the declared key count are ignored; fewer values than
    /// declared is an error.
    pub fn parse(values: &[u16]) -> Result<Self, GeoKeyError> {
        if values.len() < 4 {
            return Err(GeoKeyError::InvalidDirectory(format!(
                "header needs 4 values, got {}",
                values.len()
            )));
        }

        let version = values[0];
        if version != SUPPORTED_VERSION {
            return Err(GeoKeyError::UnsupportedVersion(version));
        }

        let declared = values[3] as usize;
        let available = (values.len() - 4) / 4;
        if declared > available {
            return Err(GeoKeyError::Truncated {
                declared,
                available,
            });
        }

        let entries = values[4..4 + declared * 4]
            .chunks_exact(4)
            .map(|e| GeoKeyEntry {
                code: e[0],
                source_tag: e[1],
                count: e[2],
                value_or_offset: e[3],
            })
            .collect();

        Ok(Self {
            version,
            revision: values[1],
            minor_revision: values[2],
            entries,
        })
    }

    /// Parse from a decoded GeoKeyDirectoryTag value.
    pub fn from_value(value: &TagValue) -> Result<Self, GeoKeyError> {
        let numbers = value.numbers().ok_or_else(|| {
            GeoKeyError::InvalidDirectory(format!("expected SHORT values, got {}", value))
        })?;

        let values = numbers
            .iter()
            .map(|n| n.as_u64().and_then(|v| u16::try_from(v).ok()))
            .collect::<Option<Vec<u16>>>()
            .ok_or_else(|| {
                GeoKeyError::InvalidDirectory("values do not fit in u16".to_string())
            })?;

        Self::parse(&values)
    }

    /// Resolve every entry against the tags of the owning IFD.
    ///
    /// The first key that cannot be resolved fails the whole directory.
    pub fn resolve(&self, tags: &[Tag]) -> Result<Vec<GeoKey>, GeoKeyError> {
        self.entries
            .iter()
            .map(|entry| resolve_entry(entry, tags))
            .collect()
    }
}

// =============================================================================
// GeoKey
// =============================================================================

/// A resolved GeoKey.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoKey {
    pub code: u16,
    pub source_tag: u16,
    pub count: u16,
    pub value_or_offset: u16,
    pub value: TagValue,
}

impl GeoKey {
    pub fn name(&self) -> Cow<'static, str> {
        geokey_name(self.code)
    }
}

impl fmt::Display for GeoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.value)
    }
}

fn resolve_entry(entry: &GeoKeyEntry, tags: &[Tag]) -> Result<GeoKey, GeoKeyError> {
    let value = if entry.source_tag == 0 {
        TagValue::Number(Number::Unsigned(entry.value_or_offset as u64))
    } else {
        let key = || geokey_name(entry.code).into_owned();

        let source = tags
            .iter()
            .rev()
            .find(|t| t.code() == entry.source_tag)
            .ok_or_else(|| GeoKeyError::MissingSourceTag {
                key: key(),
                tag: entry.source_tag,
            })?;
        let source_value = source.value().ok_or_else(|| GeoKeyError::SourceTagNotLoaded {
            key: key(),
            tag: entry.source_tag,
        })?;

        let offset = entry.value_or_offset as usize;
        match source_value {
            TagValue::Text(_) => {
                // Offsets index the raw ASCII bytes; length counts the trailing '|'
                let raw: &[u8] = match source.data() {
                    Some(data) => data.as_ref(),
                    None => &[],
                };
                let end = offset.saturating_add((entry.count as usize).saturating_sub(1));
                let text = raw.get(offset..end).ok_or_else(|| GeoKeyError::OffsetOutOfRange {
                    key: key(),
                    offset,
                    len: raw.len(),
                })?;
                TagValue::Text(vec![String::from_utf8_lossy(text).into_owned()])
            }
            TagValue::Fractions(values) => {
                let fraction = values.get(offset).ok_or_else(|| GeoKeyError::OffsetOutOfRange {
                    key: key(),
                    offset,
                    len: values.len(),
                })?;
                TagValue::Fractions(vec![*fraction])
            }
            TagValue::Bytes(bytes) => {
                let byte = bytes.get(offset).ok_or_else(|| GeoKeyError::OffsetOutOfRange {
                    key: key(),
                    offset,
                    len: bytes.len(),
                })?;
                TagValue::Number(Number::Unsigned(*byte as u64))
            }
            other => {
                let numbers = other.numbers().unwrap_or(&[]);
                let number = numbers.get(offset).ok_or_else(|| GeoKeyError::OffsetOutOfRange {
                    key: key(),
                    offset,
                    len: numbers.len(),
                })?;
                TagValue::Number(*number)
            }
        }
    };

    Ok(GeoKey {
        code: entry.code,
        source_tag: entry.source_tag,
        count: entry.count,
        value_or_offset: entry.value_or_offset,
        value,
    })
}

// =============================================================================
// Tests
// =============================================================================
