//! Directory entries and lazy loading of their values.
//!
//! A [`RawTag`] is what the directory table says: code, type, count and
//! where the value lives. A [`Tag`] wraps it together with the fetched bytes
//! and the decoded value, both of which stay `None` until loaded.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use tracing::debug;

use super::parser::ByteOrder;
use super::tags::{tag_arity, tag_name, FieldType};
use super::values::{decode_value, TagValue};
use crate::error::TiffError;
use crate::io::RangeReader;

/// Where a tag's value bytes are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagLocation {
    /// Packed into the record's value/offset field
    Inline(Bytes),
    /// Stored elsewhere in the file at this offset
    Offset(u64),
}

/// One directory entry as declared in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTag {
    pub code: u16,
    pub field_type: FieldType,
    pub count: u64,
    pub location: TagLocation,
}

impl RawTag {
    /// Size of the value data in bytes.
    pub fn data_len(&self) -> Result<usize, TiffError> {
        self.field_type
            .data_size(self.count)
            .and_then(|s| usize::try_from(s).ok())
            .ok_or(TiffError::TagDataTooLarge {
                tag: self.code,
                count: self.count,
            })
    }

    /// Decode the value from its data bytes.
    pub fn decode(&self, data: &[u8], byte_order: ByteOrder) -> Result<TagValue, TiffError> {
        decode_value(
            self.field_type,
            self.count,
            data,
            byte_order,
            tag_arity(self.code),
        )
    }
}

/// A directory entry with its lazily loaded value.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    raw: RawTag,
    data: Option<Bytes>,
    value: Option<TagValue>,
}

impl Tag {
    /// Wrap a raw entry without loading anything.
    pub fn new(raw: RawTag) -> Self {
        Self {
            raw,
            data: None,
            value: None,
        }
    }

    /// Wrap a raw entry, decoding inline values immediately.
    pub fn from_raw(raw: RawTag, byte_order: ByteOrder) -> Result<Self, TiffError> {
        let mut tag = Self::new(raw);
        if let TagLocation::Inline(data) = &tag.raw.location {
            let data = data.clone();
            tag.value = Some(tag.raw.decode(&data, byte_order)?);
            tag.data = Some(data);
        }
        Ok(tag)
    }

    /// Build a tag whose out-of-line data is already known.
    pub fn with_data(raw: RawTag, data: Bytes, byte_order: ByteOrder) -> Result<Self, TiffError> {
        let value = raw.decode(&data, byte_order)?;
        Ok(Self {
            raw,
            data: Some(data),
            value: Some(value),
        })
    }

    #[inline]
    pub fn code(&self) -> u16 {
        self.raw.code
    }

    /// Catalog name, or `"UNKNOWN TAG <code>"`.
    pub fn name(&self) -> Cow<'static, str> {
        tag_name(self.raw.code)
    }

    #[inline]
    pub fn field_type(&self) -> FieldType {
        self.raw.field_type
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.raw.count
    }

    pub fn raw(&self) -> &RawTag {
        &self.raw
    }

    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self.raw.location, TagLocation::Inline(_))
    }

    /// Whether the value has been decoded.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.value.is_some()
    }

    /// Raw value bytes, once fetched.
    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    /// Decoded value, once loaded.
    pub fn value(&self) -> Option<&TagValue> {
        self.value.as_ref()
    }

    /// Decoded value, or `TagNotLoaded`.
    pub fn try_value(&self) -> Result<&TagValue, TiffError> {
        self.value
            .as_ref()
            .ok_or_else(|| TiffError::TagNotLoaded(self.name().into_owned()))
    }

    /// Fetch and decode the value.
    ///
    /// Out-of-line values cost exactly one range read; calling this on a
    /// loaded tag does no I/O.
    pub async fn load<R>(&mut self, reader: &R, byte_order: ByteOrder) -> Result<&TagValue, TiffError>
    where
        R: RangeReader + ?Sized,
    {
        if self.value.is_none() {
            let data = match &self.raw.location {
                TagLocation::Inline(data) => data.clone(),
                TagLocation::Offset(offset) => {
                    let len = self.raw.data_len()?;
                    debug!(
                        tag = %self.name(),
                        offset = *offset,
                        len,
                        "Fetching tag data"
                    );
                    reader.read_exact_at(*offset, len).await?
                }
            };

            self.value = Some(self.raw.decode(&data, byte_order)?);
            self.data = Some(data);
        }

        self.try_value()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}: {}", self.name(), value),
            None => write!(f, "{}: None", self.name()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
