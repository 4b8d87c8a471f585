//! Typed tag value decoding.
//!
//! Every TIFF field type maps onto one variant of [`TagValue`]:
//!
//! | Field types                                   | Variant               |
//! |-----------------------------------------------|-----------------------|
//! | BYTE, SBYTE, SHORT, SSHORT, LONG, SLONG, LONG8 | `Number` / `Numbers` |
//! | FLOAT, DOUBLE                                 | `Number` / `Numbers`  |
//! | RATIONAL, SRATIONAL                           | `Fractions`           |
//! | ASCII                                         | `Text`                |
//! | UNDEFINED                                     | `Bytes`               |
//!
//! Rationals stay exact fractions; they are never converted to floats.

use std::fmt;

use bytes::Bytes;
use serde::ser::{Serialize, SerializeSeq, Serializer};

use super::parser::ByteOrder;
use super::tags::{FieldType, TagArity};
use crate::error::TiffError;

// =============================================================================
// Number
// =============================================================================

/// A single numeric value, keeping the signedness of its field type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl Number {
    /// Value as u64, if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Number::Unsigned(v) => Some(v),
            Number::Signed(v) => u64::try_from(v).ok(),
            Number::Float(_) => None,
        }
    }

    /// Value as i64, if it is an integer in range.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::Unsigned(v) => i64::try_from(v).ok(),
            Number::Signed(v) => Some(v),
            Number::Float(_) => None,
        }
    }

    /// Value as f64 (integers are widened).
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Unsigned(v) => v as f64,
            Number::Signed(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Unsigned(v) => write!(f, "{}", v),
            Number::Signed(v) => write!(f, "{}", v),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Number::Unsigned(v) => serializer.serialize_u64(v),
            Number::Signed(v) => serializer.serialize_i64(v),
            Number::Float(v) => serializer.serialize_f64(v),
        }
    }
}

// =============================================================================
// Fraction
// =============================================================================

/// An exact rational number, kept in lowest terms.
///
/// A zero denominator is preserved as read from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    numerator: i64,
    denominator: i64,
}

impl Fraction {
    pub fn new(numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return Self {
                numerator,
                denominator,
            };
        }

        let divisor = gcd(numerator.unsigned_abs(), denominator.unsigned_abs()) as i64;
        let sign = if denominator < 0 { -1 } else { 1 };
        Self {
            numerator: sign * numerator / divisor,
            denominator: sign * denominator / divisor,
        }
    }

    #[inline]
    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    #[inline]
    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    /// Approximate value, for display or geometry math.
    pub fn to_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl Serialize for Fraction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// TagValue
// =============================================================================

/// A decoded tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// One number (single-value tags only)
    Number(Number),
    /// A sequence of numbers
    Numbers(Vec<Number>),
    /// ASCII components, split on `|`
    Text(Vec<String>),
    /// Opaque bytes (UNDEFINED)
    Bytes(Bytes),
    /// Exact rationals
    Fractions(Vec<Fraction>),
}

impl TagValue {
    /// Scalar number, or the first element of a one-element sequence.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            TagValue::Number(n) => Some(*n),
            TagValue::Numbers(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// Scalar value as u64.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_number().and_then(|n| n.as_u64())
    }

    /// Every element as u64; a scalar becomes a one-element vector.
    pub fn to_u64_vec(&self) -> Option<Vec<u64>> {
        match self {
            TagValue::Number(n) => n.as_u64().map(|v| vec![v]),
            TagValue::Numbers(v) => v.iter().map(Number::as_u64).collect(),
            _ => None,
        }
    }

    /// The numbers of this value as a slice-like view.
    pub fn numbers(&self) -> Option<&[Number]> {
        match self {
            TagValue::Number(n) => Some(std::slice::from_ref(n)),
            TagValue::Numbers(v) => Some(v),
            _ => None,
        }
    }

    /// Single string, when the ASCII value has no `|` separator.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Text(parts) if parts.len() == 1 => Some(&parts[0]),
            _ => None,
        }
    }

    /// Single fraction, when the value holds exactly one.
    pub fn as_fraction(&self) -> Option<Fraction> {
        match self {
            TagValue::Fractions(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            TagValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[inline]
    pub fn is_bytes(&self) -> bool {
        matches!(self, TagValue::Bytes(_))
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Number(n) => write!(f, "{}", n),
            TagValue::Numbers(v) => write_list(f, v),
            TagValue::Text(parts) if parts.len() == 1 => write!(f, "{}", parts[0]),
            TagValue::Text(parts) => write_list(f, parts),
            TagValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            TagValue::Fractions(v) if v.len() == 1 => write!(f, "{}", v[0]),
            TagValue::Fractions(v) => write_list(f, v),
        }
    }
}

impl Serialize for TagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TagValue::Number(n) => n.serialize(serializer),
            TagValue::Numbers(v) => v.serialize(serializer),
            TagValue::Text(parts) if parts.len() == 1 => serializer.serialize_str(&parts[0]),
            TagValue::Text(parts) => parts.serialize(serializer),
            TagValue::Bytes(b) => {
                let mut seq = serializer.serialize_seq(Some(b.len()))?;
                for byte in b.iter() {
                    seq.serialize_element(byte)?;
                }
                seq.end()
            }
            TagValue::Fractions(v) if v.len() == 1 => v[0].serialize(serializer),
            TagValue::Fractions(v) => v.serialize(serializer),
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode `count` values of `field_type` from `bytes`.
///
/// `bytes` must hold at least `count * element_size` bytes; any excess is
/// ignored. With [`TagArity::Single`] a one-element numeric result collapses
/// to [`TagValue::Number`].
pub fn decode_value(
    field_type: FieldType,
    count: u64,
    bytes: &[u8],
    byte_order: ByteOrder,
    arity: TagArity,
) -> Result<TagValue, TiffError> {
    let elem = field_type.size_in_bytes();
    let size = field_type
        .data_size(count)
        .and_then(|s| usize::try_from(s).ok())
        .ok_or(TiffError::TruncatedValue {
            expected: usize::MAX,
            actual: bytes.len(),
        })?;

    if bytes.len() < size {
        return Err(TiffError::TruncatedValue {
            expected: size,
            actual: bytes.len(),
        });
    }
    let data = &bytes[..size];

    let value = match field_type {
        FieldType::Ascii => TagValue::Text(decode_ascii(data)),
        FieldType::Undefined => TagValue::Bytes(Bytes::copy_from_slice(data)),
        FieldType::Rational | FieldType::SRational => {
            let signed = field_type == FieldType::SRational;
            TagValue::Fractions(
                data.chunks_exact(elem)
                    .map(|pair| {
                        let (n, d) = (&pair[0..4], &pair[4..8]);
                        if signed {
                            Fraction::new(
                                byte_order.read_i32(n) as i64,
                                byte_order.read_i32(d) as i64,
                            )
                        } else {
                            Fraction::new(
                                byte_order.read_u32(n) as i64,
                                byte_order.read_u32(d) as i64,
                            )
                        }
                    })
                    .collect(),
            )
        }
        _ => {
            let numbers: Vec<Number> = data
                .chunks_exact(elem)
                .map(|chunk| decode_number(field_type, chunk, byte_order))
                .collect();

            if arity == TagArity::Single && numbers.len() == 1 {
                TagValue::Number(numbers[0])
            } else {
                TagValue::Numbers(numbers)
            }
        }
    };

    Ok(value)
}

fn decode_number(field_type: FieldType, chunk: &[u8], order: ByteOrder) -> Number {
    match field_type {
        FieldType::Byte => Number::Unsigned(chunk[0] as u64),
        FieldType::SByte => Number::Signed(chunk[0] as i8 as i64),
        FieldType::Short => Number::Unsigned(order.read_u16(chunk) as u64),
        FieldType::SShort => Number::Signed(order.read_i16(chunk) as i64),
        FieldType::Long => Number::Unsigned(order.read_u32(chunk) as u64),
        FieldType::SLong => Number::Signed(order.read_i32(chunk) as i64),
        FieldType::Long8 => Number::Unsigned(order.read_u64(chunk)),
        FieldType::Float => Number::Float(order.read_f32(chunk) as f64),
        FieldType::Double => Number::Float(order.read_f64(chunk)),
        // Non-numeric types are handled by the caller
        FieldType::Ascii | FieldType::Undefined | FieldType::Rational | FieldType::SRational => {
            Number::Unsigned(chunk[0] as u64)
        }
    }
}

/// Strip trailing NULs and split on `|`.
fn decode_ascii(data: &[u8]) -> Vec<String> {
    let end = data
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    String::from_utf8_lossy(&data[..end])
        .split('|')
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
