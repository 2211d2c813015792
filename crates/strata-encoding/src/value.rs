//! Column value encoding.
//!
//! A column family payload is a tuple of tagged values. Each value starts
//! with a tag `(column_delta << 4) | value_type` written as a nonsorting
//! uvarint, where `column_delta` is the column id minus the id of the
//! previous column in the tuple. Type codes 15 and above are written as
//! the sentinel 15 followed by the real code.
//!
//! Payloads by type:
//!
//! - `Null`, `True`, `False`: none
//! - `Int`: zig-zag LEB128 varint
//! - `Float`: 8 big-endian bytes of the IEEE bits
//! - `Bytes`, `BytesDesc`, `Decimal`, `Array`, `Json`: uvarint length, data
//! - `Time`: two zig-zag varints; `Duration`: three
//! - `Uuid`: 16 bytes
//!
//! Because every payload's length can be computed from its type, a decoder
//! can skip columns it does not need without materializing them.

use std::fmt;

use crate::datum::{ColumnType, Datum};
use crate::error::{EncodingError, EncodingResult};

/// Encoded value type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// No type information.
    Unknown = 0,
    /// SQL NULL.
    Null = 1,
    /// Non-NULL placeholder.
    NotNull = 2,
    /// Integer.
    Int = 3,
    /// Float.
    Float = 4,
    /// Decimal.
    Decimal = 5,
    /// Byte string.
    Bytes = 6,
    /// Byte string in descending form.
    BytesDesc = 7,
    /// Time of day.
    Time = 8,
    /// Interval.
    Duration = 9,
    /// Boolean true.
    True = 10,
    /// Boolean false.
    False = 11,
    /// UUID.
    Uuid = 12,
    /// Array.
    Array = 13,
    /// Network address.
    IpAddr = 14,
    /// Marks an extended type code following the tag.
    Sentinel = 15,
    /// JSON document.
    Json = 16,
}

impl ValueType {
    /// Converts a raw type code.
    #[must_use]
    pub const fn from_u64(v: u64) -> Option<Self> {
        Some(match v {
            0 => Self::Unknown,
            1 => Self::Null,
            2 => Self::NotNull,
            3 => Self::Int,
            4 => Self::Float,
            5 => Self::Decimal,
            6 => Self::Bytes,
            7 => Self::BytesDesc,
            8 => Self::Time,
            9 => Self::Duration,
            10 => Self::True,
            11 => Self::False,
            12 => Self::Uuid,
            13 => Self::Array,
            14 => Self::IpAddr,
            15 => Self::Sentinel,
            16 => Self::Json,
            _ => return None,
        })
    }

    /// Returns the type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Null => "Null",
            Self::NotNull => "NotNull",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Decimal => "Decimal",
            Self::Bytes => "Bytes",
            Self::BytesDesc => "BytesDesc",
            Self::Time => "Time",
            Self::Duration => "Duration",
            Self::True => "True",
            Self::False => "False",
            Self::Uuid => "Uuid",
            Self::Array => "Array",
            Self::IpAddr => "IpAddr",
            Self::Sentinel => "Sentinel",
            Self::Json => "Json",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded value tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueTag {
    /// Column id minus the previous column id in the tuple.
    pub column_delta: u64,
    /// Type of the payload that follows.
    pub value_type: ValueType,
    /// Encoded length of the tag itself.
    pub len: usize,
}

// =============================================================================
// Varints
// =============================================================================

/// Appends a nonsorting uvarint: big-endian 7-bit groups, continuation bit
/// set on every byte but the last.
pub fn encode_nonsorting_uvarint(buf: &mut Vec<u8>, v: u64) {
    let groups = ((64 - v.leading_zeros() as usize + 6) / 7).max(1);
    for i in (1..groups).rev() {
        buf.push(0x80 | ((v >> (7 * i)) & 0x7f) as u8);
    }
    buf.push((v & 0x7f) as u8);
}

/// Decodes a nonsorting uvarint, returning it and its length.
pub fn decode_nonsorting_uvarint(buf: &[u8]) -> EncodingResult<(u64, usize)> {
    let mut v = 0u64;
    for (i, &b) in buf.iter().enumerate() {
        if v >> 57 != 0 {
            return Err(EncodingError::VarintOverflow { offset: 0 });
        }
        v = (v << 7) | u64::from(b & 0x7f);
        if b < 0x80 {
            return Ok((v, i + 1));
        }
    }
    Err(EncodingError::truncated(buf.len(), 1))
}

/// Appends a zig-zag LEB128 signed varint.
pub fn encode_nonsorting_varint(buf: &mut Vec<u8>, v: i64) {
    let mut ux = (v as u64) << 1;
    if v < 0 {
        ux = !ux;
    }
    while ux >= 0x80 {
        buf.push(ux as u8 | 0x80);
        ux >>= 7;
    }
    buf.push(ux as u8);
}

/// Decodes a zig-zag LEB128 signed varint, returning it and its length.
pub fn decode_nonsorting_varint(buf: &[u8]) -> EncodingResult<(i64, usize)> {
    let mut ux = 0u64;
    let mut shift = 0u32;
    for (i, &b) in buf.iter().enumerate() {
        if i == 10 || (i == 9 && b > 1) {
            return Err(EncodingError::VarintOverflow { offset: 0 });
        }
        ux |= u64::from(b & 0x7f) << shift;
        if b < 0x80 {
            let x = (ux >> 1) as i64;
            return Ok((if ux & 1 != 0 { !x } else { x }, i + 1));
        }
        shift += 7;
    }
    Err(EncodingError::truncated(buf.len(), 1))
}

// =============================================================================
// Tags
// =============================================================================

/// Appends a value tag.
pub fn encode_value_tag(buf: &mut Vec<u8>, column_delta: u32, value_type: ValueType) {
    let delta = u64::from(column_delta) << 4;
    let code = value_type as u64;
    if code >= ValueType::Sentinel as u64 {
        encode_nonsorting_uvarint(buf, delta | ValueType::Sentinel as u64);
        encode_nonsorting_uvarint(buf, code);
    } else {
        encode_nonsorting_uvarint(buf, delta | code);
    }
}

/// Decodes a value tag.
pub fn decode_value_tag(buf: &[u8]) -> EncodingResult<ValueTag> {
    let (tag, mut len) = decode_nonsorting_uvarint(buf)?;
    let mut code = tag & 0xf;
    if code == ValueType::Sentinel as u64 {
        let (extended, n) = decode_nonsorting_uvarint(&buf[len..]).map_err(|e| e.at(len))?;
        code = extended;
        len += n;
    }
    let value_type = ValueType::from_u64(code).ok_or(EncodingError::UnsupportedValueType {
        offset: 0,
        value_type: code,
    })?;
    Ok(ValueTag {
        column_delta: tag >> 4,
        value_type,
        len,
    })
}

// =============================================================================
// Payloads
// =============================================================================

/// Appends a tagged value for `datum`.
pub fn encode_value_datum(buf: &mut Vec<u8>, column_delta: u32, datum: &Datum) {
    match datum {
        Datum::Null => encode_value_tag(buf, column_delta, ValueType::Null),
        Datum::Bool(true) => encode_value_tag(buf, column_delta, ValueType::True),
        Datum::Bool(false) => encode_value_tag(buf, column_delta, ValueType::False),
        Datum::Int(v) => {
            encode_value_tag(buf, column_delta, ValueType::Int);
            encode_nonsorting_varint(buf, *v);
        }
        Datum::Float(v) => {
            encode_value_tag(buf, column_delta, ValueType::Float);
            buf.extend_from_slice(&v.to_bits().to_be_bytes());
        }
        Datum::String(v) => {
            encode_value_tag(buf, column_delta, ValueType::Bytes);
            encode_length_prefixed(buf, v.as_bytes());
        }
        Datum::Bytes(v) => {
            encode_value_tag(buf, column_delta, ValueType::Bytes);
            encode_length_prefixed(buf, v);
        }
    }
}

fn encode_length_prefixed(buf: &mut Vec<u8>, data: &[u8]) {
    encode_nonsorting_uvarint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Returns (data offset, data length) of a length-prefixed payload.
fn length_prefixed(buf: &[u8]) -> EncodingResult<(usize, usize)> {
    let (len, prefix) = decode_nonsorting_uvarint(buf)?;
    let len = usize::try_from(len).map_err(|_| EncodingError::VarintOverflow { offset: 0 })?;
    let available = buf.len() - prefix;
    if available < len {
        return Err(EncodingError::truncated(buf.len(), len - available));
    }
    Ok((prefix, len))
}

fn fixed(buf: &[u8], n: usize) -> EncodingResult<usize> {
    if buf.len() < n {
        return Err(EncodingError::truncated(buf.len(), n - buf.len()));
    }
    Ok(n)
}

/// Decodes the payload following a tag of type `value_type` as a column of
/// type `column_type`, returning the datum and the payload length.
pub fn decode_value_datum(
    buf: &[u8],
    value_type: ValueType,
    column_type: ColumnType,
) -> EncodingResult<(Datum, usize)> {
    match (value_type, column_type) {
        (ValueType::Null, _) => Ok((Datum::Null, 0)),
        (ValueType::True, ColumnType::Bool) => Ok((Datum::Bool(true), 0)),
        (ValueType::False, ColumnType::Bool) => Ok((Datum::Bool(false), 0)),
        (ValueType::Int, ColumnType::Int) => {
            let (v, len) = decode_nonsorting_varint(buf)?;
            Ok((Datum::Int(v), len))
        }
        (ValueType::Float, ColumnType::Float) => {
            let len = fixed(buf, 8)?;
            let mut bits = [0u8; 8];
            bits.copy_from_slice(&buf[..8]);
            Ok((Datum::Float(f64::from_bits(u64::from_be_bytes(bits))), len))
        }
        (ValueType::Bytes, ColumnType::Bytes) => {
            let (start, len) = length_prefixed(buf)?;
            Ok((Datum::Bytes(buf[start..start + len].to_vec()), start + len))
        }
        (ValueType::Bytes, ColumnType::String) => {
            let (start, len) = length_prefixed(buf)?;
            let s = std::str::from_utf8(&buf[start..start + len])
                .map_err(|_| EncodingError::InvalidUtf8 { offset: start })?;
            Ok((Datum::String(s.to_string()), start + len))
        }
        _ => Err(EncodingError::TypeMismatch {
            offset: 0,
            value_type: value_type.name(),
            column_type,
        }),
    }
}

/// Returns the length of the payload following a tag of type `value_type`
/// without decoding it.
pub fn skip_value_payload(buf: &[u8], value_type: ValueType) -> EncodingResult<usize> {
    match value_type {
        ValueType::Null | ValueType::NotNull | ValueType::True | ValueType::False => Ok(0),
        ValueType::Int => decode_nonsorting_varint(buf).map(|(_, len)| len),
        ValueType::Float => fixed(buf, 8),
        ValueType::Uuid => fixed(buf, 16),
        ValueType::Decimal
        | ValueType::Bytes
        | ValueType::BytesDesc
        | ValueType::Array
        | ValueType::Json => length_prefixed(buf).map(|(start, len)| start + len),
        ValueType::Time | ValueType::Duration => {
            let count = if value_type == ValueType::Time { 2 } else { 3 };
            let mut pos = 0;
            for _ in 0..count {
                let (_, len) = decode_nonsorting_varint(&buf[pos..]).map_err(|e| e.at(pos))?;
                pos += len;
            }
            Ok(pos)
        }
        ValueType::Unknown | ValueType::IpAddr | ValueType::Sentinel => {
            Err(EncodingError::UnsupportedValueType {
                offset: 0,
                value_type: value_type as u64,
            })
        }
    }
}
