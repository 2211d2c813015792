//! Order-preserving key encoding.
//!
//! Each encoding starts with a marker byte that identifies it, and the
//! markers themselves are ordered so that NULL sorts before every value in
//! ascending columns and after every value in descending columns.
//!
//! | marker        | meaning                                   |
//! |---------------|-------------------------------------------|
//! | `0x00`        | NULL (ascending)                          |
//! | `0x01`        | not NULL (ascending)                      |
//! | `0x02..=0x06` | float: NaN, negative, zero, positive, NaN descending |
//! | `0x12`        | byte string (ascending)                   |
//! | `0x13`        | byte string (descending)                  |
//! | `0x80..=0xfd` | integer                                   |
//! | `0xfe`        | not NULL (descending), interleave sentinel |
//! | `0xff`        | NULL (descending)                         |
//!
//! Integers below 110 take a single byte; larger magnitudes take a marker
//! byte that encodes their width followed by big-endian bytes.

use crate::datum::{ColumnType, Datum};
use crate::error::{EncodingError, EncodingResult};

/// Marker for an ascending NULL.
pub const ENCODED_NULL: u8 = 0x00;
/// Marker for an ascending non-NULL placeholder.
pub const ENCODED_NOT_NULL: u8 = 0x01;

const FLOAT_NAN: u8 = ENCODED_NOT_NULL + 1;
const FLOAT_NEG: u8 = FLOAT_NAN + 1;
const FLOAT_ZERO: u8 = FLOAT_NEG + 1;
const FLOAT_POS: u8 = FLOAT_ZERO + 1;
const FLOAT_NAN_DESC: u8 = FLOAT_POS + 1;

const BYTES_MARKER: u8 = 0x12;
const BYTES_DESC_MARKER: u8 = BYTES_MARKER + 1;

const INT_MIN: u8 = 0x80;
const INT_MAX_WIDTH: u8 = 8;
const INT_ZERO: u8 = INT_MIN + INT_MAX_WIDTH;
const INT_MAX: u8 = 0xfd;
const INT_SMALL: u8 = INT_MAX - INT_ZERO - INT_MAX_WIDTH;

/// Marker for a descending non-NULL placeholder.
pub const ENCODED_NOT_NULL_DESC: u8 = 0xfe;
/// Marker for a descending NULL.
pub const ENCODED_NULL_DESC: u8 = 0xff;

/// Separates an ancestor's key columns from an interleaved child's
/// identifiers. It sorts after every ascending column encoding, so child
/// rows follow the parent row they are nested under.
pub const INTERLEAVED_SENTINEL: u8 = ENCODED_NOT_NULL_DESC;

const ESCAPE: u8 = 0x00;
const ESCAPED_TERM: u8 = 0x01;
const ESCAPED_00: u8 = 0xff;

/// Sort direction of an encoded key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Smaller values sort first; NULL sorts first.
    #[default]
    Ascending,
    /// Larger values sort first; NULL sorts last.
    Descending,
}

impl Direction {
    /// Returns the NULL marker byte for this direction.
    #[inline]
    #[must_use]
    pub const fn null_marker(self) -> u8 {
        match self {
            Self::Ascending => ENCODED_NULL,
            Self::Descending => ENCODED_NULL_DESC,
        }
    }
}

#[inline]
fn need(buf: &[u8], start: usize, n: usize) -> EncodingResult<()> {
    if buf.len() < start + n {
        return Err(EncodingError::truncated(buf.len(), start + n - buf.len()));
    }
    Ok(())
}

#[inline]
fn first(buf: &[u8]) -> EncodingResult<u8> {
    buf.first().copied().ok_or_else(|| EncodingError::truncated(0, 1))
}

#[inline]
fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Number of big-endian bytes needed to hold `v`, at least one.
#[inline]
fn byte_len(v: u64) -> usize {
    ((64 - v.leading_zeros() as usize + 7) / 8).max(1)
}

// =============================================================================
// Integers
// =============================================================================

/// Appends the ascending encoding of an unsigned integer.
pub fn encode_uvarint_ascending(buf: &mut Vec<u8>, v: u64) {
    if v <= u64::from(INT_SMALL) {
        buf.push(INT_ZERO + v as u8);
        return;
    }
    let n = byte_len(v);
    buf.push(INT_MAX - INT_MAX_WIDTH + n as u8);
    buf.extend_from_slice(&v.to_be_bytes()[8 - n..]);
}

/// Decodes an ascending unsigned integer, returning it and its length.
pub fn decode_uvarint_ascending(buf: &[u8]) -> EncodingResult<(u64, usize)> {
    let marker = first(buf)?;
    if !(INT_ZERO..=INT_MAX).contains(&marker) {
        return Err(EncodingError::InvalidMarker {
            offset: 0,
            marker,
            expected: "unsigned varint",
        });
    }
    if marker <= INT_ZERO + INT_SMALL {
        return Ok((u64::from(marker - INT_ZERO), 1));
    }
    let n = usize::from(marker - (INT_MAX - INT_MAX_WIDTH));
    need(buf, 1, n)?;
    Ok((read_be(&buf[1..=n]), n + 1))
}

/// Appends the ascending encoding of a signed integer.
pub fn encode_varint_ascending(buf: &mut Vec<u8>, v: i64) {
    if v >= 0 {
        encode_uvarint_ascending(buf, v as u64);
        return;
    }
    // Width n holds every v >= -(2^(8n) - 1).
    let magnitude = !v as u64;
    let mut n = 1usize;
    while n < 8 && magnitude > (1u64 << (8 * n)) - 2 {
        n += 1;
    }
    buf.push(INT_ZERO - n as u8);
    buf.extend_from_slice(&(v as u64).to_be_bytes()[8 - n..]);
}

/// Decodes an ascending signed integer, returning it and its length.
pub fn decode_varint_ascending(buf: &[u8]) -> EncodingResult<(i64, usize)> {
    let marker = first(buf)?;
    if marker >= INT_ZERO {
        let (v, len) = decode_uvarint_ascending(buf)?;
        let v = i64::try_from(v).map_err(|_| EncodingError::VarintOverflow { offset: 0 })?;
        return Ok((v, len));
    }
    if marker < INT_MIN {
        return Err(EncodingError::InvalidMarker {
            offset: 0,
            marker,
            expected: "signed varint",
        });
    }
    let n = usize::from(INT_ZERO - marker);
    need(buf, 1, n)?;
    let raw = read_be(&buf[1..=n]);
    let v = if n == 8 {
        raw as i64
    } else {
        (raw | (u64::MAX << (8 * n))) as i64
    };
    Ok((v, n + 1))
}

/// Appends the descending encoding of a signed integer.
pub fn encode_varint_descending(buf: &mut Vec<u8>, v: i64) {
    encode_varint_ascending(buf, !v);
}

/// Decodes a descending signed integer, returning it and its length.
pub fn decode_varint_descending(buf: &[u8]) -> EncodingResult<(i64, usize)> {
    let (v, len) = decode_varint_ascending(buf)?;
    Ok((!v, len))
}

// =============================================================================
// Byte Strings
// =============================================================================

/// Appends the ascending encoding of a byte string.
pub fn encode_bytes_ascending(buf: &mut Vec<u8>, data: &[u8]) {
    buf.push(BYTES_MARKER);
    let mut chunks = data.split(|&b| b == ESCAPE).peekable();
    while let Some(chunk) = chunks.next() {
        buf.extend_from_slice(chunk);
        if chunks.peek().is_some() {
            buf.extend_from_slice(&[ESCAPE, ESCAPED_00]);
        }
    }
    buf.extend_from_slice(&[ESCAPE, ESCAPED_TERM]);
}

/// Appends the descending encoding of a byte string: the ascending body
/// with every byte inverted.
pub fn encode_bytes_descending(buf: &mut Vec<u8>, data: &[u8]) {
    buf.push(BYTES_DESC_MARKER);
    for &b in data {
        if b == ESCAPE {
            buf.extend_from_slice(&[!ESCAPE, !ESCAPED_00]);
        } else {
            buf.push(!b);
        }
    }
    buf.extend_from_slice(&[!ESCAPE, !ESCAPED_TERM]);
}

/// Walks a byte-string encoding, optionally collecting the unescaped
/// bytes, and returns its encoded length.
fn scan_bytes(buf: &[u8], dir: Direction, mut out: Option<&mut Vec<u8>>) -> EncodingResult<usize> {
    let (marker, escape, term, escaped_00) = match dir {
        Direction::Ascending => (BYTES_MARKER, ESCAPE, ESCAPED_TERM, ESCAPED_00),
        Direction::Descending => (BYTES_DESC_MARKER, !ESCAPE, !ESCAPED_TERM, !ESCAPED_00),
    };
    let found = first(buf)?;
    if found != marker {
        return Err(EncodingError::InvalidMarker {
            offset: 0,
            marker: found,
            expected: "byte string",
        });
    }

    let mut pos = 1;
    loop {
        let rest = &buf[pos..];
        let Some(run) = rest.iter().position(|&b| b == escape) else {
            return Err(EncodingError::truncated(buf.len(), 2));
        };
        if let Some(out) = out.as_deref_mut() {
            match dir {
                Direction::Ascending => out.extend_from_slice(&rest[..run]),
                Direction::Descending => out.extend(rest[..run].iter().map(|b| !b)),
            }
        }
        let escape_at = pos + run;
        let next = *buf
            .get(escape_at + 1)
            .ok_or_else(|| EncodingError::truncated(buf.len(), 1))?;
        if next == term {
            return Ok(escape_at + 2);
        }
        if next != escaped_00 {
            return Err(EncodingError::InvalidEscape {
                offset: escape_at,
                byte: next,
            });
        }
        if let Some(out) = out.as_deref_mut() {
            out.push(0x00);
        }
        pos = escape_at + 2;
    }
}

/// Decodes an ascending byte string, returning it and its length.
pub fn decode_bytes_ascending(buf: &[u8]) -> EncodingResult<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let len = scan_bytes(buf, Direction::Ascending, Some(&mut out))?;
    Ok((out, len))
}

/// Decodes a descending byte string, returning it and its length.
pub fn decode_bytes_descending(buf: &[u8]) -> EncodingResult<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let len = scan_bytes(buf, Direction::Descending, Some(&mut out))?;
    Ok((out, len))
}

// =============================================================================
// Floats
// =============================================================================

/// Appends the ascending encoding of a float. NaN sorts first and both
/// zeros encode identically.
pub fn encode_float_ascending(buf: &mut Vec<u8>, f: f64) {
    if f.is_nan() {
        buf.push(FLOAT_NAN);
        return;
    }
    if f == 0.0 {
        buf.push(FLOAT_ZERO);
        return;
    }
    let bits = f.to_bits();
    if bits & (1 << 63) != 0 {
        buf.push(FLOAT_NEG);
        buf.extend_from_slice(&(!bits).to_be_bytes());
    } else {
        buf.push(FLOAT_POS);
        buf.extend_from_slice(&bits.to_be_bytes());
    }
}

/// Appends the descending encoding of a float. NaN sorts last.
pub fn encode_float_descending(buf: &mut Vec<u8>, f: f64) {
    if f.is_nan() {
        buf.push(FLOAT_NAN_DESC);
    } else {
        encode_float_ascending(buf, -f);
    }
}

/// Decodes an ascending float, returning it and its length.
pub fn decode_float_ascending(buf: &[u8]) -> EncodingResult<(f64, usize)> {
    match first(buf)? {
        FLOAT_NAN => Ok((f64::NAN, 1)),
        FLOAT_ZERO => Ok((0.0, 1)),
        FLOAT_NEG => {
            need(buf, 1, 8)?;
            Ok((f64::from_bits(!read_be(&buf[1..9])), 9))
        }
        FLOAT_POS => {
            need(buf, 1, 8)?;
            Ok((f64::from_bits(read_be(&buf[1..9])), 9))
        }
        marker => Err(EncodingError::InvalidMarker {
            offset: 0,
            marker,
            expected: "float",
        }),
    }
}

/// Decodes a descending float, returning it and its length.
pub fn decode_float_descending(buf: &[u8]) -> EncodingResult<(f64, usize)> {
    if first(buf)? == FLOAT_NAN_DESC {
        return Ok((f64::NAN, 1));
    }
    let (f, len) = decode_float_ascending(buf)?;
    Ok((-f, len))
}

// =============================================================================
// Datums
// =============================================================================

/// Appends the key encoding of a datum in the given direction.
///
/// Booleans encode as the integers 0 and 1.
pub fn encode_key_datum(buf: &mut Vec<u8>, datum: &Datum, dir: Direction) {
    match (datum, dir) {
        (Datum::Null, _) => buf.push(dir.null_marker()),
        (Datum::Bool(v), Direction::Ascending) => encode_varint_ascending(buf, i64::from(*v)),
        (Datum::Bool(v), Direction::Descending) => encode_varint_descending(buf, i64::from(*v)),
        (Datum::Int(v), Direction::Ascending) => encode_varint_ascending(buf, *v),
        (Datum::Int(v), Direction::Descending) => encode_varint_descending(buf, *v),
        (Datum::Float(v), Direction::Ascending) => encode_float_ascending(buf, *v),
        (Datum::Float(v), Direction::Descending) => encode_float_descending(buf, *v),
        (Datum::String(v), Direction::Ascending) => encode_bytes_ascending(buf, v.as_bytes()),
        (Datum::String(v), Direction::Descending) => encode_bytes_descending(buf, v.as_bytes()),
        (Datum::Bytes(v), Direction::Ascending) => encode_bytes_ascending(buf, v),
        (Datum::Bytes(v), Direction::Descending) => encode_bytes_descending(buf, v),
    }
}

/// Decodes one key column of type `ty`, returning the datum and its length.
pub fn decode_key_datum(buf: &[u8], ty: ColumnType, dir: Direction) -> EncodingResult<(Datum, usize)> {
    if first(buf)? == dir.null_marker() {
        return Ok((Datum::Null, 1));
    }
    let decode_int = match dir {
        Direction::Ascending => decode_varint_ascending,
        Direction::Descending => decode_varint_descending,
    };
    match ty {
        ColumnType::Int => {
            let (v, len) = decode_int(buf)?;
            Ok((Datum::Int(v), len))
        }
        ColumnType::Bool => {
            let (v, len) = decode_int(buf)?;
            Ok((Datum::Bool(v != 0), len))
        }
        ColumnType::Float => {
            let (v, len) = match dir {
                Direction::Ascending => decode_float_ascending(buf)?,
                Direction::Descending => decode_float_descending(buf)?,
            };
            Ok((Datum::Float(v), len))
        }
        ColumnType::Bytes => {
            let mut out = Vec::new();
            let len = scan_bytes(buf, dir, Some(&mut out))?;
            Ok((Datum::Bytes(out), len))
        }
        ColumnType::String => {
            let mut out = Vec::new();
            let len = scan_bytes(buf, dir, Some(&mut out))?;
            let s = String::from_utf8(out).map_err(|_| EncodingError::InvalidUtf8 { offset: 0 })?;
            Ok((Datum::String(s), len))
        }
    }
}

/// Returns the length of the key encoding at the start of `buf` without
/// decoding it.
pub fn peek_length(buf: &[u8]) -> EncodingResult<usize> {
    let marker = first(buf)?;
    match marker {
        ENCODED_NULL | ENCODED_NOT_NULL | ENCODED_NOT_NULL_DESC | ENCODED_NULL_DESC => Ok(1),
        FLOAT_NAN | FLOAT_ZERO | FLOAT_NAN_DESC => Ok(1),
        FLOAT_NEG | FLOAT_POS => {
            need(buf, 1, 8)?;
            Ok(9)
        }
        BYTES_MARKER => scan_bytes(buf, Direction::Ascending, None),
        BYTES_DESC_MARKER => scan_bytes(buf, Direction::Descending, None),
        INT_MIN..=INT_MAX => {
            let n = if marker < INT_ZERO {
                usize::from(INT_ZERO - marker)
            } else if marker <= INT_ZERO + INT_SMALL {
                0
            } else {
                usize::from(marker - (INT_MAX - INT_MAX_WIDTH))
            };
            need(buf, 1, n)?;
            Ok(n + 1)
        }
        _ => Err(EncodingError::InvalidMarker {
            offset: 0,
            marker,
            expected: "key encoding",
        }),
    }
}
