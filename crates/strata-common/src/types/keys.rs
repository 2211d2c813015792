//! Key and value types for StrataDB.
//!
//! Keys are order-preserving encodings of index entries; values carry the
//! encoded column payloads. Both wrap `Bytes` so batches can be sliced and
//! shared without copying.

use bytes::Bytes;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

/// Hex output is cut off after this many bytes.
const HEX_LIMIT: usize = 64;

/// An encoded key.
///
/// Keys compare byte-lexicographically, which is the order the key-value
/// source iterates them in.
///
/// # Example
///
/// ```rust
/// use strata_common::types::Key;
///
/// let key = Key::from_bytes(&[0xbb, 0x89, 0x12]);
/// assert!(key.starts_with(&[0xbb]));
/// assert_eq!(key.prefix_end().as_bytes(), &[0xbb, 0x89, 0x13]);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Key(Bytes);

impl Key {
    /// The zero-length key, sorting before every other key.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Copies `bytes` into a new key.
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }

    /// Takes ownership of an encoded buffer.
    #[inline]
    #[must_use]
    pub fn from_vec(buf: Vec<u8>) -> Self {
        Self(Bytes::from(buf))
    }

    /// Encoded length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the encoding has no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encoded bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the encoding begins with `prefix`.
    #[inline]
    #[must_use]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }

    /// Returns the immediate successor: the smallest key sorting after this
    /// one, formed by appending a zero byte.
    #[must_use]
    pub fn next(&self) -> Self {
        let mut buf = Vec::with_capacity(self.0.len() + 1);
        buf.extend_from_slice(&self.0);
        buf.push(0x00);
        Self::from_vec(buf)
    }

    /// Returns the first key that does not have this key as a prefix.
    ///
    /// Used as the exclusive end of a span covering every key with this
    /// prefix. A key made only of `0xff` bytes has no such end; it is
    /// returned unchanged.
    #[must_use]
    pub fn prefix_end(&self) -> Self {
        match self.0.iter().rposition(|&b| b != 0xff) {
            Some(last) => {
                let mut buf = self.0[..=last].to_vec();
                buf[last] += 1;
                Self::from_vec(buf)
            }
            None => self.clone(),
        }
    }
}

impl Deref for Key {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Key {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Ord for Key {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl PartialOrd for Key {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lowercase hex, bounded so error messages stay short.
fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    bytes
        .iter()
        .take(HEX_LIMIT)
        .try_for_each(|b| write!(f, "{b:02x}"))?;
    if bytes.len() > HEX_LIMIT {
        f.write_str("...")?;
    }
    Ok(())
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key(0x")?;
        write_hex(f, &self.0)?;
        f.write_str(")")
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        write_hex(f, &self.0)
    }
}

impl From<&[u8]> for Key {
    #[inline]
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Key {
    #[inline]
    fn from(buf: Vec<u8>) -> Self {
        Self::from_vec(buf)
    }
}

/// An encoded value.
///
/// For primary index entries the value holds one column family's tuple; for
/// secondary index entries it holds extra key columns and STORING columns.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Value(Bytes);

impl Value {
    /// A zero-length payload, as written for a family with no non-NULL columns.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Copies `bytes` into a new value.
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }

    /// Takes ownership of an encoded buffer.
    #[inline]
    #[must_use]
    pub fn from_vec(buf: Vec<u8>) -> Self {
        Self(Bytes::from(buf))
    }

    /// Encoded length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the encoding has no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encoded bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Value {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Value {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Value(0x")?;
        write_hex(f, &self.0)?;
        f.write_str(")")
    }
}

impl From<&[u8]> for Value {
    #[inline]
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Value {
    #[inline]
    fn from(buf: Vec<u8>) -> Self {
        Self::from_vec(buf)
    }
}
