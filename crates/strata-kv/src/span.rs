//! Key spans.

use std::fmt;

use strata_common::types::Key;

/// A half-open key range `[start, end)`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Span {
    /// First key in the span.
    pub start: Key,
    /// First key after the span.
    pub end: Key,
}

impl Span {
    /// Creates a span from start (inclusive) to end (exclusive).
    #[must_use]
    pub fn new(start: Key, end: Key) -> Self {
        Self { start, end }
    }

    /// Creates a span covering every key that starts with `prefix`.
    #[must_use]
    pub fn prefix(prefix: Key) -> Self {
        let end = prefix.prefix_end();
        Self { start: prefix, end }
    }

    /// Creates a span holding exactly one key.
    #[must_use]
    pub fn single(key: Key) -> Self {
        let end = key.next();
        Self { start: key, end }
    }

    /// Returns true if the span's start sorts before its end.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    /// Checks if a key is within the span.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_bytes() && key < self.end.as_bytes()
    }

    /// Returns true if the spans share a key or touch end to start.
    #[must_use]
    pub fn overlaps_or_touches(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span[{}, {})", self.start, self.end)
    }
}

/// Sorts spans and coalesces the ones that overlap or touch.
///
/// Interleaved tables share key space with their ancestors, so a scan over
/// several related tables typically produces the same span more than once.
///
/// # Example
///
/// ```rust
/// use strata_common::types::Key;
/// use strata_kv::{merge_spans, Span};
///
/// let a = Span::new(Key::from_bytes(&[1]), Key::from_bytes(&[3]));
/// let b = Span::new(Key::from_bytes(&[2]), Key::from_bytes(&[5]));
/// let c = Span::new(Key::from_bytes(&[7]), Key::from_bytes(&[8]));
/// let merged = merge_spans(vec![c.clone(), a, b]);
/// assert_eq!(merged, vec![Span::new(Key::from_bytes(&[1]), Key::from_bytes(&[5])), c]);
/// ```
#[must_use]
pub fn merge_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)));
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if last.overlaps_or_touches(&span) => {
                if span.end > last.end {
                    last.end = span.end;
                }
            }
            _ => merged.push(span),
        }
    }
    merged
}
