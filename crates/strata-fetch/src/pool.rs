//! Reusable row buffers.
//!
//! A scan decodes every row into a `Vec<Datum>` checked out from a
//! [`DatumPool`]. The [`PooledRow`] guard hands the buffer back when it is
//! dropped, whichever way the row goes out of scope: emitted and replaced,
//! abandoned on a decode error, or dropped with a cancelled fetcher. The
//! pool keeps a bounded number of idle buffers and counts how many it ever
//! allocated.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use strata_encoding::Datum;

#[derive(Debug)]
struct PoolInner {
    free: Mutex<Vec<Vec<Datum>>>,
    /// Capacity reserved for new buffers.
    width: usize,
    max_idle: usize,
    allocations: AtomicUsize,
}

/// A bounded pool of row buffers.
///
/// # Example
///
/// ```rust
/// use strata_encoding::Datum;
/// use strata_fetch::DatumPool;
///
/// let pool = DatumPool::new(4, 2);
/// {
///     let mut row = pool.checkout(3);
///     row[0] = Datum::Int(1);
/// }
/// let row = pool.checkout(3);
/// assert!(row.iter().all(Datum::is_null));
/// assert_eq!(pool.allocations(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DatumPool {
    inner: Arc<PoolInner>,
}

impl DatumPool {
    /// Creates a pool whose buffers hold `width` datums and which keeps at
    /// most `max_idle` idle buffers.
    #[must_use]
    pub fn new(width: usize, max_idle: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(Vec::with_capacity(max_idle)),
                width,
                max_idle,
                allocations: AtomicUsize::new(0),
            }),
        }
    }

    /// Checks out a buffer of `len` NULL datums.
    #[must_use]
    pub fn checkout(&self, len: usize) -> PooledRow {
        let recycled = self.inner.free.lock().pop();
        let mut datums = recycled.unwrap_or_else(|| {
            self.inner.allocations.fetch_add(1, Ordering::Relaxed);
            Vec::with_capacity(self.inner.width.max(len))
        });
        datums.resize(len, Datum::Null);
        PooledRow {
            datums,
            pool: Arc::clone(&self.inner),
        }
    }

    /// Number of buffers allocated over the pool's lifetime.
    #[must_use]
    pub fn allocations(&self) -> usize {
        self.inner.allocations.load(Ordering::Relaxed)
    }

    /// Number of idle buffers.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.inner.free.lock().len()
    }
}

/// A row buffer on loan from a [`DatumPool`].
#[derive(Debug)]
pub struct PooledRow {
    datums: Vec<Datum>,
    pool: Arc<PoolInner>,
}

impl PooledRow {
    /// Returns the datums.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Datum] {
        &self.datums
    }

    /// Returns the datums mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Datum] {
        &mut self.datums
    }
}

impl Deref for PooledRow {
    type Target = [Datum];

    fn deref(&self) -> &[Datum] {
        &self.datums
    }
}

impl DerefMut for PooledRow {
    fn deref_mut(&mut self) -> &mut [Datum] {
        &mut self.datums
    }
}

impl Drop for PooledRow {
    fn drop(&mut self) {
        let mut datums = std::mem::take(&mut self.datums);
        datums.clear();
        let mut free = self.pool.free.lock();
        if free.len() < self.pool.max_idle {
            free.push(datums);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_resets_buffer() {
        let pool = DatumPool::new(3, 1);
        let mut row = pool.checkout(3);
        row[1] = Datum::from("x");
        drop(row);

        let row = pool.checkout(2);
        assert_eq!(row.as_slice(), &[Datum::Null, Datum::Null]);
        assert_eq!(pool.allocations(), 1);
    }

    #[test]
    fn test_idle_bound() {
        let pool = DatumPool::new(2, 2);
        let rows: Vec<PooledRow> = (0..5).map(|_| pool.checkout(2)).collect();
        assert_eq!(pool.allocations(), 5);
        assert_eq!(pool.idle(), 0);
        drop(rows);
        assert_eq!(pool.idle(), 2);

        let _a = pool.checkout(2);
        let _b = pool.checkout(2);
        let _c = pool.checkout(2);
        assert_eq!(pool.allocations(), 6);
    }

    #[test]
    fn test_steady_state_reuses_one_buffer() {
        let pool = DatumPool::new(4, 1);
        let mut previous = pool.checkout(4);
        for i in 0..1000 {
            let mut next = pool.checkout(4);
            next[0] = Datum::Int(i);
            previous = next;
        }
        drop(previous);
        assert!(pool.allocations() <= 2);
    }

    #[test]
    fn test_pool_clone_shares_buffers() {
        let pool = DatumPool::new(1, 4);
        let other = pool.clone();
        drop(pool.checkout(1));
        assert_eq!(other.idle(), 1);
    }
}
