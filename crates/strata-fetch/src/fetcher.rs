//! The row fetcher.
//!
//! A [`RowFetcher`] pulls batches of key-value pairs from a
//! [`KvSource`] and assembles them into rows of the registered entries.
//! Pairs of one primary index row (one per column family) arrive adjacent
//! in scan order, so a row stays open while successive keys share its
//! encoded key columns and is emitted when a key with a different prefix
//! arrives or the source runs dry.
//!
//! Rows are handed out as [`FetchedRow`] views borrowing the fetcher, which
//! keeps their buffers valid only until the next call.

use std::sync::Arc;

use strata_common::config::FetchConfig;
use strata_common::types::ColumnId;
use strata_encoding::key::INTERLEAVED_SENTINEL;
use strata_encoding::Datum;
use strata_kv::{KvPair, KvSource, KvStream, ScanDirection, ScanRequest, Span};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::descriptor::{IndexDescriptor, TableDescriptor};
use crate::error::{DecodeError, FetchError, FetchResult};
use crate::key_decoder::{decode_index_key, KeyLayout};
use crate::matcher::KeyMatch;
use crate::pool::{DatumPool, PooledRow};
use crate::registry::{EntryId, IndexKind, Registry, ScanEntry};
use crate::value_decoder::decode_value;

// =============================================================================
// Options
// =============================================================================

/// Per-scan options.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Scan each span in descending key order.
    pub reverse: bool,
    /// Pairs per source batch; `None` leaves it to the source.
    pub batch_rows: Option<usize>,
    /// Bytes per source batch; `None` leaves it to the source.
    pub batch_bytes: Option<usize>,
    /// Idle row buffers kept for reuse.
    pub pool_idle_buffers: usize,
    /// Log every fetched pair at TRACE level.
    pub trace_kv: bool,
    /// Token that aborts the scan at its next batch request.
    pub cancellation: Option<CancellationToken>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl ScanOptions {
    /// Derives options from a fetch configuration.
    #[must_use]
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            reverse: false,
            batch_rows: config.batch_rows_limit(),
            batch_bytes: config.batch_bytes_limit(),
            pool_idle_buffers: config.pool_idle_buffers,
            trace_kv: config.trace_kv,
            cancellation: None,
        }
    }

    /// Sets the scan direction.
    #[must_use]
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Sets the pairs-per-batch limit.
    #[must_use]
    pub fn with_batch_rows(mut self, limit: Option<usize>) -> Self {
        self.batch_rows = limit;
        self
    }

    /// Sets the bytes-per-batch limit.
    #[must_use]
    pub fn with_batch_bytes(mut self, limit: Option<usize>) -> Self {
        self.batch_bytes = limit;
        self
    }

    /// Sets the number of idle row buffers kept.
    #[must_use]
    pub fn with_pool_idle_buffers(mut self, buffers: usize) -> Self {
        self.pool_idle_buffers = buffers;
        self
    }

    /// Enables per-pair tracing.
    #[must_use]
    pub fn with_trace_kv(mut self, trace_kv: bool) -> Self {
        self.trace_kv = trace_kv;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

// =============================================================================
// Rows
// =============================================================================

/// A decoded row, valid until the fetcher's next call.
///
/// Datums are in the owning table's column order; unprojected columns are
/// NULL.
#[derive(Debug, Clone, Copy)]
pub struct FetchedRow<'a> {
    entry: &'a ScanEntry,
    datums: &'a [Datum],
}

impl<'a> FetchedRow<'a> {
    /// Returns the owning entry's id.
    #[inline]
    #[must_use]
    pub fn entry_id(&self) -> EntryId {
        self.entry.id()
    }

    /// Returns the owning entry.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> &'a ScanEntry {
        self.entry
    }

    /// Returns the owning table.
    #[inline]
    #[must_use]
    pub fn table(&self) -> &'a TableDescriptor {
        self.entry.table()
    }

    /// Returns the scanned index.
    #[inline]
    #[must_use]
    pub fn index(&self) -> &'a IndexDescriptor {
        self.entry.index()
    }

    /// Returns the datums.
    #[inline]
    #[must_use]
    pub fn datums(&self) -> &'a [Datum] {
        self.datums
    }

    /// Returns a column's datum by id.
    #[must_use]
    pub fn get(&self, column: ColumnId) -> Option<&'a Datum> {
        self.entry
            .column_ordinal(column)
            .and_then(|ordinal| self.datums.get(ordinal))
    }

    /// Copies the row out of the fetcher's buffers.
    #[must_use]
    pub fn to_owned_row(&self) -> OwnedRow {
        OwnedRow {
            entry: self.entry.id(),
            datums: self.datums.to_vec(),
        }
    }
}

/// A decoded row owning its datums.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedRow {
    /// Owning entry.
    pub entry: EntryId,
    /// Datums in column order.
    pub datums: Vec<Datum>,
}

/// Counters for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetcherStats {
    /// Batches received from the source.
    pub batches_fetched: u64,
    /// Pairs received from the source.
    pub kvs_fetched: u64,
    /// Key and value bytes received from the source.
    pub bytes_fetched: u64,
    /// Rows handed out.
    pub rows_emitted: u64,
    /// Pairs of unregistered tables or indexes interleaved in the spans.
    pub keys_skipped: u64,
}

// =============================================================================
// Fetcher
// =============================================================================

/// A row being assembled from one or more pairs.
#[derive(Debug)]
struct OpenRow {
    entry: EntryId,
    /// Encoded key columns every pair of the row starts with. Empty for
    /// secondary index rows, which are always a single pair.
    prefix: Vec<u8>,
    datums: PooledRow,
}

/// A row waiting to be viewed by the caller.
#[derive(Debug)]
struct CompletedRow {
    entry: EntryId,
    datums: PooledRow,
}

#[derive(Debug)]
enum RowState {
    Idle,
    Accumulating(OpenRow),
    Exhausted,
    Failed,
}

/// Assembles rows of the registered entries from a key-value scan.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use strata_encoding::{ColumnType, Datum, Direction};
/// use strata_fetch::{
///     ColumnDescriptor, IndexDescriptor, Projection, Registry, RowEncoder, RowFetcher,
///     ScanEntryArgs, ScanOptions, TableDescriptor,
/// };
/// use strata_kv::MemKvStore;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let table = Arc::new(
///     TableDescriptor::new(51, "kv")
///         .with_column(ColumnDescriptor::not_null(1, "k", ColumnType::Int))
///         .with_column(ColumnDescriptor::nullable(2, "v", ColumnType::String))
///         .with_primary_index(IndexDescriptor::primary().with_column(1, Direction::Ascending))
///         .build()
///         .unwrap(),
/// );
/// let store = MemKvStore::new();
/// let encoder = RowEncoder::new(&table);
/// for k in 0..3 {
///     store.put_all(encoder.encode_row(&[Datum::Int(k), Datum::from("v")]).unwrap());
/// }
///
/// let registry = Registry::build(vec![ScanEntryArgs::primary(table.clone(), Projection::all(&table))]).unwrap();
/// let spans = vec![table.primary_span()];
/// let mut fetcher = RowFetcher::start_scan(Arc::new(registry), &store, spans, ScanOptions::default()).unwrap();
///
/// let mut count = 0;
/// while let Some(row) = fetcher.next_row().await.unwrap() {
///     assert_eq!(row.datums()[0], Datum::Int(count));
///     count += 1;
/// }
/// assert_eq!(count, 3);
/// # });
/// ```
pub struct RowFetcher {
    registry: Arc<Registry>,
    stream: Box<dyn KvStream>,
    cancel: Option<CancellationToken>,
    trace_kv: bool,
    pool: DatumPool,
    batch: std::vec::IntoIter<KvPair>,
    state: RowState,
    emitted: Option<CompletedRow>,
    stats: FetcherStats,
}

impl std::fmt::Debug for RowFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowFetcher")
            .field("entries", &self.registry.len())
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl RowFetcher {
    /// Opens a scan of `spans` on `source`.
    ///
    /// Spans are visited in the order given.
    pub fn start_scan(
        registry: Arc<Registry>,
        source: &dyn KvSource,
        spans: Vec<Span>,
        options: ScanOptions,
    ) -> FetchResult<Self> {
        let direction = if options.reverse {
            ScanDirection::Reverse
        } else {
            ScanDirection::Forward
        };
        debug!(
            entries = registry.len(),
            spans = spans.len(),
            reverse = options.reverse,
            batch_rows = ?options.batch_rows,
            "starting scan"
        );

        let request = ScanRequest::new(spans)
            .with_direction(direction)
            .with_batch_rows(options.batch_rows)
            .with_batch_bytes(options.batch_bytes);
        let stream = source.open(request)?;
        let pool = DatumPool::new(registry.max_width(), options.pool_idle_buffers);

        Ok(Self {
            registry,
            stream,
            cancel: options.cancellation,
            trace_kv: options.trace_kv,
            pool,
            batch: Vec::new().into_iter(),
            state: RowState::Idle,
            emitted: None,
            stats: FetcherStats::default(),
        })
    }

    /// Returns the next row, or `None` once the scan is exhausted.
    ///
    /// After an error every call fails with [`FetchError::Poisoned`].
    pub async fn next_row(&mut self) -> FetchResult<Option<FetchedRow<'_>>> {
        // The previous row's buffer goes back to the pool.
        self.emitted = None;
        match self.state {
            RowState::Exhausted => return Ok(None),
            RowState::Failed => return Err(FetchError::Poisoned),
            RowState::Idle | RowState::Accumulating(_) => {}
        }
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(self.fail(FetchError::Cancelled));
        }

        while self.emitted.is_none() {
            match self.next_pair().await {
                Ok(Some(pair)) => {
                    if let Err(err) = self.process(&pair) {
                        return Err(self.fail(err.into()));
                    }
                }
                Ok(None) => {
                    self.finish();
                    break;
                }
                Err(err) => return Err(self.fail(err)),
            }
        }

        Ok(self.emitted.as_ref().map(|row| FetchedRow {
            entry: self.registry.entry(row.entry),
            datums: row.datums.as_slice(),
        }))
    }

    /// Returns the next row as an owned copy.
    pub async fn next_row_owned(&mut self) -> FetchResult<Option<OwnedRow>> {
        Ok(self.next_row().await?.map(|row| row.to_owned_row()))
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Returns the scan counters.
    #[must_use]
    pub fn stats(&self) -> FetcherStats {
        self.stats
    }

    /// Returns the row buffer pool.
    #[must_use]
    pub fn pool(&self) -> &DatumPool {
        &self.pool
    }

    async fn next_pair(&mut self) -> FetchResult<Option<KvPair>> {
        loop {
            if let Some(pair) = self.batch.next() {
                return Ok(Some(pair));
            }

            let batch = match &self.cancel {
                Some(token) => tokio::select! {
                    biased;
                    () = token.cancelled() => return Err(FetchError::Cancelled),
                    batch = self.stream.next_batch() => batch?,
                },
                None => self.stream.next_batch().await?,
            };
            let Some(batch) = batch else {
                return Ok(None);
            };

            self.stats.batches_fetched += 1;
            self.stats.kvs_fetched += batch.len() as u64;
            self.stats.bytes_fetched += batch.iter().map(|p| p.size() as u64).sum::<u64>();
            self.batch = batch.into_iter();
        }
    }

    fn process(&mut self, pair: &KvPair) -> Result<(), DecodeError> {
        let Self {
            registry,
            pool,
            state,
            emitted,
            stats,
            trace_kv,
            ..
        } = self;

        if *trace_kv {
            trace!(key = %pair.key, value_len = pair.value.len(), "fetched pair");
        }

        let entry_id = match registry.match_key(&pair.key)? {
            KeyMatch::Entry(id) => id,
            KeyMatch::Foreign => {
                stats.keys_skipped += 1;
                return Ok(());
            }
        };
        let entry = registry.entry(entry_id);
        let key = pair.key.as_bytes();

        if let RowState::Accumulating(open) = state {
            if open.entry == entry_id && entry.kind() == IndexKind::Primary && key.starts_with(&open.prefix) {
                let cols_end = open.prefix.len();
                if key.get(cols_end) == Some(&INTERLEAVED_SENTINEL) {
                    stats.keys_skipped += 1;
                    return Ok(());
                }
                return decode_value(entry, &pair.key, cols_end, false, pair.value.as_bytes(), &mut open.datums);
            }
        }

        let mut datums = pool.checkout(entry.table().columns.len());
        let KeyLayout::Row { cols_end, has_null } = decode_index_key(entry, &pair.key, &mut datums)? else {
            stats.keys_skipped += 1;
            return Ok(());
        };
        decode_value(entry, &pair.key, cols_end, has_null, pair.value.as_bytes(), &mut datums)?;

        let mut prefix = match std::mem::replace(state, RowState::Idle) {
            RowState::Accumulating(done) => {
                *emitted = Some(CompletedRow {
                    entry: done.entry,
                    datums: done.datums,
                });
                stats.rows_emitted += 1;
                done.prefix
            }
            _ => Vec::new(),
        };
        // Only primary rows span several pairs; secondary rows keep no prefix.
        prefix.clear();
        if entry.kind() == IndexKind::Primary {
            prefix.extend_from_slice(&key[..cols_end]);
        }
        *state = RowState::Accumulating(OpenRow {
            entry: entry_id,
            prefix,
            datums,
        });
        Ok(())
    }

    fn finish(&mut self) {
        if let RowState::Accumulating(done) = std::mem::replace(&mut self.state, RowState::Exhausted) {
            self.emitted = Some(CompletedRow {
                entry: done.entry,
                datums: done.datums,
            });
            self.stats.rows_emitted += 1;
        }
        debug!(
            batches = self.stats.batches_fetched,
            kvs = self.stats.kvs_fetched,
            bytes = self.stats.bytes_fetched,
            rows = self.stats.rows_emitted,
            skipped = self.stats.keys_skipped,
            "scan finished"
        );
    }

    fn fail(&mut self, err: FetchError) -> FetchError {
        self.state = RowState::Failed;
        self.emitted = None;
        self.batch = Vec::new().into_iter();
        match &err {
            FetchError::Cancelled => debug!(rows = self.stats.rows_emitted, "scan cancelled"),
            err => warn!(error = %err, rows = self.stats.rows_emitted, "scan failed"),
        }
        err
    }
}
