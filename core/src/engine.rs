use crate::assemble::{assemble, field_scan, Assembled};
use crate::index::{build_from_store, BuildReport, BuildStatus, InvertedIndex, NoDataReason};
use crate::record::{CoinRecord, Field};
use crate::resolve::resolve;
use crate::store::{CoinStore, StoreError};
use crate::tokenizer::query_key;
use parking_lot::RwLock;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

/// Result cap of the primary search path.
pub const PRIMARY_LIMIT: usize = 50;
/// Result cap of the direct field search.
pub const COMPACT_LIMIT: usize = 20;
/// Result cap of the console listing.
pub const CONSOLE_LIMIT: usize = 15;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub default_limit: usize,
    /// Upper bound applied to caller supplied limits.
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_limit: PRIMARY_LIMIT, max_limit: 250 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub records: Vec<CoinRecord>,
    /// Matches before capping.
    pub total: usize,
    /// False when the index was unavailable and fields were scanned directly.
    pub used_index: bool,
    /// True when the coin store failed; `records` is then empty.
    pub degraded: bool,
}

impl SearchOutcome {
    fn found(assembled: Assembled, used_index: bool) -> Self {
        Self { records: assembled.records, total: assembled.total, used_index, degraded: false }
    }

    fn degraded(used_index: bool) -> Self {
        Self { used_index, degraded: true, ..Self::default() }
    }
}

/// Search entry point. Holds the coin store and the currently published index.
///
/// Readers take a cheap `Arc` snapshot of the index and search it without
/// holding any lock, so publishing a rebuilt index never blocks on in-flight
/// queries and the old index is dropped once the last of them finishes.
pub struct SearchEngine {
    store: Arc<dyn CoinStore>,
    index: RwLock<Option<Arc<InvertedIndex>>>,
    config: SearchConfig,
}

impl SearchEngine {
    /// `index` is `None` when no index could be loaded; searches then scan fields directly.
    pub fn new(store: Arc<dyn CoinStore>, index: Option<InvertedIndex>) -> Self {
        Self { store, index: RwLock::new(index.map(Arc::new)), config: SearchConfig::default() }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn snapshot(&self) -> Option<Arc<InvertedIndex>> { self.index.read().clone() }

    /// Swap in a new index. Returns the one it replaced.
    pub fn publish(&self, index: InvertedIndex) -> Option<Arc<InvertedIndex>> {
        let terms = index.len();
        let previous = self.index.write().replace(Arc::new(index));
        tracing::info!(terms, "inverted index published");
        previous
    }

    /// Clamp a caller supplied limit, falling back to `default` when absent.
    pub fn limit_or(&self, requested: Option<usize>, default: usize) -> usize {
        requested.unwrap_or(default).clamp(1, self.config.max_limit)
    }

    pub fn search(&self, query: &str) -> SearchOutcome {
        self.search_with_limit(query, self.config.default_limit)
    }

    /// Resolve `query` against the index, or scan id, name and symbol when there is none.
    pub fn search_with_limit(&self, query: &str, cap: usize) -> SearchOutcome {
        let key = query_key(query);
        let Some(index) = self.snapshot() else {
            return self.scan_fields(&Field::ALL, &key, cap);
        };
        if key.is_empty() {
            return SearchOutcome { used_index: true, ..SearchOutcome::default() };
        }

        let resolution = resolve(&key, &index);
        tracing::debug!(query = %key, kind = ?resolution.kind, candidates = resolution.ids.len(), "query resolved");
        match assemble(self.store.as_ref(), &resolution.ids, cap) {
            Ok(assembled) => SearchOutcome::found(assembled, true),
            Err(err) => {
                tracing::warn!(error = %err, query = %key, "coin store lookup failed");
                SearchOutcome::degraded(true)
            }
        }
    }

    /// Direct containment search on a single field, never using the index.
    pub fn search_field(&self, field: Field, query: &str, cap: usize) -> SearchOutcome {
        self.scan_fields(&[field], &query_key(query), cap)
    }

    fn scan_fields(&self, fields: &[Field], key: &str, cap: usize) -> SearchOutcome {
        if key.is_empty() {
            return SearchOutcome::default();
        }
        match field_scan(self.store.as_ref(), fields, key, cap) {
            Ok(assembled) => SearchOutcome::found(assembled, false),
            Err(err) => {
                tracing::warn!(error = %err, query = %key, "coin store scan failed");
                SearchOutcome::degraded(false)
            }
        }
    }

    /// Detail lookup. `Ok(None)` means the id is unknown; an `Err` means the store
    /// itself failed and the caller should report it as such.
    pub fn get(&self, id: &str) -> Result<Option<CoinRecord>, StoreError> {
        self.store.get(id).map_err(|err| {
            tracing::warn!(error = %err, id, "coin store lookup failed");
            err
        })
    }

    /// Build a fresh index from the store without publishing it.
    pub fn build(&self) -> BuildReport {
        build_from_store(self.store.as_ref())
    }

    /// Build a fresh index and publish it. An unreadable store leaves the current
    /// index in place; an empty store publishes an empty index.
    pub fn rebuild(&self) -> BuildReport {
        match self.rebuild_with(|_| Ok::<(), Infallible>(())) {
            Ok((report, _)) => report,
            Err(never) => match never {},
        }
    }

    /// Like [`rebuild`](Self::rebuild), but runs `persist` on the new index first
    /// and publishes only if it succeeds.
    pub fn rebuild_with<T, E, F>(&self, persist: F) -> Result<(BuildReport, Option<T>), E>
    where
        F: FnOnce(&BuildReport) -> Result<T, E>,
    {
        let report = self.build();
        if let BuildStatus::NoData(NoDataReason::Unreadable(_)) = &report.status {
            tracing::warn!("rebuild skipped publish, keeping current index");
            return Ok((report, None));
        }
        let persisted = persist(&report)?;
        self.publish(report.index.clone());
        Ok((report, Some(persisted)))
    }
}
