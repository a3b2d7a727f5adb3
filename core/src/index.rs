use crate::record::{CoinId, CoinRecord};
use crate::store::{CoinStore, StoreError};
use crate::tokenizer::{normalize, symbol_term};
use serde::{Deserialize, Serialize};
use std::collections::hash_map;
use std::collections::{HashMap, HashSet};

/// Term -> set of coin ids containing it. Built once and never mutated while serving.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: HashMap<String, HashSet<CoinId>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, term: impl Into<String>, id: impl Into<CoinId>) {
        self.postings.entry(term.into()).or_default().insert(id.into());
    }

    pub fn get(&self, term: &str) -> Option<&HashSet<CoinId>> { self.postings.get(term) }

    pub fn contains_term(&self, term: &str) -> bool { self.postings.contains_key(term) }

    pub fn terms(&self) -> impl Iterator<Item = &str> { self.postings.keys().map(String::as_str) }

    pub fn iter(&self) -> hash_map::Iter<'_, String, HashSet<CoinId>> { self.postings.iter() }

    /// Number of distinct terms.
    pub fn len(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }

    /// Sum of all posting set sizes.
    pub fn num_postings(&self) -> usize { self.postings.values().map(HashSet::len).sum() }
}

impl From<HashMap<String, HashSet<CoinId>>> for InvertedIndex {
    fn from(postings: HashMap<String, HashSet<CoinId>>) -> Self { Self { postings } }
}

/// All index terms contributed by one record: tokens of name, symbol and id plus
/// the raw lowercase symbol.
pub fn terms_for(record: &CoinRecord) -> HashSet<String> {
    let mut terms = normalize(&record.name);
    terms.extend(normalize(&record.symbol));
    terms.extend(normalize(&record.id));
    if let Some(sym) = symbol_term(&record.symbol) {
        terms.insert(sym);
    }
    terms
}

#[derive(Default)]
pub struct IndexBuilder {
    index: InvertedIndex,
    records: usize,
}

impl IndexBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, record: &CoinRecord) {
        for term in terms_for(record) {
            self.index.insert(term, record.id.clone());
        }
        self.records += 1;
    }

    pub fn records(&self) -> usize { self.records }

    pub fn finish(self) -> InvertedIndex { self.index }
}

/// Build an index from an in-memory record set.
pub fn build<'a, I>(records: I) -> InvertedIndex
where
    I: IntoIterator<Item = &'a CoinRecord>,
{
    let mut builder = IndexBuilder::new();
    for record in records {
        builder.add(record);
    }
    builder.finish()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub records: usize,
    pub terms: usize,
    pub postings: usize,
}

impl BuildStats {
    pub fn of(index: &InvertedIndex, records: usize) -> Self {
        Self { records, terms: index.len(), postings: index.num_postings() }
    }
}

#[derive(Debug)]
pub enum BuildStatus {
    Built,
    /// Nothing to index. The index is empty but still valid.
    NoData(NoDataReason),
}

#[derive(Debug)]
pub enum NoDataReason {
    EmptySource,
    Unreadable(StoreError),
}

#[derive(Debug)]
pub struct BuildReport {
    pub index: InvertedIndex,
    pub stats: BuildStats,
    pub status: BuildStatus,
}

impl BuildReport {
    pub fn has_data(&self) -> bool { matches!(self.status, BuildStatus::Built) }
}

/// Scan every record in the store and build a fresh index. A store that is empty
/// or cannot be read gives an empty index with a `NoData` status, not an error.
pub fn build_from_store(store: &dyn CoinStore) -> BuildReport {
    let records = match store.all_records() {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(error = %err, "coin store unreadable, building empty index");
            return BuildReport {
                index: InvertedIndex::new(),
                stats: BuildStats::default(),
                status: BuildStatus::NoData(NoDataReason::Unreadable(err)),
            };
        }
    };
    if records.is_empty() {
        tracing::warn!("coin store is empty, building empty index");
        return BuildReport {
            index: InvertedIndex::new(),
            stats: BuildStats::default(),
            status: BuildStatus::NoData(NoDataReason::EmptySource),
        };
    }

    let index = build(&records);
    let stats = BuildStats::of(&index, records.len());
    tracing::info!(records = stats.records, terms = stats.terms, postings = stats.postings, "index built");
    BuildReport { index, stats, status: BuildStatus::Built }
}
