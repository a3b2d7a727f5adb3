use crate::record::{CoinId, CoinRecord, Field};
use crate::store::{CoinStore, StoreError};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Ordered, capped records plus the number found before capping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembled {
    pub records: Vec<CoinRecord>,
    pub total: usize,
}

fn ranking_key(record: &CoinRecord) -> Option<f64> {
    record.market_cap.filter(|v| !v.is_nan())
}

/// Market cap descending, missing values after every present one, then id.
pub fn by_market_cap(a: &CoinRecord, b: &CoinRecord) -> Ordering {
    let primary = match (ranking_key(a), ranking_key(b)) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

/// Sort and truncate to `cap`, keeping the untruncated count.
pub fn rank_and_cap(mut records: Vec<CoinRecord>, cap: usize) -> Assembled {
    records.sort_by(by_market_cap);
    let total = records.len();
    records.truncate(cap);
    Assembled { records, total }
}

/// Fetch the records behind `ids` in one batch and rank them.
pub fn assemble(store: &dyn CoinStore, ids: &HashSet<CoinId>, cap: usize) -> Result<Assembled, StoreError> {
    if ids.is_empty() {
        return Ok(Assembled::default());
    }
    let records = store.get_by_ids(ids)?;
    Ok(rank_and_cap(records, cap))
}

/// Direct containment scan over `fields`, bypassing the index. A record matching
/// on several fields is returned once.
pub fn field_scan(store: &dyn CoinStore, fields: &[Field], needle: &str, cap: usize) -> Result<Assembled, StoreError> {
    let mut seen: HashMap<CoinId, CoinRecord> = HashMap::new();
    for &field in fields {
        for rec in store.scan_by_field(field, needle)? {
            seen.entry(rec.id.clone()).or_insert(rec);
        }
    }
    Ok(rank_and_cap(seen.into_values().collect(), cap))
}
