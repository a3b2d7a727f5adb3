//! Coin store: the read side the search core needs from wherever coin rows live.
//!
//! Two backends ship with the crate: [`SledCoinStore`] for the on-disk store
//! filled by the importer, and [`MemoryCoinStore`] for tests and small data sets.

mod memory;
mod sled_store;

pub use memory::MemoryCoinStore;
pub use sled_store::SledCoinStore;

use crate::record::{CoinId, CoinRecord, Field};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be opened or a read failed. May be transient.
    #[error("coin store unavailable: {0}")]
    Unavailable(#[from] sled::Error),
    #[error("corrupt record '{id}': {source}")]
    Decode {
        id: String,
        #[source]
        source: bincode::Error,
    },
    #[error("cannot encode record '{id}': {source}")]
    Encode {
        id: String,
        #[source]
        source: bincode::Error,
    },
}

impl StoreError {
    pub fn is_transient(&self) -> bool { matches!(self, StoreError::Unavailable(_)) }
}

pub trait CoinStore: Send + Sync {
    /// Every record, in no particular order.
    fn all_records(&self) -> Result<Vec<CoinRecord>, StoreError>;

    fn get(&self, id: &str) -> Result<Option<CoinRecord>, StoreError>;

    /// Records for the given ids. Ids with no record are skipped.
    fn get_by_ids(&self, ids: &HashSet<CoinId>) -> Result<Vec<CoinRecord>, StoreError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(rec) = self.get(id)? {
                out.push(rec);
            }
        }
        Ok(out)
    }

    /// Records whose `field` contains `needle`, ignoring case.
    fn scan_by_field(&self, field: Field, needle: &str) -> Result<Vec<CoinRecord>, StoreError>;
}

/// Case-insensitive containment on one field. `needle` must already be lowercase.
pub(crate) fn field_contains(record: &CoinRecord, field: Field, needle: &str) -> bool {
    record.field(field).to_lowercase().contains(needle)
}
