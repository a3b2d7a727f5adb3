use super::{field_contains, CoinStore, StoreError};
use crate::record::{CoinId, CoinRecord, Field};
use std::collections::HashSet;
use std::path::Path;

const COINS_TREE: &str = "coins";

/// Coin rows in an embedded sled database, one bincode value per id.
#[derive(Clone)]
pub struct SledCoinStore {
    db: sled::Db,
    coins: sled::Tree,
}

impl SledCoinStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Throwaway store that is removed when dropped.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let coins = db.open_tree(COINS_TREE)?;
        Ok(Self { db, coins })
    }

    pub fn upsert(&self, record: &CoinRecord) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        self.coins.insert(record.id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Insert or replace a batch of records in one atomic write. Returns how many were written.
    pub fn upsert_many<'a, I>(&self, records: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = &'a CoinRecord>,
    {
        let mut batch = sled::Batch::default();
        let mut n = 0usize;
        for rec in records {
            batch.insert(rec.id.as_bytes(), encode(rec)?);
            n += 1;
        }
        self.coins.apply_batch(batch)?;
        Ok(n)
    }

    pub fn remove(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.coins.remove(id.as_bytes())?.is_some())
    }

    pub fn len(&self) -> usize { self.coins.len() }

    pub fn is_empty(&self) -> bool { self.coins.is_empty() }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn scan<F>(&self, mut keep: F) -> Result<Vec<CoinRecord>, StoreError>
    where
        F: FnMut(&CoinRecord) -> bool,
    {
        let mut out = Vec::new();
        for item in self.coins.iter() {
            let (key, value) = item?;
            let rec = decode(&key, &value)?;
            if keep(&rec) {
                out.push(rec);
            }
        }
        Ok(out)
    }
}

fn encode(record: &CoinRecord) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(record).map_err(|source| StoreError::Encode { id: record.id.clone(), source })
}

fn decode(key: &[u8], value: &[u8]) -> Result<CoinRecord, StoreError> {
    bincode::deserialize(value).map_err(|source| StoreError::Decode {
        id: String::from_utf8_lossy(key).into_owned(),
        source,
    })
}

impl CoinStore for SledCoinStore {
    fn all_records(&self) -> Result<Vec<CoinRecord>, StoreError> {
        self.scan(|_| true)
    }

    fn get(&self, id: &str) -> Result<Option<CoinRecord>, StoreError> {
        match self.coins.get(id.as_bytes())? {
            Some(value) => Ok(Some(decode(id.as_bytes(), &value)?)),
            None => Ok(None),
        }
    }

    fn get_by_ids(&self, ids: &HashSet<CoinId>) -> Result<Vec<CoinRecord>, StoreError> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(value) = self.coins.get(id.as_bytes())? {
                out.push(decode(id.as_bytes(), &value)?);
            }
        }
        Ok(out)
    }

    fn scan_by_field(&self, field: Field, needle: &str) -> Result<Vec<CoinRecord>, StoreError> {
        let needle = needle.to_lowercase();
        self.scan(|rec| field_contains(rec, field, &needle))
    }
}
