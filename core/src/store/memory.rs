use super::{field_contains, CoinStore, StoreError};
use crate::record::{CoinId, CoinRecord, Field};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct MemoryCoinStore {
    records: RwLock<HashMap<CoinId, CoinRecord>>,
}

impl MemoryCoinStore {
    pub fn new() -> Self { Self::default() }

    pub fn from_records<I: IntoIterator<Item = CoinRecord>>(records: I) -> Self {
        let store = Self::new();
        store.upsert_many(records);
        store
    }

    pub fn upsert(&self, record: CoinRecord) {
        self.records.write().insert(record.id.clone(), record);
    }

    pub fn upsert_many<I: IntoIterator<Item = CoinRecord>>(&self, records: I) {
        let mut guard = self.records.write();
        for rec in records {
            guard.insert(rec.id.clone(), rec);
        }
    }

    pub fn remove(&self, id: &str) -> Option<CoinRecord> { self.records.write().remove(id) }

    pub fn len(&self) -> usize { self.records.read().len() }

    pub fn is_empty(&self) -> bool { self.records.read().is_empty() }
}

impl CoinStore for MemoryCoinStore {
    fn all_records(&self) -> Result<Vec<CoinRecord>, StoreError> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn get(&self, id: &str) -> Result<Option<CoinRecord>, StoreError> {
        Ok(self.records.read().get(id).cloned())
    }

    fn get_by_ids(&self, ids: &HashSet<CoinId>) -> Result<Vec<CoinRecord>, StoreError> {
        let guard = self.records.read();
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }

    fn scan_by_field(&self, field: Field, needle: &str) -> Result<Vec<CoinRecord>, StoreError> {
        let needle = needle.to_lowercase();
        Ok(self
            .records
            .read()
            .values()
            .filter(|rec| field_contains(rec, field, &needle))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_ignores_case() {
        let store = MemoryCoinStore::from_records([
            CoinRecord::new("bitcoin", "Bitcoin", "btc"),
            CoinRecord::new("ethereum", "Ethereum", "eth"),
        ]);
        let hits = store.scan_by_field(Field::Name, "BIT").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "bitcoin");
        assert!(store.scan_by_field(Field::Symbol, "bit").unwrap().is_empty());
    }

    #[test]
    fn get_by_ids_skips_stale_ids() {
        let store = MemoryCoinStore::from_records([CoinRecord::new("bitcoin", "Bitcoin", "btc")]);
        let ids: HashSet<CoinId> = ["bitcoin".to_string(), "gone".to_string()].into_iter().collect();
        let recs = store.get_by_ids(&ids).unwrap();
        assert_eq!(recs.len(), 1);
    }
}
