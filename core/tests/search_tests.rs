use search_core::assemble::field_scan;
use search_core::index::{build, build_from_store, BuildStatus, NoDataReason};
use search_core::resolve::resolve;
use search_core::{CoinId, CoinRecord, CoinStore, Field, InvertedIndex, MemoryCoinStore, SearchConfig, SearchEngine, StoreError};
use std::collections::HashSet;
use std::sync::Arc;

fn coin(id: &str, name: &str, symbol: &str, cap: Option<f64>) -> CoinRecord {
    CoinRecord { market_cap: cap, ..CoinRecord::new(id, name, symbol) }
}

fn ids(v: &[&str]) -> HashSet<CoinId> { v.iter().map(|s| s.to_string()).collect() }

fn corpus() -> Vec<CoinRecord> {
    vec![
        coin("bitcoin", "Bitcoin", "btc", Some(1_200.0)),
        coin("bitcoin-cash", "Bitcoin Cash", "bch", Some(9.0)),
        coin("wrapped-bitcoin", "Wrapped Bitcoin", "wbtc", Some(10.0)),
        coin("bitconnect", "BitConnect", "bcc", None),
        coin("ethereum", "Ethereum", "eth", Some(400.0)),
        coin("shiba-inu", "Shiba Inu", "shib-inu", Some(5.0)),
        coin("the-graph", "The Graph", "grt", Some(2.0)),
    ]
}

struct DownStore;

impl CoinStore for DownStore {
    fn all_records(&self) -> Result<Vec<CoinRecord>, StoreError> { Err(down()) }
    fn get(&self, _: &str) -> Result<Option<CoinRecord>, StoreError> { Err(down()) }
    fn scan_by_field(&self, _: Field, _: &str) -> Result<Vec<CoinRecord>, StoreError> { Err(down()) }
}

fn down() -> StoreError {
    StoreError::Unavailable(sled::Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "connection lost")))
}

fn engine(records: Vec<CoinRecord>, with_index: bool) -> SearchEngine {
    let index = with_index.then(|| build(&records));
    SearchEngine::new(Arc::new(MemoryCoinStore::from_records(records)), index)
}

fn result_ids(outcome: &search_core::SearchOutcome) -> Vec<String> {
    outcome.records.iter().map(|r| r.id.clone()).collect()
}

#[test]
fn build_is_order_independent() {
    let records = corpus();
    let mut reversed = records.clone();
    reversed.reverse();
    assert_eq!(build(&records), build(&reversed));
    assert_eq!(build(&records), build(&records));
}

#[test]
fn exact_match_takes_precedence() {
    let index = build(&corpus());
    // "bitcoin" is a key; "bitconnect" contains "bitc" but must not leak in
    let r = resolve("bitcoin", &index);
    assert_eq!(r.ids, ids(&["bitcoin", "bitcoin-cash", "wrapped-bitcoin"]));
}

#[test]
fn substring_fallback_is_complete_and_sound() {
    let index = build(&corpus());
    let query = "itco";
    assert!(!index.contains_term(query));
    let expected: HashSet<CoinId> = index
        .iter()
        .filter(|(term, _)| term.contains(query))
        .flat_map(|(_, ids)| ids.iter().cloned())
        .collect();
    assert_eq!(resolve(query, &index).ids, expected);
    assert_eq!(expected, ids(&["bitcoin", "bitcoin-cash", "wrapped-bitcoin", "bitconnect"]));
}

#[test]
fn bit_prefix_example() {
    let mut index = InvertedIndex::new();
    index.insert("bitcoin", "bitcoin");
    index.insert("bit", "bitcoin");
    index.insert("bit", "bitconnect");
    index.insert("bitconnect", "bitconnect");
    assert_eq!(resolve("bitcoin", &index).ids, ids(&["bitcoin"]));
    assert_eq!(resolve("bit", &index).ids, ids(&["bitcoin", "bitconnect"]));
    // not a key: union of "bitcoin" and "bitconnect", but not "bit"
    assert_eq!(resolve("bitc", &index).ids, ids(&["bitcoin", "bitconnect"]));
}

#[test]
fn symbol_lookup_survives_splitting() {
    let index = build(&corpus());
    assert_eq!(resolve("SHIB-INU", &index).ids, ids(&["shiba-inu"]));
}

#[test]
fn empty_query_returns_nothing() {
    let engine = engine(corpus(), true);
    for q in ["", "   "] {
        let out = engine.search(q);
        assert!(out.records.is_empty());
        assert_eq!(out.total, 0);
        assert!(!out.degraded);
    }
    let fallback = engine_without_index();
    assert!(fallback.search("  ").records.is_empty());
}

fn engine_without_index() -> SearchEngine { engine(corpus(), false) }

#[test]
fn index_results_ranked_by_market_cap() {
    let engine = engine(corpus(), true);
    let out = engine.search("bit");
    assert!(out.used_index);
    assert_eq!(result_ids(&out), vec!["bitcoin", "wrapped-bitcoin", "bitcoin-cash", "bitconnect"]);
    assert_eq!(out.total, 4);
}

#[test]
fn ranking_and_capping_counts_nulls() {
    let records = vec![
        coin("five", "Alpha Five", "a5", Some(5.0)),
        coin("null", "Alpha Null", "an", None),
        coin("one", "Alpha One", "a1", Some(1.0)),
        coin("three", "Alpha Three", "a3", Some(3.0)),
    ];
    let engine = engine(records, true);
    let out = engine.search_with_limit("alpha", 3);
    assert_eq!(result_ids(&out), vec!["five", "three", "one"]);
    assert_eq!(out.total, 4);
}

#[test]
fn missing_index_falls_back_to_field_scan() {
    let engine = engine_without_index();
    let store = MemoryCoinStore::from_records(corpus());
    for q in ["bit", "ETH", "inu", "graph", "wbtc", "zzz"] {
        let out = engine.search(q);
        assert!(!out.used_index);
        assert!(!out.degraded);
        let direct = field_scan(&store, &Field::ALL, &q.to_lowercase(), 50).unwrap();
        assert_eq!(out.records, direct.records, "query {q}");
        assert_eq!(out.total, direct.total);
    }
}

#[test]
fn fallback_orders_nulls_last() {
    let engine = engine_without_index();
    let out = engine.search("bitc");
    assert_eq!(out.records.last().map(|r| r.id.as_str()), Some("bitconnect"));
}

#[test]
fn storage_failure_degrades_to_empty() {
    let records = corpus();
    let with_index = SearchEngine::new(Arc::new(DownStore), Some(build(&records)));
    let out = with_index.search("bitcoin");
    assert!(out.degraded);
    assert!(out.used_index);
    assert!(out.records.is_empty());

    let without = SearchEngine::new(Arc::new(DownStore), None);
    let out = without.search("bitcoin");
    assert!(out.degraded);
    assert!(!out.used_index);
}

#[test]
fn stale_ids_yield_no_detail() {
    let store = Arc::new(MemoryCoinStore::from_records(corpus()));
    let index = build(&store.all_records().unwrap());
    store.remove("bitconnect");
    let engine = SearchEngine::new(store, Some(index));
    let out = engine.search("bitconnect");
    assert!(out.records.is_empty());
    assert!(!out.degraded);
    assert!(engine.get("bitconnect").unwrap().is_none());
}

#[test]
fn field_search_targets_one_field() {
    let engine = engine(corpus(), true);
    let out = engine.search_field(Field::Symbol, "bc", 20);
    assert!(!out.used_index);
    let mut got = result_ids(&out);
    got.sort();
    assert_eq!(got, vec!["bitcoin-cash", "bitconnect"]);
}

#[test]
fn build_from_empty_or_broken_store_is_no_data() {
    let report = build_from_store(&MemoryCoinStore::new());
    assert!(report.index.is_empty());
    assert!(matches!(report.status, BuildStatus::NoData(NoDataReason::EmptySource)));

    let report = build_from_store(&DownStore);
    assert!(report.index.is_empty());
    assert!(matches!(report.status, BuildStatus::NoData(NoDataReason::Unreadable(_))));
}

#[test]
fn rebuild_publishes_new_snapshot() {
    let store = Arc::new(MemoryCoinStore::from_records(corpus()));
    let engine = SearchEngine::new(store.clone(), None);
    assert!(!engine.search("solana").used_index);

    store.upsert(coin("solana", "Solana", "sol", Some(70.0)));
    let before = engine.snapshot();
    let report = engine.rebuild();
    assert!(report.has_data());
    assert_eq!(report.stats.records, 8);
    assert!(before.is_none());

    let out = engine.search("solana");
    assert!(out.used_index);
    assert_eq!(result_ids(&out), vec!["solana"]);
}

#[test]
fn readers_keep_their_snapshot_across_publish() {
    let engine = engine(corpus(), true);
    let old = engine.snapshot().unwrap();
    engine.publish(InvertedIndex::new());
    assert!(old.contains_term("bitcoin"));
    assert!(engine.snapshot().unwrap().is_empty());
}

#[test]
fn rebuild_on_broken_store_keeps_current_index() {
    let engine = SearchEngine::new(Arc::new(DownStore), Some(build(&corpus())));
    let report = engine.rebuild();
    assert!(!report.has_data());
    assert!(engine.snapshot().unwrap().contains_term("bitcoin"));
}

#[test]
fn limits_follow_config() {
    let engine = engine(corpus(), true).with_config(SearchConfig { default_limit: 2, max_limit: 3 });
    let out = engine.search("bit");
    assert_eq!(out.records.len(), 2);
    assert_eq!(out.total, 4);
    assert_eq!(engine.limit_or(Some(100), 50), 3);
    assert_eq!(engine.limit_or(Some(0), 50), 1);
    assert_eq!(engine.limit_or(None, 2), 2);
}

#[test]
fn detail_lookup_separates_missing_from_store_failure() {
    let engine = engine(corpus(), true);
    assert_eq!(engine.get("bitcoin").unwrap().map(|r| r.symbol), Some("btc".to_string()));
    assert!(engine.get("nope").unwrap().is_none());

    let down = SearchEngine::new(Arc::new(DownStore), None);
    let err = down.get("bitcoin").unwrap_err();
    assert!(err.is_transient());
}

#[test]
fn failed_persist_does_not_publish() {
    let engine = engine_without_index();
    let res: Result<_, &str> = engine.rebuild_with(|_| Err::<(), _>("disk full"));
    assert_eq!(res.err(), Some("disk full"));
    assert!(engine.snapshot().is_none());
    assert!(!engine.search("bitcoin").used_index);

    let (report, persisted) = engine.rebuild_with(|r| Ok::<_, &str>(r.stats.records)).unwrap();
    assert_eq!(persisted, Some(report.stats.records));
    assert!(engine.search("bitcoin").used_index);
}

#[test]
fn full_width_query_matches_folded_terms() {
    let engine = engine(corpus(), true);
    let out = engine.search("ＢＴＣ");
    assert!(out.used_index);
    assert_eq!(result_ids(&out), vec!["bitcoin"]);
}
