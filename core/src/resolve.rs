use crate::index::InvertedIndex;
use crate::record::CoinId;
use crate::tokenizer::query_key;
use std::collections::HashSet;

/// How a query was answered by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Blank query; nothing was looked up.
    Empty,
    Exact,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub ids: HashSet<CoinId>,
    pub kind: MatchKind,
}

/// Candidate ids for `query`.
///
/// The query is trimmed and lowercased but not tokenized. If it is itself a key
/// of the index, that key's postings are returned and nothing else. Otherwise the
/// postings of every key containing the query are unioned. Blank queries return
/// nothing so they never match every key.
pub fn resolve(query: &str, index: &InvertedIndex) -> Resolution {
    let key = query_key(query);
    if key.is_empty() {
        return Resolution { ids: HashSet::new(), kind: MatchKind::Empty };
    }

    if let Some(ids) = index.get(&key) {
        return Resolution { ids: ids.clone(), kind: MatchKind::Exact };
    }

    let mut ids = HashSet::new();
    for (term, postings) in index.iter() {
        if term.contains(key.as_str()) {
            ids.extend(postings.iter().cloned());
        }
    }
    Resolution { ids, kind: MatchKind::Substring }
}
