use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[a-z0-9]+").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            // english
            "a","an","and","are","as","at","be","by","for","from","in","into","is","it","its",
            "of","on","or","that","the","this","to","was","with",
            // portuguese
            "com","da","das","de","do","dos","e","em","na","nas","no","nos","o","os",
            "ou","para","pela","pelo","por","que","se","um","uma",
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Normalize text into a set of index terms: NFKC, lowercase, split on anything
/// outside `[a-z0-9]`, stopwords removed. No stemming and no minimum length, so
/// ticker symbols like "btc" survive.
pub fn normalize(text: &str) -> HashSet<String> {
    let lowered = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !is_stopword(t))
        .map(str::to_string)
        .collect()
}

/// The symbol as a single un-split term, so "shib-inu" is still found as one key.
pub fn symbol_term(symbol: &str) -> Option<String> {
    let term = query_key(symbol);
    if term.is_empty() { None } else { Some(term) }
}

/// Lookup key for a query: NFKC, trimmed and lowercased like index terms, but not tokenized.
pub fn query_key(query: &str) -> String {
    query.nfkc().collect::<String>().trim().to_lowercase()
}
