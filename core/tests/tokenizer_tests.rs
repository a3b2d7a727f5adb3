use search_core::tokenizer::{normalize, query_key};

fn words(text: &str) -> Vec<String> {
    let mut v: Vec<String> = normalize(text).into_iter().collect();
    v.sort();
    v
}

#[test]
fn it_lowercases_and_splits() {
    assert_eq!(words("Bitcoin Cash (BCH)"), vec!["bch", "bitcoin", "cash"]);
    assert_eq!(words("USD//Coin_v2"), vec!["coin", "usd", "v2"]);
}

#[test]
fn it_keeps_single_character_tokens() {
    assert_eq!(words("X"), vec!["x"]);
    assert_eq!(words("1inch"), vec!["1inch"]);
}

#[test]
fn it_filters_stopwords() {
    let toks = words("The Sandbox of the Metaverse and Beyond");
    assert!(!toks.contains(&"the".to_string()));
    assert!(!toks.contains(&"of".to_string()));
    assert!(!toks.contains(&"and".to_string()));
    assert!(toks.contains(&"sandbox".to_string()));
    // portuguese function words are dropped too
    assert_eq!(words("Moeda do Brasil"), vec!["brasil", "moeda"]);
}

#[test]
fn it_applies_nfkc_before_splitting() {
    assert_eq!(words("ＢＴＣ"), vec!["btc"]);
    // accented letters are separators, not folded
    assert_eq!(words("café"), vec!["caf"]);
}

#[test]
fn blank_text_has_no_terms() {
    assert!(normalize("").is_empty());
    assert!(normalize("  -- !! ").is_empty());
}

#[test]
fn query_key_only_trims_and_lowercases() {
    assert_eq!(query_key("  Shib-Inu "), "shib-inu");
}
