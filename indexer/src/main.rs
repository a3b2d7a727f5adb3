use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use search_core::engine::CONSOLE_LIMIT;
use search_core::format::{format_change, format_date, format_market_cap, format_price};
use search_core::index::{build_from_store, BuildStatus};
use search_core::persist::{load_index_or_empty, save_with_meta, IndexPaths};
use search_core::{CoinRecord, Field, SearchEngine, SearchOutcome, SledCoinStore, StoreError};
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Import coin records, build the inverted index and search it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load coin records from JSON/JSONL files or a directory into the coin store
    Import {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Coin store directory
        #[arg(long, default_value = "./data/coins.db")]
        db: String,
    },
    /// Build the inverted index from every record in the coin store
    Build {
        /// Coin store directory
        #[arg(long, default_value = "./data/coins.db")]
        db: String,
        /// Output index directory
        #[arg(long, default_value = "./index")]
        output: String,
    },
    /// Search from the console
    Search {
        #[arg(long, default_value = "./data/coins.db")]
        db: String,
        #[arg(long, default_value = "./index")]
        index: String,
        /// Search term
        #[arg(long)]
        query: String,
        /// Scan a single field (id, name or symbol) instead of using the index
        #[arg(long)]
        field: Option<Field>,
        /// Maximum results to list
        #[arg(long, default_value_t = CONSOLE_LIMIT)]
        limit: usize,
    },
    /// Print the full details of one coin
    Show {
        #[arg(long, default_value = "./data/coins.db")]
        db: String,
        /// Coin id
        #[arg(long)]
        id: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Import { input, db } => import(&input, &db),
        Commands::Build { db, output } => build_index(&db, &output),
        Commands::Search { db, index, query, field, limit } => search(&db, &index, &query, field, limit),
        Commands::Show { db, id } => show(&db, &id),
    }
}

fn open_store(db: &str) -> Result<SledCoinStore> {
    SledCoinStore::open(db).with_context(|| format!("opening coin store at {db}"))
}

fn import(input: &str, db: &str) -> Result<()> {
    let store = open_store(db)?;
    let files = input_files(Path::new(input));
    if files.is_empty() {
        bail!("no .json or .jsonl files found at {input}");
    }

    let mut total = 0usize;
    for file in files {
        let records = read_records(&file).with_context(|| format!("reading {}", file.display()))?;
        let written = store.upsert_many(&records)?;
        tracing::info!(file = %file.display(), written, "imported records");
        total += written;
    }
    store.flush()?;
    tracing::info!(total, stored = store.len(), "import complete");
    Ok(())
}

fn input_files(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && is_record_file(p) {
                files.push(p.to_path_buf());
            }
        }
        files.sort();
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

fn is_record_file(p: &Path) -> bool {
    matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl"))
}

fn read_records(file: &Path) -> Result<Vec<CoinRecord>> {
    let reader = BufReader::new(File::open(file)?);
    let mut records = Vec::new();
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            records.push(serde_json::from_str(&line)?);
        }
    } else {
        let json: serde_json::Value = serde_json::from_reader(reader)?;
        match json {
            serde_json::Value::Array(arr) => {
                for v in arr {
                    records.push(serde_json::from_value(v)?);
                }
            }
            serde_json::Value::Object(_) => records.push(serde_json::from_value(json)?),
            _ => {}
        }
    }
    Ok(keep_valid(records))
}

/// Drop records without an id, they cannot be keyed.
fn keep_valid(records: Vec<CoinRecord>) -> Vec<CoinRecord> {
    records
        .into_iter()
        .filter(|r| {
            let ok = !r.id.trim().is_empty();
            if !ok {
                tracing::warn!(name = %r.name, "skipping record without id");
            }
            ok
        })
        .collect()
}

fn build_index(db: &str, output: &str) -> Result<()> {
    let store = open_store(db)?;
    let report = build_from_store(&store);
    if let BuildStatus::NoData(reason) = &report.status {
        tracing::warn!(?reason, "no coin data, writing an empty index");
    }
    let paths = IndexPaths::new(output);
    let meta = save_with_meta(&paths, &report.index, &report.stats)?;
    tracing::info!(output, terms = meta.num_terms, records = meta.num_records, "index build complete");
    Ok(())
}

fn search(db: &str, index_dir: &str, query: &str, field: Option<Field>, limit: usize) -> Result<()> {
    if query.trim().is_empty() {
        bail!("search term cannot be empty");
    }
    let store = open_store(db)?;
    let loaded = load_index_or_empty(&IndexPaths::new(index_dir));
    let engine = SearchEngine::new(Arc::new(store), loaded.into_option());

    let outcome = match field {
        Some(field) => engine.search_field(field, query, limit),
        None => engine.search_with_limit(query, limit),
    };
    let mode = if outcome.used_index { "inverted index" } else { "field scan" };
    println!("Searching for '{query}' ({mode})...");
    print!("{}", render_listing(&outcome));
    Ok(())
}

fn render_listing(outcome: &SearchOutcome) -> String {
    if outcome.degraded {
        return "Coin store unavailable, no results.\n".to_string();
    }
    if outcome.records.is_empty() {
        return "No cryptocurrencies found.\n".to_string();
    }
    let mut out = format!("\n{} result(s) found:\n{}\n", outcome.total, "-".repeat(70));
    for (i, coin) in outcome.records.iter().enumerate() {
        out.push_str(&format!(
            "{:2}. {} ({}) - {} - MC: {}\n",
            i + 1,
            coin.name,
            coin.symbol.to_uppercase(),
            format_price(coin.price_usd),
            format_market_cap(coin.market_cap),
        ));
    }
    if outcome.total > outcome.records.len() {
        out.push_str(&format!("... and {} more result(s)\n", outcome.total - outcome.records.len()));
    }
    out
}

fn show(db: &str, id: &str) -> Result<()> {
    let store = open_store(db)?;
    let engine = SearchEngine::new(Arc::new(store), None);
    print!("{}", render_lookup(id, engine.get(id)));
    Ok(())
}

fn render_lookup(id: &str, found: Result<Option<CoinRecord>, StoreError>) -> String {
    match found {
        Ok(Some(coin)) => render_details(&coin),
        Ok(None) => format!("No cryptocurrency with id '{id}'.\n"),
        Err(e) => format!("Coin store unavailable, could not look up '{id}': {e}\n"),
    }
}

fn render_details(coin: &CoinRecord) -> String {
    let sep = "=".repeat(60);
    format!(
        "{sep}\nID: {}\nName: {}\nSymbol: {}\nPrice: {}\n24h Change: {}\nMarket Cap: {}\nLast Updated: {}\n{sep}\n",
        coin.id,
        coin.name,
        coin.symbol.to_uppercase(),
        format_price(coin.price_usd),
        format_change(coin.change_24h),
        format_market_cap(coin.market_cap),
        format_date(coin.last_updated.as_deref()),
    )
}
