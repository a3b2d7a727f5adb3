pub mod assemble;
pub mod engine;
pub mod format;
pub mod index;
pub mod persist;
pub mod record;
pub mod resolve;
pub mod store;
pub mod tokenizer;

pub use engine::{SearchConfig, SearchEngine, SearchOutcome};
pub use index::{BuildReport, BuildStats, BuildStatus, IndexBuilder, InvertedIndex};
pub use record::{CoinId, CoinRecord, Field};
pub use store::{CoinStore, MemoryCoinStore, SledCoinStore, StoreError};
