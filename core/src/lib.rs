pub mod config;
pub mod error;
pub mod identity;
pub mod index;
pub mod indexer;
pub mod persist;
pub mod phrase;
pub mod rank;
pub mod retrieval;
pub mod tokenizer;

pub use config::{RankConfig, SearchConfig};
pub use error::{Error, Result};
pub use identity::{KeywordId, PageId};
pub use index::{Field, IndexBatch, InvertedRow, Page};
pub use persist::Store;
pub use retrieval::{ScoredPage, SearchEngine, Snapshot};
