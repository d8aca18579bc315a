pub mod batch;
pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod ops;
pub mod query;
pub mod search;
pub mod tokenizer;

pub type DocId = u32;

pub use batch::{BatchIndexer, BatchReport, SharedCatalog};
pub use catalog::{Catalog, DetectLanguage, FixedLanguage, Language, StopWordDetector};
pub use config::EngineConfig;
pub use error::{IndexError, QueryError};
pub use index::{DocumentList, Index, IndexStats};
pub use ingest::ArticleRecord;
pub use query::{Grammar, QueryParser};
pub use search::{search, Hit, Ranking, SearchOutcome};
pub use tokenizer::{CzechPreprocessor, EnglishPreprocessor, Preprocessor};
