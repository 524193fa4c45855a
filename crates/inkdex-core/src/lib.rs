// Public fallible APIs in this crate share one concrete error contract (`InkdexError`).
// Repeating per-function `# Errors` boilerplate obscures behavior more than it clarifies.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod models;
pub mod query;
pub mod request_log;
pub mod scoring;
pub mod similarity;
pub mod source;
pub mod store;
pub mod sync;
pub mod tokenizer;

pub use config::{EngineConfig, ScoreWeights, SearchDefaults, StoreBackend, TokenizerConfig};
pub use engine::SearchEngine;
pub use error::{InkdexError, Result};
pub use models::{Article, Document, DocumentId, IndexableDocument, SearchHit};
pub use source::ArticleSource;
pub use sync::SyncOptions;
