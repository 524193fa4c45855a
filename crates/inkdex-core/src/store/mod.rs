use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::StoreBackend;
use crate::error::Result;
use crate::models::{DocumentId, IndexStats, Posting, Word, WordId};

mod memory;
mod migration;
mod sqlite;

pub use memory::MemoryPostingStore;
pub use sqlite::SqlitePostingStore;

pub const SQLITE_FILE_NAME: &str = "inkdex.sqlite3";

/// Positions of one word inside one document, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPositions {
    pub document_id: DocumentId,
    pub positions: Vec<u32>,
}

/// Word dictionary, postings, and the sync manifest.
///
/// Implementations must make `resolve_or_create_word` atomic per value: two
/// callers resolving the same new word get the same id.
pub trait PostingStore: Send + Sync {
    fn backend(&self) -> StoreBackend;

    fn lookup_word(&self, value: &str) -> Result<Option<WordId>>;

    fn resolve_or_create_word(&self, value: &str) -> Result<WordId>;

    fn words(&self) -> Result<Vec<Word>>;

    /// Appends `(word, position)` postings for a document as one unit.
    fn insert_postings(
        &self,
        document_id: DocumentId,
        postings: &[(WordId, u32)],
    ) -> Result<usize>;

    fn has_postings(&self, document_id: DocumentId) -> Result<bool>;

    fn delete_postings(&self, document_id: DocumentId) -> Result<usize>;

    /// Documents containing the word, ordered by document id.
    fn posting_list(&self, word_id: WordId) -> Result<Vec<DocumentPositions>>;

    fn postings_for_document(&self, document_id: DocumentId) -> Result<Vec<Posting>>;

    fn term_counts(&self, document_id: DocumentId) -> Result<HashMap<String, u32>>;

    fn indexed_documents(&self) -> Result<Vec<DocumentId>>;

    fn content_hash(&self, document_id: DocumentId) -> Result<Option<String>>;

    fn set_content_hash(&self, document_id: DocumentId, content_hash: &str) -> Result<()>;

    fn remove_content_hash(&self, document_id: DocumentId) -> Result<()>;

    fn tracked_documents(&self) -> Result<Vec<DocumentId>>;

    /// Removes words no posting references. Returns how many were dropped.
    fn prune_orphan_words(&self) -> Result<usize>;

    /// Drops every word, posting and manifest row.
    fn clear(&self) -> Result<()>;

    fn stats(&self) -> Result<IndexStats>;
}

pub fn open_store(backend: StoreBackend, root: &Path) -> Result<Arc<dyn PostingStore>> {
    Ok(match backend {
        StoreBackend::Sqlite => Arc::new(SqlitePostingStore::open(root.join(SQLITE_FILE_NAME))?),
        StoreBackend::Memory => Arc::new(MemoryPostingStore::new()),
    })
}

#[cfg(test)]
mod tests;
