use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{BulkIndexReport, DocumentId, IndexOutcome, IndexableDocument, WordId};
use crate::store::PostingStore;
use crate::tokenizer::Tokenizer;

/// Creates, replaces and removes the postings of single documents.
///
/// Mutations of the same document must not run concurrently: `rebuild_index` is
/// delete-then-build and readers may briefly see the document unindexed.
#[derive(Clone)]
pub struct IndexBuilder {
    store: Arc<dyn PostingStore>,
    tokenizer: Tokenizer,
}

impl std::fmt::Debug for IndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("backend", &self.store.backend())
            .finish_non_exhaustive()
    }
}

impl IndexBuilder {
    pub fn new(store: Arc<dyn PostingStore>, tokenizer: Tokenizer) -> Self {
        Self { store, tokenizer }
    }

    pub fn is_indexed(&self, document_id: DocumentId) -> Result<bool> {
        self.store.has_postings(document_id)
    }

    /// No-op when the document already has postings.
    pub fn build_index<D>(&self, document: &D) -> Result<IndexOutcome>
    where
        D: IndexableDocument + ?Sized,
    {
        if self.is_indexed(document.document_id())? {
            return Ok(IndexOutcome::AlreadyIndexed);
        }
        let postings = self.write_postings(document)?;
        Ok(IndexOutcome::Built { postings })
    }

    /// Removes every posting of the document. Words stay in the dictionary.
    pub fn delete_index(&self, document_id: DocumentId) -> Result<usize> {
        let removed = self.store.delete_postings(document_id)?;
        tracing::info!(document_id = document_id.0, removed, "removed document from index");
        Ok(removed)
    }

    pub fn rebuild_index<D>(&self, document: &D) -> Result<IndexOutcome>
    where
        D: IndexableDocument + ?Sized,
    {
        self.delete_index(document.document_id())?;
        let postings = self.write_postings(document)?;
        Ok(IndexOutcome::Built { postings })
    }

    pub fn index_documents<'a, D, I>(&self, documents: I) -> Result<BulkIndexReport>
    where
        D: IndexableDocument + ?Sized + 'a,
        I: IntoIterator<Item = &'a D>,
    {
        let mut report = BulkIndexReport::default();
        for document in documents {
            match self.build_index(document)? {
                IndexOutcome::Built { postings } => {
                    report.built += 1;
                    report.postings += postings;
                }
                IndexOutcome::AlreadyIndexed => report.skipped += 1,
            }
        }
        Ok(report)
    }

    fn write_postings<D>(&self, document: &D) -> Result<usize>
    where
        D: IndexableDocument + ?Sized,
    {
        let document_id = document.document_id();
        let content = document.content();
        let mut resolved = HashMap::<String, WordId>::new();
        let mut postings = Vec::<(WordId, u32)>::new();
        for (position, term) in self.tokenizer.indexable_terms(&content) {
            let word_id = match resolved.get(&term) {
                Some(word_id) => *word_id,
                None => {
                    let word_id = self.store.resolve_or_create_word(&term)?;
                    resolved.insert(term, word_id);
                    word_id
                }
            };
            postings.push((word_id, position));
        }
        let written = self.store.insert_postings(document_id, &postings)?;
        tracing::info!(
            document_id = document_id.0,
            postings = written,
            distinct_words = resolved.len(),
            "indexed document"
        );
        Ok(written)
    }
}
