use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::StoreBackend;
use crate::error::{InkdexError, Result};
use crate::models::{DocumentId, IndexStats, Posting, Word, WordId};

use super::{DocumentPositions, PostingStore};

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryPostingStore {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    word_ids: HashMap<String, WordId>,
    words: BTreeMap<WordId, String>,
    next_word_id: i64,
    next_posting_id: i64,
    by_document: BTreeMap<DocumentId, Vec<Posting>>,
    by_word: HashMap<WordId, BTreeMap<DocumentId, Vec<u32>>>,
    content_hashes: BTreeMap<DocumentId, String>,
}

impl MemoryPostingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| InkdexError::mutex_poisoned("posting store"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| InkdexError::mutex_poisoned("posting store"))
    }
}

impl PostingStore for MemoryPostingStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }

    fn lookup_word(&self, value: &str) -> Result<Option<WordId>> {
        Ok(self.read()?.word_ids.get(value).copied())
    }

    fn resolve_or_create_word(&self, value: &str) -> Result<WordId> {
        let mut state = self.write()?;
        if let Some(word_id) = state.word_ids.get(value) {
            return Ok(*word_id);
        }
        state.next_word_id += 1;
        let word_id = WordId(state.next_word_id);
        state.word_ids.insert(value.to_string(), word_id);
        state.words.insert(word_id, value.to_string());
        Ok(word_id)
    }

    fn words(&self) -> Result<Vec<Word>> {
        Ok(self
            .read()?
            .words
            .iter()
            .map(|(id, value)| Word {
                id: *id,
                value: value.clone(),
            })
            .collect())
    }

    fn insert_postings(
        &self,
        document_id: DocumentId,
        postings: &[(WordId, u32)],
    ) -> Result<usize> {
        let mut state = self.write()?;
        if let Some((word_id, _)) = postings
            .iter()
            .find(|(word_id, _)| !state.words.contains_key(word_id))
        {
            return Err(InkdexError::Internal(format!(
                "posting references unknown word id {}",
                word_id.0
            )));
        }
        for (word_id, position) in postings {
            state.next_posting_id += 1;
            let posting = Posting {
                id: state.next_posting_id,
                word_id: *word_id,
                document_id,
                position: *position,
            };
            state.by_document.entry(document_id).or_default().push(posting);
            let positions = state
                .by_word
                .entry(*word_id)
                .or_default()
                .entry(document_id)
                .or_default();
            if let Err(at) = positions.binary_search(position) {
                positions.insert(at, *position);
            }
        }
        Ok(postings.len())
    }

    fn has_postings(&self, document_id: DocumentId) -> Result<bool> {
        Ok(self.read()?.by_document.contains_key(&document_id))
    }

    fn delete_postings(&self, document_id: DocumentId) -> Result<usize> {
        let mut state = self.write()?;
        let Some(postings) = state.by_document.remove(&document_id) else {
            return Ok(0);
        };
        for posting in &postings {
            if let Some(documents) = state.by_word.get_mut(&posting.word_id) {
                documents.remove(&document_id);
                if documents.is_empty() {
                    state.by_word.remove(&posting.word_id);
                }
            }
        }
        Ok(postings.len())
    }

    fn posting_list(&self, word_id: WordId) -> Result<Vec<DocumentPositions>> {
        let state = self.read()?;
        let Some(documents) = state.by_word.get(&word_id) else {
            return Ok(Vec::new());
        };
        Ok(documents
            .iter()
            .map(|(document_id, positions)| DocumentPositions {
                document_id: *document_id,
                positions: positions.clone(),
            })
            .collect())
    }

    fn postings_for_document(&self, document_id: DocumentId) -> Result<Vec<Posting>> {
        let state = self.read()?;
        let mut out = state
            .by_document
            .get(&document_id)
            .cloned()
            .unwrap_or_default();
        out.sort_by_key(|posting| (posting.position, posting.id));
        Ok(out)
    }

    fn term_counts(&self, document_id: DocumentId) -> Result<HashMap<String, u32>> {
        let state = self.read()?;
        let mut out = HashMap::new();
        for posting in state.by_document.get(&document_id).into_iter().flatten() {
            if let Some(value) = state.words.get(&posting.word_id) {
                *out.entry(value.clone()).or_insert(0) += 1;
            }
        }
        Ok(out)
    }

    fn indexed_documents(&self) -> Result<Vec<DocumentId>> {
        Ok(self.read()?.by_document.keys().copied().collect())
    }

    fn content_hash(&self, document_id: DocumentId) -> Result<Option<String>> {
        Ok(self.read()?.content_hashes.get(&document_id).cloned())
    }

    fn set_content_hash(&self, document_id: DocumentId, content_hash: &str) -> Result<()> {
        self.write()?
            .content_hashes
            .insert(document_id, content_hash.to_string());
        Ok(())
    }

    fn remove_content_hash(&self, document_id: DocumentId) -> Result<()> {
        self.write()?.content_hashes.remove(&document_id);
        Ok(())
    }

    fn tracked_documents(&self) -> Result<Vec<DocumentId>> {
        Ok(self.read()?.content_hashes.keys().copied().collect())
    }

    fn prune_orphan_words(&self) -> Result<usize> {
        let mut state = self.write()?;
        let orphans = state
            .words
            .keys()
            .filter(|word_id| !state.by_word.contains_key(*word_id))
            .copied()
            .collect::<Vec<_>>();
        for word_id in &orphans {
            if let Some(value) = state.words.remove(word_id) {
                state.word_ids.remove(&value);
            }
        }
        Ok(orphans.len())
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.write()?;
        state.word_ids.clear();
        state.words.clear();
        state.by_document.clear();
        state.by_word.clear();
        state.content_hashes.clear();
        Ok(())
    }

    fn stats(&self) -> Result<IndexStats> {
        let state = self.read()?;
        Ok(IndexStats {
            words: state.words.len(),
            postings: state.by_document.values().map(Vec::len).sum(),
            documents: state.by_document.len(),
        })
    }
}
