//! Conjunctive query planning over posting lists.
//!
//! A query of `k` terms is an equi-join on document id across `k` posting lists,
//! one per term, duplicates included. The plan keeps, per candidate document,
//! the position list of every term; the fanned-out join rows (one per
//! combination of occurrence positions) are available through
//! [`QueryPlan::rows`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{DocumentId, WordId};
use crate::store::{DocumentPositions, PostingStore};
use crate::tokenizer::Tokenizer;

/// Candidate document with the positions of each query term, in term order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMatch {
    pub document_id: DocumentId,
    pub positions: Vec<Vec<u32>>,
}

impl DocumentMatch {
    /// Number of join rows this document contributes.
    #[must_use]
    pub fn row_count(&self) -> u64 {
        self.positions
            .iter()
            .fold(1_u64, |acc, list| acc.saturating_mul(list.len() as u64))
    }
}

/// One row of the join: `positions[i]` is an occurrence of term `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRow {
    pub document_id: DocumentId,
    pub positions: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPlan {
    terms: Vec<String>,
    word_ids: Vec<WordId>,
    matches: Vec<DocumentMatch>,
}

impl QueryPlan {
    fn unmatched(terms: Vec<String>) -> Self {
        Self {
            terms,
            word_ids: Vec::new(),
            matches: Vec::new(),
        }
    }

    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    #[must_use]
    pub fn word_ids(&self) -> &[WordId] {
        &self.word_ids
    }

    /// Terms that took part in the join. Zero when any term was unknown.
    #[must_use]
    pub fn matched_term_count(&self) -> usize {
        self.word_ids.len()
    }

    /// Candidates ordered by document id.
    #[must_use]
    pub fn matches(&self) -> &[DocumentMatch] {
        &self.matches
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The fanned-out join rows, grouped by document and ordered by document id.
    #[must_use]
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            matches: self.matches.iter(),
            current: None,
        }
    }
}

#[derive(Clone)]
pub struct QueryPlanner {
    store: Arc<dyn PostingStore>,
    tokenizer: Tokenizer,
}

impl std::fmt::Debug for QueryPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPlanner")
            .field("backend", &self.store.backend())
            .finish_non_exhaustive()
    }
}

impl QueryPlanner {
    pub fn new(store: Arc<dyn PostingStore>, tokenizer: Tokenizer) -> Self {
        Self { store, tokenizer }
    }

    pub fn plan_query(&self, query: &str) -> Result<QueryPlan> {
        let terms = self.tokenizer.query_terms(query);
        if terms.is_empty() {
            tracing::debug!(query, "query has no indexable terms");
            return Ok(QueryPlan::unmatched(terms));
        }

        let Some(resolved) = self.resolve_terms(query, &terms)? else {
            return Ok(QueryPlan::unmatched(terms));
        };
        let ResolvedTerms {
            word_ids,
            lists,
            term_lists,
        } = resolved;

        let matches = intersect(&lists, &term_lists);
        tracing::debug!(
            query,
            terms = terms.len(),
            candidates = matches.len(),
            "planned query"
        );
        Ok(QueryPlan {
            terms,
            word_ids,
            matches,
        })
    }

    /// `None` when some term has no postings anywhere. Repeated terms share one
    /// fetched list.
    fn resolve_terms(&self, query: &str, terms: &[String]) -> Result<Option<ResolvedTerms>> {
        let mut first_seen = HashMap::<&str, usize>::new();
        let mut resolved = ResolvedTerms {
            word_ids: Vec::with_capacity(terms.len()),
            lists: Vec::new(),
            term_lists: Vec::with_capacity(terms.len()),
        };
        for (index, term) in terms.iter().enumerate() {
            if let Some(&first) = first_seen.get(term.as_str()) {
                let word_id = resolved.word_ids[first];
                let list = resolved.term_lists[first];
                resolved.word_ids.push(word_id);
                resolved.term_lists.push(list);
                continue;
            }
            let Some(word_id) = self.store.lookup_word(term)? else {
                tracing::debug!(query, term = term.as_str(), "query term is not indexed");
                return Ok(None);
            };
            let list = self.store.posting_list(word_id)?;
            if list.is_empty() {
                tracing::debug!(query, term = term.as_str(), "query term has no postings");
                return Ok(None);
            }
            first_seen.insert(term, index);
            resolved.word_ids.push(word_id);
            resolved.term_lists.push(resolved.lists.len());
            resolved.lists.push(list);
        }
        Ok(Some(resolved))
    }
}

struct ResolvedTerms {
    word_ids: Vec<WordId>,
    lists: Vec<Vec<DocumentPositions>>,
    /// `term_lists[i]` indexes the list backing term `i`.
    term_lists: Vec<usize>,
}

/// Multi-way merge of document-sorted posting lists. `term_lists[i]` names the
/// list backing term `i`.
fn intersect(lists: &[Vec<DocumentPositions>], term_lists: &[usize]) -> Vec<DocumentMatch> {
    let mut out = Vec::new();
    if lists.is_empty() {
        return out;
    }
    let mut cursors = vec![0_usize; lists.len()];
    loop {
        let mut target = None::<DocumentId>;
        for (list, cursor) in lists.iter().zip(&cursors) {
            let Some(entry) = list.get(*cursor) else {
                return out;
            };
            target = Some(target.map_or(entry.document_id, |t| t.max(entry.document_id)));
        }
        let Some(target) = target else {
            return out;
        };

        let mut aligned = true;
        for (list, cursor) in lists.iter().zip(cursors.iter_mut()) {
            *cursor += list[*cursor..].partition_point(|entry| entry.document_id < target);
            match list.get(*cursor) {
                Some(entry) if entry.document_id == target => {}
                Some(_) => aligned = false,
                None => return out,
            }
        }
        if aligned {
            out.push(DocumentMatch {
                document_id: target,
                positions: term_lists
                    .iter()
                    .map(|&list| lists[list][cursors[list]].positions.clone())
                    .collect(),
            });
            for cursor in &mut cursors {
                *cursor += 1;
            }
        }
    }
}

/// Iterator over [`JoinRow`]s; the last term varies fastest.
pub struct Rows<'a> {
    matches: std::slice::Iter<'a, DocumentMatch>,
    current: Option<Odometer<'a>>,
}

impl Iterator for Rows<'_> {
    type Item = JoinRow;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(odometer) = self.current.as_mut()
                && let Some(row) = odometer.next_row()
            {
                return Some(row);
            }
            self.current = Some(Odometer::new(self.matches.next()?));
        }
    }
}

struct Odometer<'a> {
    document: &'a DocumentMatch,
    digits: Vec<usize>,
    exhausted: bool,
}

impl<'a> Odometer<'a> {
    fn new(document: &'a DocumentMatch) -> Self {
        Self {
            document,
            digits: vec![0; document.positions.len()],
            exhausted: document.positions.is_empty()
                || document.positions.iter().any(Vec::is_empty),
        }
    }

    fn next_row(&mut self) -> Option<JoinRow> {
        if self.exhausted {
            return None;
        }
        let row = JoinRow {
            document_id: self.document.document_id,
            positions: self
                .digits
                .iter()
                .zip(&self.document.positions)
                .map(|(&digit, positions)| positions[digit])
                .collect(),
        };
        self.exhausted = true;
        for (digit, positions) in self
            .digits
            .iter_mut()
            .zip(&self.document.positions)
            .rev()
        {
            *digit += 1;
            if *digit < positions.len() {
                self.exhausted = false;
                break;
            }
            *digit = 0;
        }
        Some(row)
    }
}
