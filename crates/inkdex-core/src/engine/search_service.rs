use serde_json::json;

use crate::error::{InkdexError, Result};
use crate::models::{DocumentId, SearchHit, SimilarDocument};
use crate::query::QueryPlan;
use crate::similarity::cosine_similarity;

use super::SearchEngine;

impl SearchEngine {
    /// Ranked hits for `query`. `limit` falls back to the configured default.
    ///
    /// An empty query or a term that was never indexed yields no hits.
    pub fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<SearchHit>> {
        let limit = limit.unwrap_or(self.search_defaults.limit);
        self.logged(
            "search",
            None,
            json!({
                "query": query,
                "limit": limit,
                "offset": offset,
            }),
            || {
                let plan = self.planner.plan_query(query)?;
                Ok(self.scorer.rank(&plan, limit, offset))
            },
            |hits| json!({ "result_count": hits.len() }),
        )
    }

    pub fn plan_query(&self, query: &str) -> Result<QueryPlan> {
        self.planner.plan_query(query)
    }

    /// Cosine similarity of the non-ignored term counts of two texts.
    #[must_use]
    pub fn similarity(&self, text_a: &str, text_b: &str) -> f64 {
        cosine_similarity(
            &self.tokenizer.term_counts(text_a),
            &self.tokenizer.term_counts(text_b),
        )
    }

    /// Other indexed documents ranked by cosine similarity of their indexed
    /// term counts. Documents sharing no term are left out.
    pub fn similar_documents(
        &self,
        document_id: DocumentId,
        limit: usize,
    ) -> Result<Vec<SimilarDocument>> {
        let target = self.store.term_counts(document_id)?;
        if target.is_empty() {
            return Err(InkdexError::NotFound(format!(
                "document {document_id} is not indexed"
            )));
        }

        let mut similar = Vec::new();
        for other in self.store.indexed_documents()? {
            if other == document_id {
                continue;
            }
            let similarity = cosine_similarity(&target, &self.store.term_counts(other)?);
            if similarity > 0.0 {
                similar.push(SimilarDocument {
                    document_id: other,
                    similarity,
                });
            }
        }
        similar.sort_by(|left, right| {
            right
                .similarity
                .total_cmp(&left.similarity)
                .then_with(|| left.document_id.cmp(&right.document_id))
        });
        similar.truncate(limit);
        Ok(similar)
    }
}
