use std::path::Path;

use serde_json::json;

use crate::error::Result;
use crate::models::{
    BulkIndexReport, DocumentId, IndexOutcome, IndexStats, IndexableDocument, SyncReport,
};
use crate::sync::{SyncOptions, sync_directory};

use super::SearchEngine;

impl SearchEngine {
    pub fn is_indexed(&self, document_id: DocumentId) -> Result<bool> {
        self.builder.is_indexed(document_id)
    }

    pub fn build_index<D>(&self, document: &D) -> Result<IndexOutcome>
    where
        D: IndexableDocument + ?Sized,
    {
        let document_id = document.document_id();
        self.logged(
            "build_index",
            Some(document_id),
            json!({}),
            || self.builder.build_index(document),
            outcome_details,
        )
    }

    pub fn rebuild_index<D>(&self, document: &D) -> Result<IndexOutcome>
    where
        D: IndexableDocument + ?Sized,
    {
        let document_id = document.document_id();
        self.logged(
            "rebuild_index",
            Some(document_id),
            json!({}),
            || self.builder.rebuild_index(document),
            outcome_details,
        )
    }

    pub fn delete_index(&self, document_id: DocumentId) -> Result<usize> {
        self.logged(
            "delete_index",
            Some(document_id),
            json!({}),
            || self.builder.delete_index(document_id),
            |removed| json!({ "removed": removed }),
        )
    }

    pub fn index_documents<'a, D, I>(&self, documents: I) -> Result<BulkIndexReport>
    where
        D: IndexableDocument + ?Sized + 'a,
        I: IntoIterator<Item = &'a D>,
    {
        self.logged(
            "index_documents",
            None,
            json!({}),
            || self.builder.index_documents(documents),
            |report| json!({ "built": report.built, "skipped": report.skipped }),
        )
    }

    /// Drops every word, posting and manifest entry.
    pub fn clear_index(&self) -> Result<()> {
        self.logged(
            "clear_index",
            None,
            json!({}),
            || {
                self.store.clear()?;
                tracing::info!(backend = self.store.backend().as_str(), "cleared index");
                Ok(())
            },
            |_| json!({}),
        )
    }

    /// Removes words no posting references any more.
    pub fn prune_words(&self) -> Result<usize> {
        let removed = self.store.prune_orphan_words()?;
        tracing::info!(removed, "pruned orphan words");
        Ok(removed)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        self.store.stats()
    }

    pub fn sync(&self, articles_root: &Path, options: &SyncOptions) -> Result<SyncReport> {
        self.logged(
            "sync",
            None,
            json!({
                "root": articles_root.display().to_string(),
                "exclude": options.exclude_globs,
            }),
            || sync_directory(&self.builder, self.store.as_ref(), articles_root, options),
            |report| {
                json!({
                    "scanned": report.scanned,
                    "built": report.built.len(),
                    "rebuilt": report.rebuilt.len(),
                    "unchanged": report.unchanged,
                    "deleted": report.deleted.len(),
                })
            },
        )
    }
}

fn outcome_details(outcome: &IndexOutcome) -> serde_json::Value {
    serde_json::to_value(outcome).unwrap_or_default()
}
