//! Keeps the index in step with a directory of markdown articles.
//!
//! The manifest (document id to content hash) lives in the posting store. New
//! articles are built, changed ones rebuilt, and manifest entries whose file is
//! gone are deleted from the index.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::{InkdexError, Result};
use crate::index::IndexBuilder;
use crate::models::{DocumentId, SyncReport};
use crate::source::{ArticleSource, relative_to_unix_path};
use crate::store::PostingStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Globs matched against `/`-separated paths relative to the articles root.
    pub exclude_globs: Vec<String>,
    pub include_hidden: bool,
}

#[derive(Debug)]
struct ArticlePathFilter {
    include_hidden: bool,
    exclude: GlobSet,
}

impl ArticlePathFilter {
    fn new(options: &SyncOptions) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &options.exclude_globs {
            let trimmed = pattern.trim();
            if trimmed.is_empty() {
                continue;
            }
            let glob = Glob::new(trimmed).map_err(|err| {
                InkdexError::Validation(format!("invalid sync exclude glob '{trimmed}': {err}"))
            })?;
            builder.add(glob);
        }
        let exclude = builder
            .build()
            .map_err(|err| InkdexError::Validation(format!("invalid sync exclude globs: {err}")))?;
        Ok(Self {
            include_hidden: options.include_hidden,
            exclude,
        })
    }

    fn allows_directory(&self, relative: &Path) -> bool {
        if relative.as_os_str().is_empty() {
            return true;
        }
        if !self.include_hidden && path_has_hidden_component(relative) {
            return false;
        }
        !self.exclude.is_match(relative_to_unix_path(relative))
    }

    fn allows_file(&self, relative: &Path) -> bool {
        if !self.include_hidden && path_has_hidden_component(relative) {
            return false;
        }
        if self.exclude.is_match(relative_to_unix_path(relative)) {
            return false;
        }
        relative
            .extension()
            .and_then(|x| x.to_str())
            .is_some_and(|x| matches!(x.to_ascii_lowercase().as_str(), "md" | "markdown"))
    }
}

/// Loads every article under `root`, ordered by path.
///
/// Two files resolving to the same document id are a `Conflict`.
pub fn scan_articles(root: &Path, options: &SyncOptions) -> Result<Vec<ArticleSource>> {
    if !root.is_dir() {
        return Err(InkdexError::NotFound(format!(
            "articles directory {}",
            root.display()
        )));
    }
    let filter = ArticlePathFilter::new(options)?;
    let entries = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            entry
                .path()
                .strip_prefix(root)
                .map_or(true, |relative| filter.allows_directory(relative))
        });

    let mut articles = Vec::new();
    let mut owners = HashMap::<DocumentId, String>::new();
    for entry in entries {
        let entry = entry.map_err(|err| InkdexError::Validation(err.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|err| InkdexError::Validation(err.to_string()))?;
        if !filter.allows_file(relative) {
            continue;
        }
        let article = ArticleSource::load(root, entry.path())?;
        if let Some(previous) = owners.insert(article.article.id, article.relative_path.clone()) {
            return Err(InkdexError::Conflict(format!(
                "articles {previous} and {} share document id {}",
                article.relative_path, article.article.id
            )));
        }
        articles.push(article);
    }
    Ok(articles)
}

pub fn sync_directory(
    builder: &IndexBuilder,
    store: &dyn PostingStore,
    root: &Path,
    options: &SyncOptions,
) -> Result<SyncReport> {
    let articles = scan_articles(root, options)?;
    let mut report = SyncReport {
        scanned: articles.len(),
        ..SyncReport::default()
    };

    let mut seen = BTreeSet::new();
    for source in &articles {
        let document_id = source.article.id;
        seen.insert(document_id);
        match store.content_hash(document_id)? {
            Some(hash) if hash == source.content_hash => report.unchanged += 1,
            Some(_) => {
                builder.rebuild_index(source)?;
                report.rebuilt.push(document_id);
            }
            None => {
                // Postings may exist from a direct add; replace them.
                builder.rebuild_index(source)?;
                report.built.push(document_id);
            }
        }
        store.set_content_hash(document_id, &source.content_hash)?;
    }

    for document_id in store.tracked_documents()? {
        if seen.contains(&document_id) {
            continue;
        }
        builder.delete_index(document_id)?;
        store.remove_content_hash(document_id)?;
        report.deleted.push(document_id);
    }

    tracing::info!(
        root = %root.display(),
        scanned = report.scanned,
        built = report.built.len(),
        rebuilt = report.rebuilt.len(),
        unchanged = report.unchanged,
        deleted = report.deleted.len(),
        "synced articles directory"
    );
    Ok(report)
}

fn path_has_hidden_component(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(value) => value.to_string_lossy().starts_with('.'),
        _ => false,
    })
}
