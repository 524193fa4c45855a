use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a document owned by the content-management side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub i64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for DocumentId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordId(pub i64);

/// Dictionary entry. `value` is unique and already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub value: String,
}

/// One occurrence of a word inside a document's filtered token sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub id: i64,
    pub word_id: WordId,
    pub document_id: DocumentId,
    pub position: u32,
}

/// Read-only view the index needs from a content-management document.
pub trait IndexableDocument {
    fn document_id(&self) -> DocumentId;
    fn content(&self) -> Cow<'_, str>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub content: String,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

impl IndexableDocument for Document {
    fn document_id(&self) -> DocumentId {
        self.id
    }

    fn content(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.content)
    }
}

/// Blog article. Title, category and tags are repeated three times in the indexed
/// content so that matches on them outweigh body matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: DocumentId,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

const ARTICLE_FIELD_REPEAT: usize = 3;

impl IndexableDocument for Article {
    fn document_id(&self) -> DocumentId {
        self.id
    }

    fn content(&self) -> Cow<'_, str> {
        let mut parts = Vec::<&str>::with_capacity(
            1 + ARTICLE_FIELD_REPEAT * (2 + self.tags.len()),
        );
        parts.push(&self.body);
        parts.extend(std::iter::repeat_n(self.title.as_str(), ARTICLE_FIELD_REPEAT));
        if let Some(category) = self.category.as_deref() {
            parts.extend(std::iter::repeat_n(category, ARTICLE_FIELD_REPEAT));
        }
        for _ in 0..ARTICLE_FIELD_REPEAT {
            parts.extend(self.tags.iter().map(String::as_str));
        }
        Cow::Owned(parts.join(" "))
    }
}

/// Normalized component scores of one hit, each in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub frequency: f64,
    pub location: f64,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub document_id: DocumentId,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarDocument {
    pub document_id: DocumentId,
    pub similarity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndexOutcome {
    Built { postings: usize },
    AlreadyIndexed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkIndexReport {
    pub built: usize,
    pub skipped: usize,
    pub postings: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub words: usize,
    pub postings: usize,
    pub documents: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub scanned: usize,
    pub built: Vec<DocumentId>,
    pub rebuilt: Vec<DocumentId>,
    pub unchanged: usize,
    pub deleted: Vec<DocumentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub request_id: String,
    pub operation: String,
    pub status: String,
    pub latency_ms: u128,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocumentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
