//! Markdown articles on disk.
//!
//! A file may start with a YAML front matter block:
//!
//! ```text
//! ---
//! id: 42
//! title: Borrowing in practice
//! category: rust
//! tags: [lifetimes, references]
//! ---
//! Body in markdown.
//! ```
//!
//! Every field is optional. The title falls back to the file stem and the id to
//! a stable value derived from the path relative to the articles root.

use std::borrow::Cow;
use std::fs;
use std::path::{Component, Path};

use pulldown_cmark::{Event, Options, Parser, TagEnd};
use serde::Deserialize;

use crate::error::{InkdexError, Result};
use crate::models::{Article, DocumentId, IndexableDocument};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    id: Option<i64>,
    title: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
}

/// An [`Article`] plus where it came from and the hash of its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSource {
    pub relative_path: String,
    pub content_hash: String,
    pub article: Article,
}

impl ArticleSource {
    /// Reads `path`; the id fallback and `relative_path` are relative to `root`.
    pub fn load(root: &Path, path: &Path) -> Result<Self> {
        let relative = path.strip_prefix(root).map_err(|_| {
            InkdexError::Validation(format!(
                "article {} is outside {}",
                path.display(),
                root.display()
            ))
        })?;
        let relative_path = relative_to_unix_path(relative);
        if relative_path.is_empty() {
            return Err(InkdexError::Validation(format!(
                "article path {} names the articles root",
                path.display()
            )));
        }
        let bytes = fs::read(path)?;
        let raw = String::from_utf8(bytes).map_err(|_| {
            InkdexError::Validation(format!("article {} is not valid UTF-8", path.display()))
        })?;
        Self::parse(&relative_path, &raw)
    }

    pub fn parse(relative_path: &str, raw: &str) -> Result<Self> {
        let (front, body) = split_front_matter(raw);
        let front = match front {
            Some(yaml) if !yaml.trim().is_empty() => {
                serde_norway::from_str::<FrontMatter>(yaml)?
            }
            _ => FrontMatter::default(),
        };

        let id = match front.id {
            Some(id) if id > 0 => DocumentId(id),
            Some(id) => {
                return Err(InkdexError::Validation(format!(
                    "article {relative_path}: id must be positive, got {id}"
                )));
            }
            None => document_id_for_path(relative_path),
        };
        let title = front
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| file_stem(relative_path).to_string());

        Ok(Self {
            relative_path: relative_path.to_string(),
            content_hash: blake3::hash(raw.as_bytes()).to_hex().to_string(),
            article: Article {
                id,
                title,
                body: markdown_to_text(body),
                category: front
                    .category
                    .map(|category| category.trim().to_string())
                    .filter(|category| !category.is_empty()),
                tags: front
                    .tags
                    .into_iter()
                    .map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty())
                    .collect(),
            },
        })
    }
}

impl IndexableDocument for ArticleSource {
    fn document_id(&self) -> DocumentId {
        self.article.id
    }

    fn content(&self) -> Cow<'_, str> {
        self.article.content()
    }
}

/// Stable positive id for an article path (`/`-separated, relative).
#[must_use]
pub fn document_id_for_path(relative_path: &str) -> DocumentId {
    let hash = blake3::hash(relative_path.as_bytes());
    let mut prefix = [0_u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    let id = i64::from_le_bytes(prefix) & i64::MAX;
    DocumentId(id.max(1))
}

/// Plain text of a markdown document. Raw HTML is dropped.
#[must_use]
pub fn markdown_to_text(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);

    let mut out = String::with_capacity(markdown.len());
    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak | Event::Rule => out.push('\n'),
            Event::End(TagEnd::TableCell) => out.push(' '),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::TableRow
                | TagEnd::TableHead
                | TagEnd::BlockQuote(_),
            ) => out.push('\n'),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn split_front_matter(raw: &str) -> (Option<&str>, &str) {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return (None, raw);
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let marker = line.trim_end();
        if marker == "---" || marker == "..." {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    // Unterminated: treat the whole file as body.
    (None, raw)
}

fn file_stem(relative_path: &str) -> &str {
    let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

pub(crate) fn relative_to_unix_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(value) => Some(value.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
