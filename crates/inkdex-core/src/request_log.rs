use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use serde::de::DeserializeOwned;

use crate::error::{InkdexError, Result};
use crate::models::{DocumentId, RequestLogEntry};

pub const REQUEST_LOG_RELATIVE_PATH: &str = "logs/requests.jsonl";

/// Append-only JSONL log of engine operations under an index root.
///
/// Writes are best effort: a failed append never fails the operation it
/// describes.
#[derive(Debug, Clone)]
pub struct RequestLog {
    path: PathBuf,
}

impl RequestLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn under_root(root: &Path) -> Self {
        Self::new(root.join(REQUEST_LOG_RELATIVE_PATH))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn try_log_request(&self, entry: &RequestLogEntry) {
        if let Ok(serialized) = serde_json::to_string(entry)
            && let Err(err) = self.append_line(&serialized)
        {
            tracing::debug!(path = %self.path.display(), error = %err, "request log append failed");
        }
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }

    pub(crate) fn log_request_status(
        &self,
        request_id: String,
        operation: &str,
        started: Instant,
        document_id: Option<DocumentId>,
        details: Option<serde_json::Value>,
    ) {
        self.try_log_request(&RequestLogEntry {
            request_id,
            operation: operation.to_string(),
            status: "ok".to_string(),
            latency_ms: started.elapsed().as_millis(),
            created_at: Utc::now().to_rfc3339(),
            document_id,
            error_code: None,
            error_message: None,
            details,
        });
    }

    pub(crate) fn log_request_error(
        &self,
        request_id: String,
        operation: &str,
        started: Instant,
        document_id: Option<DocumentId>,
        err: &InkdexError,
        details: Option<serde_json::Value>,
    ) {
        self.try_log_request(&RequestLogEntry {
            request_id,
            operation: operation.to_string(),
            status: "error".to_string(),
            latency_ms: started.elapsed().as_millis(),
            created_at: Utc::now().to_rfc3339(),
            document_id,
            error_code: Some(err.code().to_string()),
            error_message: Some(err.to_string()),
            details,
        });
    }

    /// Most recent entries first, optionally filtered by operation and status.
    pub fn list(
        &self,
        limit: usize,
        operation: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<RequestLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let parsed = parse_jsonl_tolerant::<RequestLogEntry>(&raw);
        if parsed.items.is_empty() && parsed.skipped_lines > 0 {
            let (line_no, message) = parsed.first_error.unwrap_or_default();
            return Err(InkdexError::Validation(format!(
                "request log parse failed ({}): skipped {} invalid lines (first at line {line_no}: {message})",
                self.path.display(),
                parsed.skipped_lines
            )));
        }

        let operation = normalize_filter(operation);
        let status = normalize_filter(status);
        let mut entries = parsed
            .items
            .into_iter()
            .filter(|entry| {
                operation
                    .as_deref()
                    .is_none_or(|op| entry.operation.eq_ignore_ascii_case(op))
                    && status
                        .as_deref()
                        .is_none_or(|st| entry.status.eq_ignore_ascii_case(st))
            })
            .collect::<Vec<_>>();
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }
}

fn normalize_filter(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_ascii_lowercase)
}

#[derive(Debug, Clone)]
struct JsonlParseOutcome<T> {
    items: Vec<T>,
    skipped_lines: usize,
    first_error: Option<(usize, String)>,
}

fn parse_jsonl_tolerant<T>(raw: &str) -> JsonlParseOutcome<T>
where
    T: DeserializeOwned,
{
    let mut items = Vec::new();
    let mut skipped_lines = 0usize;
    let mut first_error = None::<(usize, String)>;

    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(value) => items.push(value),
            Err(err) => {
                skipped_lines += 1;
                if first_error.is_none() {
                    first_error = Some((line_no + 1, err.to_string()));
                }
            }
        }
    }

    JsonlParseOutcome {
        items,
        skipped_lines,
        first_error,
    }
}
