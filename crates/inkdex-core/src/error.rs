use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, InkdexError>;

#[derive(Debug, Error)]
pub enum InkdexError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Yaml(#[from] serde_norway::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub operation: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl InkdexError {
    pub(crate) fn mutex_poisoned(resource: &str) -> Self {
        Self::Internal(format!("{resource} lock poisoned"))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Sqlite(_) => "SQLITE_ERROR",
            Self::Yaml(_) => "YAML_ERROR",
            Self::Toml(_) => "TOML_ERROR",
            Self::Regex(_) => "REGEX_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_payload(&self, operation: impl Into<String>) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
            operation: operation.into(),
            trace_id: Uuid::new_v4().to_string(),
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_code_and_operation() {
        let err = InkdexError::NotFound("document 7".to_string());
        let payload = err.to_payload("similar");
        assert_eq!(payload.code, "NOT_FOUND");
        assert_eq!(payload.operation, "similar");
        assert_eq!(payload.message, "not found: document 7");
        assert!(Uuid::parse_str(&payload.trace_id).is_ok());
    }

    #[test]
    fn sqlite_errors_map_to_sqlite_code() {
        let err = InkdexError::from(rusqlite::Error::InvalidQuery);
        assert_eq!(err.code(), "SQLITE_ERROR");
    }
}
