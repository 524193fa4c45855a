use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{EngineConfig, SearchDefaults};
use crate::error::Result;
use crate::index::IndexBuilder;
use crate::models::DocumentId;
use crate::query::QueryPlanner;
use crate::request_log::RequestLog;
use crate::scoring::Scorer;
use crate::store::{MemoryPostingStore, PostingStore, open_store};
use crate::tokenizer::Tokenizer;

mod indexing_service;
mod search_service;

/// Search entry point plus the index lifecycle hooks a content-management
/// layer calls when documents change.
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<dyn PostingStore>,
    tokenizer: Tokenizer,
    builder: IndexBuilder,
    planner: QueryPlanner,
    scorer: Scorer,
    search_defaults: SearchDefaults,
    request_log: Option<RequestLog>,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("backend", &self.store.backend())
            .field("request_log", &self.request_log)
            .finish_non_exhaustive()
    }
}

impl SearchEngine {
    pub fn new(store: Arc<dyn PostingStore>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let tokenizer = Tokenizer::new(&config.tokenizer)?;
        Ok(Self {
            builder: IndexBuilder::new(store.clone(), tokenizer.clone()),
            planner: QueryPlanner::new(store.clone(), tokenizer.clone()),
            scorer: Scorer::new(config.weights),
            search_defaults: config.search,
            request_log: None,
            store,
            tokenizer,
        })
    }

    /// Opens the configured backend under `root`. The request log, when
    /// enabled, goes to `<root>/logs/requests.jsonl`.
    pub fn open(root: impl Into<PathBuf>, config: &EngineConfig) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let store = open_store(config.backend, &root)?;
        let engine = Self::new(store, config)?;
        Ok(if config.request_log {
            engine.with_request_log(RequestLog::under_root(&root))
        } else {
            engine
        })
    }

    pub fn in_memory(config: &EngineConfig) -> Result<Self> {
        Self::new(Arc::new(MemoryPostingStore::new()), config)
    }

    #[must_use]
    pub fn with_request_log(mut self, request_log: RequestLog) -> Self {
        self.request_log = Some(request_log);
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn PostingStore> {
        &self.store
    }

    #[must_use]
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    #[must_use]
    pub fn request_log(&self) -> Option<&RequestLog> {
        self.request_log.as_ref()
    }

    /// Runs `op` and appends its outcome to the request log, if one is attached.
    fn logged<T>(
        &self,
        operation: &str,
        document_id: Option<DocumentId>,
        details: serde_json::Value,
        op: impl FnOnce() -> Result<T>,
        summarize: impl FnOnce(&T) -> serde_json::Value,
    ) -> Result<T> {
        let Some(log) = self.request_log.as_ref() else {
            return op();
        };
        let request_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        let output = op();
        match &output {
            Ok(value) => {
                let details = merge_details(details, summarize(value));
                log.log_request_status(request_id, operation, started, document_id, Some(details));
            }
            Err(err) => {
                log.log_request_error(
                    request_id,
                    operation,
                    started,
                    document_id,
                    err,
                    Some(details),
                );
            }
        }
        output
    }
}

fn merge_details(mut base: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
    if let (Some(base_map), serde_json::Value::Object(extra_map)) = (base.as_object_mut(), extra) {
        base_map.extend(extra_map);
    }
    base
}
