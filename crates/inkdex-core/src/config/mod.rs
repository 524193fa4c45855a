use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

mod env;
mod search;
mod tokenizer;

use self::env::{EnvLookup, ProcessEnv, parse_enabled_default_true};
pub use search::{ScoreWeights, SearchDefaults, StoreBackend};
pub use tokenizer::{DEFAULT_IGNORE_PATTERN, TokenizerConfig};
pub(crate) use tokenizer::CJK_STOP_WORDS;

const ENV_REQUEST_LOG: &str = "INKDEX_REQUEST_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub backend: StoreBackend,
    pub tokenizer: TokenizerConfig,
    pub weights: ScoreWeights,
    pub search: SearchDefaults,
    pub request_log: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            tokenizer: TokenizerConfig::default(),
            weights: ScoreWeights::default(),
            search: SearchDefaults::default(),
            request_log: true,
        }
    }
}

impl EngineConfig {
    /// Defaults, then the optional TOML file, then `INKDEX_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        base.with_overrides(&ProcessEnv)
    }

    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(&ProcessEnv)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.search.validate()
    }

    pub(crate) fn with_overrides(mut self, env: &dyn EnvLookup) -> Result<Self> {
        if let Some(raw) = env.get(search::ENV_BACKEND) {
            self.backend = StoreBackend::parse(Some(&raw))?;
        }
        self.tokenizer.apply_env(env);
        self.weights.apply_env(env);
        self.search.apply_env(env);
        if let Some(raw) = env.get(ENV_REQUEST_LOG) {
            self.request_log = parse_enabled_default_true(Some(&raw));
        }
        self.validate()?;
        Ok(self)
    }
}
