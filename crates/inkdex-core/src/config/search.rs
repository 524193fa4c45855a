use serde::{Deserialize, Serialize};

use crate::error::{InkdexError, Result};

use super::env::{EnvLookup, read_usize, read_weight};

pub(crate) const ENV_BACKEND: &str = "INKDEX_BACKEND";
const ENV_WEIGHT_FREQUENCY: &str = "INKDEX_WEIGHT_FREQUENCY";
const ENV_WEIGHT_LOCATION: &str = "INKDEX_WEIGHT_LOCATION";
const ENV_WEIGHT_DISTANCE: &str = "INKDEX_WEIGHT_DISTANCE";
const ENV_SEARCH_LIMIT: &str = "INKDEX_SEARCH_LIMIT";

const DEFAULT_SEARCH_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

impl StoreBackend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }

    pub(crate) fn parse(raw: Option<&str>) -> Result<Self> {
        let normalized = raw.map(|value| value.trim().to_ascii_lowercase());
        match normalized.as_deref() {
            None | Some("sqlite") => Ok(Self::Sqlite),
            Some("memory") => Ok(Self::Memory),
            Some(other) => Err(InkdexError::Validation(format!(
                "invalid {ENV_BACKEND}: {other} (expected sqlite|memory)"
            ))),
        }
    }
}

/// Per-scorer multipliers applied when the normalized scores are summed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub frequency: f64,
    pub location: f64,
    pub distance: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            location: 1.0,
            distance: 1.0,
        }
    }
}

impl ScoreWeights {
    pub(crate) fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("frequency", self.frequency),
            ("location", self.location),
            ("distance", self.distance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(InkdexError::InvalidConfig(format!(
                    "weight {name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub(super) fn apply_env(&mut self, env: &dyn EnvLookup) {
        if let Some(value) = read_weight(env, ENV_WEIGHT_FREQUENCY) {
            self.frequency = value;
        }
        if let Some(value) = read_weight(env, ENV_WEIGHT_LOCATION) {
            self.location = value;
        }
        if let Some(value) = read_weight(env, ENV_WEIGHT_DISTANCE) {
            self.distance = value;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    pub limit: usize,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl SearchDefaults {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(InkdexError::InvalidConfig(
                "search limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub(super) fn apply_env(&mut self, env: &dyn EnvLookup) {
        self.limit = read_usize(env, ENV_SEARCH_LIMIT, self.limit, 1);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn backend_parser_defaults_to_sqlite_when_unset() {
        assert_eq!(
            StoreBackend::parse(None).expect("default backend"),
            StoreBackend::Sqlite
        );
    }

    #[test]
    fn backend_parser_accepts_memory() {
        assert_eq!(
            StoreBackend::parse(Some(" Memory ")).expect("memory backend"),
            StoreBackend::Memory
        );
    }

    #[test]
    fn backend_parser_rejects_unknown_values() {
        assert!(StoreBackend::parse(Some("postgres")).is_err());
        assert!(StoreBackend::parse(Some("")).is_err());
    }

    #[test]
    fn weights_ignore_negative_and_unparsable_overrides() {
        let env = HashMap::from([
            (ENV_WEIGHT_FREQUENCY, "2.5"),
            (ENV_WEIGHT_LOCATION, "-1"),
            (ENV_WEIGHT_DISTANCE, "lots"),
        ]);
        let mut weights = ScoreWeights::default();
        weights.apply_env(&env);
        assert_eq!(weights.frequency, 2.5);
        assert_eq!(weights.location, 1.0);
        assert_eq!(weights.distance, 1.0);
    }

    #[test]
    fn weights_validation_rejects_nan() {
        let weights = ScoreWeights {
            distance: f64::NAN,
            ..ScoreWeights::default()
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn search_defaults_reject_zero_limit() {
        assert!(SearchDefaults { limit: 0 }.validate().is_err());
        assert!(SearchDefaults::default().validate().is_ok());
    }

    #[test]
    fn search_limit_override_respects_minimum() {
        let mut defaults = SearchDefaults::default();
        defaults.apply_env(&HashMap::from([(ENV_SEARCH_LIMIT, "0")]));
        assert_eq!(defaults.limit, DEFAULT_SEARCH_LIMIT);
        defaults.apply_env(&HashMap::from([(ENV_SEARCH_LIMIT, "20")]));
        assert_eq!(defaults.limit, 20);
    }
}
