/// Source of override values. The process environment in production, a map in tests.
pub(crate) trait EnvLookup {
    fn get(&self, name: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvLookup for std::collections::HashMap<&str, &str> {
    fn get(&self, name: &str) -> Option<String> {
        std::collections::HashMap::get(self, name).map(|value| (*value).to_string())
    }
}

#[must_use]
pub(super) fn read_non_empty(env: &dyn EnvLookup, name: &str) -> Option<String> {
    env.get(name)
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[must_use]
pub(super) fn read_usize(
    env: &dyn EnvLookup,
    name: &str,
    default_value: usize,
    min_value: usize,
) -> usize {
    env.get(name)
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| *value >= min_value)
        .unwrap_or(default_value)
}

#[must_use]
pub(super) fn read_weight(env: &dyn EnvLookup, name: &str) -> Option<f64> {
    env.get(name)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value >= 0.0)
}

#[must_use]
pub(super) fn read_list(env: &dyn EnvLookup, name: &str) -> Vec<String> {
    read_non_empty(env, name)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[must_use]
pub(super) fn parse_enabled_default_true(raw: Option<&str>) -> bool {
    !matches!(
        raw.map(|value| value.trim().to_ascii_lowercase())
            .as_deref(),
        Some("off" | "none" | "0" | "false")
    )
}
