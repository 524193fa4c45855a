use serde::{Deserialize, Serialize};

use super::env::{EnvLookup, read_list};

const ENV_STOP_WORDS: &str = "INKDEX_STOP_WORDS";

/// Tokens starting with a non-word character, whitespace, or an underscore are ignored.
pub const DEFAULT_IGNORE_PATTERN: &str = r"^(\W+|\s+|_+)";

/// Particles the English stop-word list does not cover.
pub(crate) const CJK_STOP_WORDS: [&str; 2] = ["是", "的"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub lowercase: bool,
    /// Segment runs of Han ideographs with the jieba dictionary instead of one
    /// token per character.
    pub segment_cjk: bool,
    pub builtin_stop_words: bool,
    pub extra_stop_words: Vec<String>,
    pub ignore_pattern: String,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            segment_cjk: true,
            builtin_stop_words: true,
            extra_stop_words: Vec::new(),
            ignore_pattern: DEFAULT_IGNORE_PATTERN.to_string(),
        }
    }
}

impl TokenizerConfig {
    /// Config with only the given stop words and the default ignore pattern.
    #[must_use]
    pub fn with_stop_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            builtin_stop_words: false,
            extra_stop_words: words.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub(super) fn apply_env(&mut self, env: &dyn EnvLookup) {
        for word in read_list(env, ENV_STOP_WORDS) {
            if !self.extra_stop_words.contains(&word) {
                self.extra_stop_words.push(word);
            }
        }
    }
}
