//! Word segmentation and the stop-word/punctuation filter.
//!
//! Text is split on Unicode word boundaries (UAX #29). Every segment, including
//! whitespace and punctuation runs, is yielded, so the ignore rules decide what
//! reaches the index. Runs of Han ideographs have no spaces to split on; they
//! are segmented with the jieba dictionary instead, in search mode when
//! indexing (a long word also yields its dictionary sub-words) and in exact mode
//! for queries.
//!
//! Positions handed to the index count only tokens that survive the filter: for
//! `"the cat sat"` with `the` ignored, `cat` is at 0 and `sat` at 1.

use std::collections::{HashMap, HashSet, VecDeque};
use std::iter::Peekable;
use std::sync::{Arc, OnceLock};

use jieba_rs::Jieba;
use regex::Regex;
use stop_words::{LANGUAGE, get};
use unicode_segmentation::{UWordBoundIndices, UnicodeSegmentation};

use crate::config::{CJK_STOP_WORDS, TokenizerConfig};
use crate::error::Result;

const HAN_RUN_PATTERN: &str = r"^\p{Han}+$";

/// Loaded on first use and shared by every tokenizer in the process.
static DICTIONARY: OnceLock<Jieba> = OnceLock::new();

fn dictionary() -> &'static Jieba {
    DICTIONARY.get_or_init(Jieba::new)
}

/// Stop-word set plus the punctuation/whitespace pattern.
#[derive(Debug)]
pub struct IgnoreRules {
    stop_words: HashSet<String>,
    pattern: Regex,
}

impl IgnoreRules {
    pub fn from_config(config: &TokenizerConfig) -> Result<Self> {
        let mut stop_words = HashSet::new();
        if config.builtin_stop_words {
            stop_words.extend(get(LANGUAGE::English).iter().map(|word| word.to_lowercase()));
            stop_words.extend(CJK_STOP_WORDS.iter().map(ToString::to_string));
        }
        stop_words.extend(
            config
                .extra_stop_words
                .iter()
                .map(|word| word.trim().to_lowercase())
                .filter(|word| !word.is_empty()),
        );
        Ok(Self {
            stop_words,
            pattern: Regex::new(&config.ignore_pattern)?,
        })
    }

    #[must_use]
    pub fn should_ignore(&self, token: &str) -> bool {
        token.is_empty() || self.is_stop_word(token) || self.pattern.is_match(token)
    }

    /// Stop words are stored lowercased and match tokens in any case.
    fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
            || (token.chars().any(char::is_uppercase)
                && self.stop_words.contains(token.to_lowercase().as_str()))
    }

    #[must_use]
    pub fn stop_word_count(&self) -> usize {
        self.stop_words.len()
    }
}

/// How runs of Han ideographs are cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentMode {
    /// Every dictionary word plus the sub-words of long ones.
    Index,
    /// The single most probable segmentation.
    Query,
}

/// Dictionary segmenter for Han runs.
pub struct CjkSegmenter {
    dictionary: &'static Jieba,
    han_run: Regex,
}

impl std::fmt::Debug for CjkSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CjkSegmenter").finish_non_exhaustive()
    }
}

impl CjkSegmenter {
    fn new() -> Result<Self> {
        Ok(Self {
            dictionary: dictionary(),
            han_run: Regex::new(HAN_RUN_PATTERN)?,
        })
    }

    fn is_han(&self, segment: &str) -> bool {
        self.han_run.is_match(segment)
    }

    fn cut<'t>(&self, run: &'t str, mode: SegmentMode) -> Vec<&'t str> {
        match mode {
            SegmentMode::Index => self.dictionary.cut_for_search(run, true),
            SegmentMode::Query => self.dictionary.cut(run, true),
        }
    }
}

/// Cheap to clone; the rules and the segmenter are shared.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    lowercase: bool,
    rules: Arc<IgnoreRules>,
    segmenter: Option<Arc<CjkSegmenter>>,
}

impl Tokenizer {
    pub fn new(config: &TokenizerConfig) -> Result<Self> {
        let segmenter = if config.segment_cjk {
            Some(Arc::new(CjkSegmenter::new()?))
        } else {
            None
        };
        Ok(Self {
            lowercase: config.lowercase,
            rules: Arc::new(IgnoreRules::from_config(config)?),
            segmenter,
        })
    }

    /// Every segment of `text`, normalized, in order. Ignored tokens are included.
    pub fn tokenize<'a>(&'a self, text: &'a str, mode: SegmentMode) -> Tokens<'a> {
        Tokens {
            text,
            segments: text.split_word_bound_indices().peekable(),
            pending: VecDeque::new(),
            segmenter: self.segmenter.as_deref(),
            mode,
            lowercase: self.lowercase,
        }
    }

    #[must_use]
    pub fn should_ignore(&self, token: &str) -> bool {
        self.rules.should_ignore(token)
    }

    #[must_use]
    pub fn rules(&self) -> &IgnoreRules {
        &self.rules
    }

    /// `(position, term)` pairs for indexing; positions are offsets within the
    /// filtered sequence.
    pub fn indexable_terms<'a>(
        &'a self,
        text: &'a str,
    ) -> impl Iterator<Item = (u32, String)> + 'a {
        self.tokenize(text, SegmentMode::Index)
            .filter(|token| !self.should_ignore(token))
            .enumerate()
            .map(|(position, token)| (u32::try_from(position).unwrap_or(u32::MAX), token))
    }

    /// Query terms in order. Duplicates are kept.
    #[must_use]
    pub fn query_terms(&self, query: &str) -> Vec<String> {
        self.tokenize(query, SegmentMode::Query)
            .filter(|token| !self.should_ignore(token))
            .collect()
    }

    /// Counts over the same terms indexing would store.
    #[must_use]
    pub fn term_counts(&self, text: &str) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for token in self
            .tokenize(text, SegmentMode::Index)
            .filter(|token| !self.should_ignore(token))
        {
            *counts.entry(token).or_insert(0) += 1;
        }
        counts
    }
}

/// Lazy token stream over borrowed text. Single pass; not restartable.
pub struct Tokens<'a> {
    text: &'a str,
    segments: Peekable<UWordBoundIndices<'a>>,
    pending: VecDeque<&'a str>,
    segmenter: Option<&'a CjkSegmenter>,
    mode: SegmentMode,
    lowercase: bool,
}

impl<'a> Tokens<'a> {
    fn next_raw(&mut self) -> Option<&'a str> {
        if let Some(word) = self.pending.pop_front() {
            return Some(word);
        }
        let (start, segment) = self.segments.next()?;
        let Some(segmenter) = self.segmenter else {
            return Some(segment);
        };
        if !segmenter.is_han(segment) {
            return Some(segment);
        }

        // UAX #29 yields one segment per ideograph; rejoin the run first.
        let mut end = start + segment.len();
        while let Some(&(next_start, next)) = self.segments.peek() {
            if !segmenter.is_han(next) {
                break;
            }
            end = next_start + next.len();
            self.segments.next();
        }
        let text = self.text;
        let mut words = segmenter.cut(&text[start..end], self.mode).into_iter();
        let first = words.next();
        self.pending.extend(words);
        first.or(Some(segment))
    }
}

impl Iterator for Tokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_raw()?;
        Some(if self.lowercase {
            token.to_lowercase()
        } else {
            token.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer_with(stop_words: &[&str]) -> Tokenizer {
        Tokenizer::new(&TokenizerConfig::with_stop_words(stop_words.iter().copied()))
            .expect("tokenizer")
    }

    #[test]
    fn tokenize_yields_every_segment_lowercased() {
        let tokenizer = tokenizer_with(&[]);
        let tokens = tokenizer
            .tokenize("Hello, World", SegmentMode::Query)
            .collect::<Vec<_>>();
        assert_eq!(tokens, vec!["hello", ",", " ", "world"]);
    }

    #[test]
    fn tokenize_can_preserve_case() {
        let config = TokenizerConfig {
            lowercase: false,
            ..TokenizerConfig::with_stop_words(Vec::<String>::new())
        };
        let tokenizer = Tokenizer::new(&config).expect("tokenizer");
        assert_eq!(tokenizer.query_terms("Rust Tokio"), vec!["Rust", "Tokio"]);
    }

    #[test]
    fn should_ignore_flags_stop_words_punctuation_whitespace_and_underscores() {
        let tokenizer = tokenizer_with(&["the"]);
        assert!(tokenizer.should_ignore("the"));
        assert!(tokenizer.should_ignore(" "));
        assert!(tokenizer.should_ignore("\n\t"));
        assert!(tokenizer.should_ignore("."));
        assert!(tokenizer.should_ignore("__"));
        assert!(tokenizer.should_ignore(""));
        assert!(!tokenizer.should_ignore("cat"));
        assert!(!tokenizer.should_ignore("snake_case"));
    }

    #[test]
    fn indexable_positions_skip_ignored_tokens() {
        let tokenizer = tokenizer_with(&["the"]);
        let terms = tokenizer.indexable_terms("the cat sat").collect::<Vec<_>>();
        assert_eq!(terms, vec![(0, "cat".to_string()), (1, "sat".to_string())]);
    }

    #[test]
    fn indexable_positions_are_contiguous_across_punctuation() {
        let tokenizer = tokenizer_with(&[]);
        let terms = tokenizer
            .indexable_terms("cat, (dog) -- cat!")
            .collect::<Vec<_>>();
        assert_eq!(
            terms,
            vec![
                (0, "cat".to_string()),
                (1, "dog".to_string()),
                (2, "cat".to_string()),
            ]
        );
    }

    #[test]
    fn han_runs_are_cut_into_dictionary_words() {
        let tokenizer = Tokenizer::new(&TokenizerConfig::default()).expect("tokenizer");
        assert_eq!(tokenizer.query_terms("喜欢"), vec!["喜欢"]);
        assert_eq!(tokenizer.query_terms("rust 喜欢"), vec!["rust", "喜欢"]);

        let indexed = tokenizer
            .indexable_terms("欢迎大家，恭喜")
            .map(|(_, term)| term)
            .collect::<Vec<_>>();
        assert!(indexed.contains(&"欢迎".to_string()));
        assert!(!indexed.iter().any(|term| term == "喜欢" || term == "喜"));
    }

    #[test]
    fn particles_inside_words_survive_while_standalone_particles_are_ignored() {
        let tokenizer = Tokenizer::new(&TokenizerConfig::default()).expect("tokenizer");
        let terms = tokenizer.query_terms("这次旅行的目的");
        assert!(terms.contains(&"目的".to_string()));
        assert!(!terms.contains(&"目".to_string()));
        assert!(!terms.contains(&"的".to_string()));

        let indexed = tokenizer
            .indexable_terms("这次旅行的目的")
            .collect::<Vec<_>>();
        assert_eq!(indexed.last().map(|(_, term)| term.as_str()), Some("目的"));
        for (expected, (position, _)) in indexed.iter().enumerate() {
            assert_eq!(*position as usize, expected);
        }
    }

    #[test]
    fn index_mode_adds_sub_words_of_long_words() {
        let tokenizer = Tokenizer::new(&TokenizerConfig::default()).expect("tokenizer");
        assert_eq!(
            tokenizer.query_terms("中华人民共和国"),
            vec!["中华人民共和国"]
        );
        let indexed = tokenizer.term_counts("中华人民共和国");
        assert!(indexed.contains_key("中华人民共和国"));
        assert!(indexed.contains_key("人民"));
        assert!(indexed.contains_key("共和国"));
    }

    #[test]
    fn han_segmentation_can_be_disabled() {
        let config = TokenizerConfig {
            segment_cjk: false,
            ..TokenizerConfig::default()
        };
        let tokenizer = Tokenizer::new(&config).expect("tokenizer");
        assert_eq!(tokenizer.query_terms("喜欢"), vec!["喜", "欢"]);
    }

    #[test]
    fn stop_words_match_regardless_of_case_when_case_is_preserved() {
        let config = TokenizerConfig {
            lowercase: false,
            ..TokenizerConfig::with_stop_words(["the"])
        };
        let tokenizer = Tokenizer::new(&config).expect("tokenizer");
        assert!(tokenizer.should_ignore("The"));
        assert!(tokenizer.should_ignore("THE"));
        assert_eq!(tokenizer.query_terms("The Rust book"), vec!["Rust", "book"]);
    }

    #[test]
    fn builtin_english_stop_words_are_loaded() {
        let tokenizer = Tokenizer::new(&TokenizerConfig::default()).expect("tokenizer");
        assert!(tokenizer.should_ignore("the"));
        assert!(tokenizer.should_ignore("and"));
        assert!(tokenizer.rules().stop_word_count() > CJK_STOP_WORDS.len());
    }

    #[test]
    fn query_terms_keep_duplicates_in_order() {
        let tokenizer = tokenizer_with(&[]);
        assert_eq!(
            tokenizer.query_terms("Cat dog CAT"),
            vec!["cat", "dog", "cat"]
        );
    }

    #[test]
    fn term_counts_skip_ignored_tokens() {
        let tokenizer = tokenizer_with(&["a"]);
        let counts = tokenizer.term_counts("a rose, a Rose; a tulip");
        assert_eq!(counts.get("rose"), Some(&2));
        assert_eq!(counts.get("tulip"), Some(&1));
        assert_eq!(counts.get("a"), None);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn invalid_ignore_pattern_is_a_config_error() {
        let config = TokenizerConfig {
            ignore_pattern: "(".to_string(),
            ..TokenizerConfig::default()
        };
        let err = Tokenizer::new(&config).expect_err("bad regex");
        assert_eq!(err.code(), "REGEX_ERROR");
    }

    #[test]
    fn empty_text_yields_no_tokens() {
        let tokenizer = tokenizer_with(&[]);
        assert_eq!(tokenizer.tokenize("", SegmentMode::Index).count(), 0);
        assert!(tokenizer.query_terms("   ").is_empty());
    }
}
