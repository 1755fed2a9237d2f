use std::ops::Range;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// Contrast markers in priority order. The first one found in a text wins.
pub const DEFAULT_CONTRAST_MARKERS: &[&str] = &[
    "but",
    "however",
    "although",
    "even though",
    "though",
    "yet",
    "nevertheless",
    "nonetheless",
    "on the other hand",
    "whereas",
    "despite",
];

/// Words that strengthen a statement.
pub const DEFAULT_INTENSIFIERS: &[&str] = &[
    "very",
    "really",
    "extremely",
    "absolutely",
    "incredibly",
    "totally",
    "completely",
    "highly",
    "truly",
    "definitely",
    "utterly",
    "so much",
];

/// Words that hedge a statement.
pub const DEFAULT_UNCERTAINTY_MARKERS: &[&str] = &[
    "maybe",
    "perhaps",
    "might",
    "possibly",
    "probably",
    "somewhat",
    "seems",
    "unsure",
    "kind of",
    "sort of",
    "not sure",
    "i guess",
    "i think",
    "could be",
];

/// A lexicon phrase compiled to a word-boundary matcher.
///
/// Matching runs against lower-cased text. A boundary is asserted on each side
/// whose outermost character is a word character, so `"but"` never matches inside
/// `"button"` while a phrase at the very start or end of the text still matches.
/// Internal whitespace matches any run of whitespace.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    phrase: String,
    regex: Regex,
}

impl PhraseMatcher {
    /// Compile `phrase` (trimmed and lower-cased).
    pub fn new(phrase: &str) -> Result<Self> {
        let phrase = phrase.trim().to_lowercase();
        let words: Vec<&str> = phrase.split_whitespace().collect();
        let (Some(first), Some(last)) = (
            words.first().and_then(|w| w.chars().next()),
            words.last().and_then(|w| w.chars().last()),
        ) else {
            return Err(PipelineError::Config(
                "Lexicon phrases must not be empty".to_string(),
            ));
        };

        let body = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join(r"\s+");
        let lead = if is_word_char(first) { r"\b" } else { "" };
        let tail = if is_word_char(last) { r"\b" } else { "" };
        let regex = Regex::new(&format!("{lead}{body}{tail}"))?;

        Ok(Self {
            phrase: words.join(" "),
            regex,
        })
    }

    /// The normalized phrase.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Byte range of the first match in `lowered`.
    pub fn find(&self, lowered: &str) -> Option<Range<usize>> {
        self.regex.find(lowered).map(|m| m.range())
    }

    /// Number of non-overlapping matches in `lowered`.
    pub fn count(&self, lowered: &str) -> usize {
        self.regex.find_iter(lowered).count()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Phrase lists as they appear in a config file. Missing lists fall back to the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LexiconConfig {
    /// Ordered contrast markers.
    pub contrast_markers: Option<Vec<String>>,
    /// Intensifier phrases.
    pub intensifiers: Option<Vec<String>>,
    /// Uncertainty phrases.
    pub uncertainty_markers: Option<Vec<String>>,
}

/// The three fixed phrase sets the analysis reads.
///
/// Immutable once built. Share one instance across pipelines with [`Arc`].
#[derive(Debug, Clone)]
pub struct LexiconSets {
    contrast_markers: Vec<PhraseMatcher>,
    intensifiers: Vec<PhraseMatcher>,
    uncertainty_markers: Vec<PhraseMatcher>,
}

impl LexiconSets {
    /// Compile the three phrase lists. `contrast_markers` keeps its order as priority.
    pub fn new<S: AsRef<str>>(
        contrast_markers: &[S],
        intensifiers: &[S],
        uncertainty_markers: &[S],
    ) -> Result<Self> {
        Ok(Self {
            contrast_markers: compile(contrast_markers)?,
            intensifiers: compile(intensifiers)?,
            uncertainty_markers: compile(uncertainty_markers)?,
        })
    }

    /// Build from a config section, filling absent lists with the defaults.
    pub fn from_config(config: &LexiconConfig) -> Result<Self> {
        let pick = |list: &Option<Vec<String>>, fallback: &[&str]| -> Vec<String> {
            match list {
                Some(list) => list.clone(),
                None => fallback.iter().map(|s| s.to_string()).collect(),
            }
        };

        Self::new(
            &pick(&config.contrast_markers, DEFAULT_CONTRAST_MARKERS),
            &pick(&config.intensifiers, DEFAULT_INTENSIFIERS),
            &pick(&config.uncertainty_markers, DEFAULT_UNCERTAINTY_MARKERS),
        )
    }

    /// Built-in lexicon, compiled on first use and shared for the rest of the process.
    pub fn shared_default() -> Result<Arc<Self>> {
        static DEFAULT_LEXICON: OnceCell<Arc<LexiconSets>> = OnceCell::new();

        DEFAULT_LEXICON
            .get_or_try_init(|| {
                Self::new(
                    DEFAULT_CONTRAST_MARKERS,
                    DEFAULT_INTENSIFIERS,
                    DEFAULT_UNCERTAINTY_MARKERS,
                )
                .map(Arc::new)
            })
            .cloned()
    }

    /// Contrast markers in priority order.
    pub fn contrast_markers(&self) -> &[PhraseMatcher] {
        &self.contrast_markers
    }

    /// Intensifier phrases.
    pub fn intensifiers(&self) -> &[PhraseMatcher] {
        &self.intensifiers
    }

    /// Uncertainty phrases.
    pub fn uncertainty_markers(&self) -> &[PhraseMatcher] {
        &self.uncertainty_markers
    }
}

fn compile<S: AsRef<str>>(phrases: &[S]) -> Result<Vec<PhraseMatcher>> {
    phrases
        .iter()
        .map(|p| PhraseMatcher::new(p.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_whole_words_only() {
        let but = PhraseMatcher::new("but").unwrap();
        assert_eq!(but.count("the button was fine"), 0);
        assert_eq!(but.count("good but slow"), 1);
        assert_eq!(but.count("butter, but not bread"), 1);
    }

    #[test]
    fn matches_at_text_edges() {
        let very = PhraseMatcher::new("very").unwrap();
        assert_eq!(very.count("very good"), 1);
        assert_eq!(very.count("good, very"), 1);
        assert_eq!(very.count("very"), 1);
    }

    #[test]
    fn multi_word_phrases_span_whitespace_runs() {
        let matcher = PhraseMatcher::new("  Kind   Of ").unwrap();
        assert_eq!(matcher.phrase(), "kind of");
        assert_eq!(matcher.count("it was kind  of okay"), 1);
        assert_eq!(matcher.count("a kindof thing"), 0);
    }

    #[test]
    fn find_reports_byte_range() {
        let matcher = PhraseMatcher::new("however").unwrap();
        assert_eq!(matcher.find("fast, however loud"), Some(6..13));
        assert_eq!(matcher.find("fast and loud"), None);
    }

    #[test]
    fn punctuation_phrases_skip_boundary_assertion() {
        let matcher = PhraseMatcher::new("!!").unwrap();
        assert_eq!(matcher.count("great!!"), 1);
    }

    #[test]
    fn empty_phrase_is_a_config_error() {
        let err = PhraseMatcher::new("   ").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn config_falls_back_to_defaults() {
        let config = LexiconConfig {
            contrast_markers: Some(vec!["except".to_string()]),
            ..Default::default()
        };
        let lexicon = LexiconSets::from_config(&config).unwrap();
        assert_eq!(lexicon.contrast_markers().len(), 1);
        assert_eq!(lexicon.contrast_markers()[0].phrase(), "except");
        assert_eq!(lexicon.intensifiers().len(), DEFAULT_INTENSIFIERS.len());
    }

    #[test]
    fn shared_default_is_built_once() {
        let a = LexiconSets::shared_default().unwrap();
        let b = LexiconSets::shared_default().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.contrast_markers()[0].phrase(), "but");
    }
}
