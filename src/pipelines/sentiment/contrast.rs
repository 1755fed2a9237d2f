use tracing::debug;

use super::lexicon::LexiconSets;
use super::model::SentimentOracle;
use super::types::ScorePair;
use crate::error::Result;

/// Outcome of contrast detection for one text.
#[derive(Debug, Clone, PartialEq)]
pub enum Segmentation {
    /// No usable contrast: score the whole text once.
    Simple,
    /// Text splits around a contrast marker into two segments with opposite dominant labels.
    Mixed {
        /// The marker the text was split on.
        marker: String,
        /// Scores for the text before the marker.
        before: ScorePair,
        /// Scores for the text after the marker.
        after: ScorePair,
    },
}

impl Segmentation {
    /// Whether the mixed path applies.
    pub fn is_mixed(&self) -> bool {
        matches!(self, Segmentation::Mixed { .. })
    }
}

/// A lower-cased text split around the first occurrence of its highest-priority marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContrastSplit {
    /// The marker phrase.
    pub marker: String,
    /// Text before the marker, untrimmed.
    pub before: String,
    /// Text after the marker, untrimmed.
    pub after: String,
}

/// Find the first contrast marker (in lexicon order) present in `text` and split around it.
///
/// Returns `None` when no marker occurs, or when either side is blank.
pub fn split_on_contrast(text: &str, lexicon: &LexiconSets) -> Option<ContrastSplit> {
    let lowered = text.to_lowercase();
    let (marker, range) = lexicon
        .contrast_markers()
        .iter()
        .find_map(|m| m.find(&lowered).map(|range| (m, range)))?;

    let before = &lowered[..range.start];
    let after = &lowered[range.end..];
    if before.trim().is_empty() || after.trim().is_empty() {
        debug!(
            marker = marker.phrase(),
            "contrast marker leaves an empty side, scoring whole text"
        );
        return None;
    }

    Some(ContrastSplit {
        marker: marker.phrase().to_string(),
        before: before.to_string(),
        after: after.to_string(),
    })
}

/// Decide between the simple and mixed paths, classifying both segments when split.
///
/// A marker alone is not enough: the two segments must lean opposite ways.
pub fn segment<O: SentimentOracle + ?Sized>(
    text: &str,
    lexicon: &LexiconSets,
    oracle: &O,
) -> Result<Segmentation> {
    let Some(split) = split_on_contrast(text, lexicon) else {
        return Ok(Segmentation::Simple);
    };

    let before = oracle.classify(&split.before)?.validated()?;
    let after = oracle.classify(&split.after)?.validated()?;

    if before.dominant() == after.dominant() {
        debug!(
            marker = %split.marker,
            label = %before.dominant(),
            "both segments agree, treating as simple"
        );
        return Ok(Segmentation::Simple);
    }

    debug!(
        marker = %split.marker,
        before = %before.dominant(),
        after = %after.dominant(),
        "mixed sentiment detected"
    );
    Ok(Segmentation::Mixed {
        marker: split.marker,
        before,
        after,
    })
}
