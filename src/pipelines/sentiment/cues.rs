use super::calibration::CalibrationConfig;
use super::lexicon::{LexiconSets, PhraseMatcher};

/// Counts of cue phrases found in one text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CueCounts {
    /// Intensifier matches.
    pub intensifiers: usize,
    /// Uncertainty marker matches.
    pub uncertainty: usize,
}

/// Count intensifier and uncertainty phrases in `text`.
pub fn scan_cues(text: &str, lexicon: &LexiconSets) -> CueCounts {
    let lowered = text.to_lowercase();
    let total = |matchers: &[PhraseMatcher]| -> usize {
        matchers.iter().map(|m| m.count(&lowered)).sum()
    };

    CueCounts {
        intensifiers: total(lexicon.intensifiers()),
        uncertainty: total(lexicon.uncertainty_markers()),
    }
}

/// Confidence adjustment for a set of cue counts, clamped to the configured range.
pub fn cue_modifier(counts: CueCounts, config: &CalibrationConfig) -> f64 {
    let raw = config.intensifier_step * counts.intensifiers as f64
        - config.uncertainty_step * counts.uncertainty as f64;
    raw.clamp(config.min_cue_modifier, config.max_cue_modifier)
}
