//! Neutral inference, mixed blending and the final decision.
//!
//! The thresholds below were picked empirically. They move label boundaries, so
//! they live in [`CalibrationConfig`] rather than inline.

use serde::Deserialize;

use super::types::{Distribution, ScorePair, SentimentLabel, SentimentResult};
use crate::error::{PipelineError, Result};

/// Simple policy: below this gap the scores count as close.
pub const SIMPLE_CLOSE_DIFF: f64 = 0.2;
/// Simple policy: below this gap the scores count as moderately apart.
pub const SIMPLE_MODERATE_DIFF: f64 = 0.4;
/// Simple policy: neutral mass at zero gap.
pub const SIMPLE_NEUTRAL_PEAK: f64 = 0.6;
/// Simple policy: neutral mass at the start of the moderate region.
pub const SIMPLE_NEUTRAL_MODERATE: f64 = 0.3;
/// Simple policy: neutral floor once the scores are far apart.
pub const SIMPLE_NEUTRAL_FLOOR: f64 = 0.05;

/// Mixed policy: below this gap neutral decays linearly from the peak.
pub const MIXED_CLOSE_DIFF: f64 = 0.3;
/// Mixed policy: neutral mass at zero gap.
pub const MIXED_NEUTRAL_PEAK: f64 = 0.7;
/// Mixed policy: neutral floor.
pub const MIXED_NEUTRAL_FLOOR: f64 = 0.2;
/// Mixed path: a blended gap below this forces `Neutral`.
pub const MIXED_NEUTRAL_OVERRIDE_DIFF: f64 = 0.15;

/// Weight of the segment before the contrast marker.
pub const BEFORE_WEIGHT: f64 = 0.4;
/// Weight of the segment after the contrast marker.
pub const AFTER_WEIGHT: f64 = 0.6;
/// Cap on each blended score.
pub const BLEND_CAP: f64 = 0.85;

/// Modifier added per intensifier.
pub const INTENSIFIER_STEP: f64 = 0.05;
/// Modifier subtracted per uncertainty marker.
pub const UNCERTAINTY_STEP: f64 = 0.10;
/// Lower clamp for the cue modifier.
pub const MIN_CUE_MODIFIER: f64 = -0.30;
/// Upper clamp for the cue modifier.
pub const MAX_CUE_MODIFIER: f64 = 0.15;

/// Lowest confidence ever reported.
pub const MIN_CONFIDENCE: f64 = 0.40;
/// Highest confidence ever reported.
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Tunable constants for calibration. Defaults are the module constants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationConfig {
    /// Below this gap the simple neutral mass decays from its peak.
    pub simple_close_diff: f64,
    /// Below this gap (and above the close one) the moderate branch applies.
    pub simple_moderate_diff: f64,
    /// Simple neutral mass at a gap of zero.
    pub simple_neutral_peak: f64,
    /// Simple neutral mass at the start of the moderate branch.
    pub simple_neutral_moderate: f64,
    /// Simple neutral mass for clear-cut predictions.
    pub simple_neutral_floor: f64,
    /// Below this blended gap the mixed neutral mass decays from its peak.
    pub mixed_close_diff: f64,
    /// Mixed neutral mass at a blended gap of zero.
    pub mixed_neutral_peak: f64,
    /// Mixed neutral mass for clearly leaning blends.
    pub mixed_neutral_floor: f64,
    /// Blended gaps below this force a `Neutral` label.
    pub mixed_neutral_override_diff: f64,
    /// Weight of the segment before the contrast marker.
    pub before_weight: f64,
    /// Weight of the segment after the contrast marker.
    pub after_weight: f64,
    /// Upper cap for each blended score.
    pub blend_cap: f64,
    /// Modifier added per intensifier.
    pub intensifier_step: f64,
    /// Modifier subtracted per uncertainty marker.
    pub uncertainty_step: f64,
    /// Lower clamp for the cue modifier.
    pub min_cue_modifier: f64,
    /// Upper clamp for the cue modifier.
    pub max_cue_modifier: f64,
    /// Lowest confidence ever reported.
    pub min_confidence: f64,
    /// Highest confidence ever reported.
    pub max_confidence: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            simple_close_diff: SIMPLE_CLOSE_DIFF,
            simple_moderate_diff: SIMPLE_MODERATE_DIFF,
            simple_neutral_peak: SIMPLE_NEUTRAL_PEAK,
            simple_neutral_moderate: SIMPLE_NEUTRAL_MODERATE,
            simple_neutral_floor: SIMPLE_NEUTRAL_FLOOR,
            mixed_close_diff: MIXED_CLOSE_DIFF,
            mixed_neutral_peak: MIXED_NEUTRAL_PEAK,
            mixed_neutral_floor: MIXED_NEUTRAL_FLOOR,
            mixed_neutral_override_diff: MIXED_NEUTRAL_OVERRIDE_DIFF,
            before_weight: BEFORE_WEIGHT,
            after_weight: AFTER_WEIGHT,
            blend_cap: BLEND_CAP,
            intensifier_step: INTENSIFIER_STEP,
            uncertainty_step: UNCERTAINTY_STEP,
            min_cue_modifier: MIN_CUE_MODIFIER,
            max_cue_modifier: MAX_CUE_MODIFIER,
            min_confidence: MIN_CONFIDENCE,
            max_confidence: MAX_CONFIDENCE,
        }
    }
}

impl CalibrationConfig {
    /// Reject settings that could produce a zero total or an inverted clamp.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("simple_close_diff", self.simple_close_diff),
            ("simple_moderate_diff", self.simple_moderate_diff),
            ("simple_neutral_peak", self.simple_neutral_peak),
            ("simple_neutral_moderate", self.simple_neutral_moderate),
            ("simple_neutral_floor", self.simple_neutral_floor),
            ("mixed_close_diff", self.mixed_close_diff),
            ("mixed_neutral_peak", self.mixed_neutral_peak),
            ("mixed_neutral_floor", self.mixed_neutral_floor),
            ("mixed_neutral_override_diff", self.mixed_neutral_override_diff),
            ("before_weight", self.before_weight),
            ("after_weight", self.after_weight),
            ("blend_cap", self.blend_cap),
            ("intensifier_step", self.intensifier_step),
            ("uncertainty_step", self.uncertainty_step),
            ("min_confidence", self.min_confidence),
            ("max_confidence", self.max_confidence),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(PipelineError::Config(format!(
                "Calibration field '{name}' must be finite and non-negative, got {value}"
            )));
        }

        if self.simple_close_diff > self.simple_moderate_diff {
            return Err(PipelineError::Config(
                "simple_close_diff must not exceed simple_moderate_diff".to_string(),
            ));
        }
        if self.simple_neutral_floor <= 0.0 || self.mixed_neutral_floor <= 0.0 {
            return Err(PipelineError::Config(
                "Neutral floors must be positive".to_string(),
            ));
        }
        // Both decaying branches must stay above zero across their whole region.
        if self.simple_neutral_peak - 2.0 * self.simple_close_diff < 0.0
            || self.simple_neutral_moderate - (self.simple_moderate_diff - self.simple_close_diff)
                < 0.0
            || self.mixed_neutral_peak - self.mixed_close_diff < 0.0
        {
            return Err(PipelineError::Config(
                "Neutral branches must stay non-negative over their region".to_string(),
            ));
        }
        // Cue bounds may be negative, so only finiteness is required.
        for (name, value) in [
            ("min_cue_modifier", self.min_cue_modifier),
            ("max_cue_modifier", self.max_cue_modifier),
        ] {
            if !value.is_finite() {
                return Err(PipelineError::Config(format!(
                    "Calibration field '{name}' must be finite, got {value}"
                )));
            }
        }
        if self.min_cue_modifier > self.max_cue_modifier {
            return Err(PipelineError::Config(
                "min_cue_modifier must not exceed max_cue_modifier".to_string(),
            ));
        }
        if self.min_confidence > self.max_confidence || self.max_confidence > 1.0 {
            return Err(PipelineError::Config(
                "Confidence range must satisfy 0 <= min <= max <= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Neutral mass for a single, unsplit text.
pub fn simple_neutral(scores: ScorePair, config: &CalibrationConfig) -> f64 {
    let diff = scores.diff();
    if diff < config.simple_close_diff {
        config.simple_neutral_peak - 2.0 * diff
    } else if diff < config.simple_moderate_diff {
        config.simple_neutral_moderate - (diff - config.simple_close_diff)
    } else {
        config.simple_neutral_floor
    }
}

/// Neutral mass for blended mixed-sentiment scores.
pub fn mixed_neutral(blended: ScorePair, config: &CalibrationConfig) -> f64 {
    let diff = blended.diff();
    if diff < config.mixed_close_diff {
        config.mixed_neutral_peak - diff
    } else {
        config.mixed_neutral_floor
    }
}

/// Three-way distribution for an unsplit text.
pub fn simple_distribution(scores: ScorePair, config: &CalibrationConfig) -> Distribution {
    let neutral = simple_neutral(scores, config);
    Distribution::normalize(scores.positive, scores.negative, neutral)
}

/// Three-way distribution for blended scores.
pub fn mixed_distribution(blended: ScorePair, config: &CalibrationConfig) -> Distribution {
    let neutral = mixed_neutral(blended, config);
    Distribution::normalize(blended.positive, blended.negative, neutral)
}

/// Weight the two segments (after counts more) and cap each blended score.
pub fn blend(before: ScorePair, after: ScorePair, config: &CalibrationConfig) -> ScorePair {
    let mix = |b: f64, a: f64| {
        (b * config.before_weight + a * config.after_weight).min(config.blend_cap)
    };

    ScorePair {
        positive: mix(before.positive, after.positive),
        negative: mix(before.negative, after.negative),
    }
}

/// Label for the mixed path: near-balanced blends are forced to `Neutral`.
pub fn mixed_label(blended: ScorePair, config: &CalibrationConfig) -> SentimentLabel {
    if blended.diff() < config.mixed_neutral_override_diff {
        SentimentLabel::Neutral
    } else {
        blended.dominant()
    }
}

/// Attach the cue-adjusted, clamped confidence to a chosen label.
pub fn finalize(
    sentiment: SentimentLabel,
    probabilities: Distribution,
    cue_modifier: f64,
    config: &CalibrationConfig,
) -> SentimentResult {
    let confidence = (probabilities.get(sentiment) + cue_modifier)
        .clamp(config.min_confidence, config.max_confidence);

    SentimentResult {
        sentiment,
        probabilities,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(positive: f64, negative: f64) -> ScorePair {
        ScorePair::new(positive, negative).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn simple_neutral_regions() {
        let config = CalibrationConfig::default();
        assert!(close(simple_neutral(pair(0.5, 0.5), &config), 0.6));
        assert!(close(simple_neutral(pair(0.55, 0.45), &config), 0.4));
        assert!(close(simple_neutral(pair(0.65, 0.35), &config), 0.2));
        assert!(close(simple_neutral(pair(0.9, 0.1), &config), 0.05));
    }

    #[test]
    fn simple_neutral_non_increasing_within_each_region() {
        let config = CalibrationConfig::default();
        let regions = [(0.0, 0.199), (0.2, 0.399), (0.4, 1.0)];

        for (start, end) in regions {
            let mut previous = f64::INFINITY;
            let steps = 50;
            for i in 0..=steps {
                let diff = start + (end - start) * i as f64 / steps as f64;
                let neutral = simple_neutral(pair(diff, 0.0), &config);
                assert!(neutral <= previous + 1e-12, "diff {diff}");
                previous = neutral;
            }
        }
    }

    #[test]
    fn distributions_sum_to_one() {
        let config = CalibrationConfig::default();
        let grid = [0.0, 0.07, 0.19, 0.2, 0.33, 0.5, 0.71, 0.99, 1.0];

        for &p in &grid {
            for &n in &grid {
                for dist in [
                    simple_distribution(pair(p, n), &config),
                    mixed_distribution(blend(pair(p, n), pair(n, p), &config), &config),
                ] {
                    assert!((dist.total() - 1.0).abs() < 1e-9);
                    assert!(dist.positive >= 0.0 && dist.negative >= 0.0 && dist.neutral >= 0.0);
                }
            }
        }
    }

    #[test]
    fn simple_example_distribution() {
        let config = CalibrationConfig::default();
        let dist = simple_distribution(pair(0.9, 0.1), &config);
        assert!((dist.positive - 0.9 / 1.05).abs() < 1e-9);
        assert!((dist.negative - 0.1 / 1.05).abs() < 1e-9);
        assert!((dist.neutral - 0.05 / 1.05).abs() < 1e-9);
        assert_eq!(dist.argmax(), SentimentLabel::Positive);
    }

    #[test]
    fn blend_weights_after_segment_and_caps() {
        let config = CalibrationConfig::default();
        let blended = blend(pair(0.9, 0.1), pair(0.1, 0.9), &config);
        assert!(close(blended.positive, 0.42));
        assert!(close(blended.negative, 0.58));

        let capped = blend(pair(1.0, 0.0), pair(1.0, 0.0), &config);
        assert!(close(capped.positive, 0.85));
        assert!(close(capped.negative, 0.0));
    }

    #[test]
    fn mixed_example_distribution() {
        let config = CalibrationConfig::default();
        let blended = blend(pair(0.9, 0.1), pair(0.1, 0.9), &config);
        assert!(close(mixed_neutral(blended, &config), 0.54));

        let dist = mixed_distribution(blended, &config);
        assert!((dist.positive - 0.42 / 1.54).abs() < 1e-9);
        assert!((dist.negative - 0.58 / 1.54).abs() < 1e-9);
        assert!((dist.neutral - 0.54 / 1.54).abs() < 1e-9);
        assert_eq!(mixed_label(blended, &config), SentimentLabel::Negative);
    }

    #[test]
    fn near_balanced_blend_is_forced_neutral() {
        let config = CalibrationConfig::default();
        let blended = pair(0.5, 0.4);
        // Positive would win argmax, the override still picks Neutral.
        assert_eq!(mixed_label(blended, &config), SentimentLabel::Neutral);
        assert_eq!(mixed_label(pair(0.3, 0.5), &config), SentimentLabel::Negative);
    }

    #[test]
    fn confidence_is_clamped_on_both_ends() {
        let config = CalibrationConfig::default();
        let dist = Distribution::normalize(0.3, 0.3, 0.4);
        let low = finalize(SentimentLabel::Neutral, dist, -0.30, &config);
        assert_eq!(low.confidence, 0.40);

        let dist = Distribution::normalize(0.97, 0.01, 0.02);
        let high = finalize(SentimentLabel::Positive, dist, 0.15, &config);
        assert_eq!(high.confidence, 0.95);

        let dist = Distribution::normalize(0.9, 0.1, 0.05);
        let plain = finalize(SentimentLabel::Positive, dist, 0.0, &config);
        assert!(close(plain.confidence, 0.9 / 1.05));
    }

    #[test]
    fn config_validation_catches_inverted_ranges() {
        assert!(CalibrationConfig::default().validate().is_ok());

        let config = CalibrationConfig {
            min_confidence: 0.9,
            max_confidence: 0.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));

        let config = CalibrationConfig {
            simple_neutral_floor: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        for config in [
            CalibrationConfig {
                max_cue_modifier: f64::NAN,
                ..Default::default()
            },
            CalibrationConfig {
                min_cue_modifier: f64::NEG_INFINITY,
                ..Default::default()
            },
        ] {
            assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
        }
    }

    #[test]
    fn config_deserializes_partial_json() {
        let config: CalibrationConfig =
            serde_json::from_str(r#"{"mixed_neutral_override_diff": 0.1}"#).unwrap();
        assert_eq!(config.mixed_neutral_override_diff, 0.1);
        assert_eq!(config.blend_cap, BLEND_CAP);
    }
}
