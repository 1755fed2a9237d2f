use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Three-way sentiment label.
///
/// Declaration order is the tie-break order for argmax: `Positive`, then
/// `Negative`, then `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    /// Favorable stance.
    Positive,
    /// Unfavorable stance.
    Negative,
    /// No clear stance, or a balanced mix of both.
    Neutral,
}

impl SentimentLabel {
    /// All labels in tie-break order.
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
    ];

    /// Display name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw scores from a binary classifier for one text segment.
///
/// Both values lie in `[0, 1]` but are independent confidences; they need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePair {
    /// Score for the positive class.
    #[serde(rename = "Positive")]
    pub positive: f64,
    /// Score for the negative class.
    #[serde(rename = "Negative")]
    pub negative: f64,
}

impl ScorePair {
    /// Validate and build a score pair.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Inference`] if either score is non-finite or outside `[0, 1]`.
    pub fn new(positive: f64, negative: f64) -> Result<Self> {
        for (name, value) in [("Positive", positive), ("Negative", negative)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::Inference(format!(
                    "Classifier returned malformed {name} score: {value}"
                )));
            }
        }
        Ok(Self { positive, negative })
    }

    /// Re-check a pair that may have been built without [`Self::new`].
    pub(crate) fn validated(self) -> Result<Self> {
        Self::new(self.positive, self.negative)
    }

    /// Label of the larger score. Equal scores resolve to `Positive`.
    pub fn dominant(&self) -> SentimentLabel {
        if self.negative > self.positive {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Positive
        }
    }

    /// Absolute gap between the two scores.
    pub fn diff(&self) -> f64 {
        (self.positive - self.negative).abs()
    }
}

/// Normalized three-way distribution. Values are non-negative and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Share of the positive class.
    #[serde(rename = "Positive")]
    pub positive: f64,
    /// Share of the negative class.
    #[serde(rename = "Negative")]
    pub negative: f64,
    /// Share of the inferred neutral class.
    #[serde(rename = "Neutral")]
    pub neutral: f64,
}

impl Distribution {
    /// Renormalize raw non-negative masses into a distribution.
    ///
    /// Callers guarantee `positive + negative + neutral > 0`.
    pub(crate) fn normalize(positive: f64, negative: f64, neutral: f64) -> Self {
        let total = positive + negative + neutral;
        Self {
            positive: positive / total,
            negative: negative / total,
            neutral: neutral / total,
        }
    }

    /// Probability assigned to `label`.
    pub fn get(&self, label: SentimentLabel) -> f64 {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Neutral => self.neutral,
        }
    }

    /// Most probable label; exact ties go to the earlier label in [`SentimentLabel::ALL`].
    pub fn argmax(&self) -> SentimentLabel {
        let mut best = SentimentLabel::Positive;
        for label in SentimentLabel::ALL {
            if self.get(label) > self.get(best) {
                best = label;
            }
        }
        best
    }

    /// Sum of all three shares.
    pub fn total(&self) -> f64 {
        self.positive + self.negative + self.neutral
    }
}

/// Final calibrated answer for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Chosen label.
    pub sentiment: SentimentLabel,
    /// Three-way distribution the label was chosen from.
    pub probabilities: Distribution,
    /// Probability of `sentiment` adjusted by linguistic cues, clamped to the configured range.
    pub confidence: f64,
}
