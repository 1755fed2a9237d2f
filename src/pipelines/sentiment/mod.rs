//! Calibrated sentiment analysis.
//!
//! Classify text as `Positive`, `Negative`, or `Neutral` on top of a binary
//! classifier. The classifier only scores positive vs. negative; this module
//! infers a neutral share from how close those scores are, splits contrastive
//! sentences ("great food, but slow service") and weighs the second half more,
//! and nudges the confidence up or down for intensifiers and hedges.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use candle_sentiment::sentiment::{SentimentAnalysisPipelineBuilder, ModernBertSize};
//!
//! # fn main() -> candle_sentiment::error::Result<()> {
//! let pipeline = SentimentAnalysisPipelineBuilder::modernbert(ModernBertSize::Base).build()?;
//!
//! let result = pipeline.analyze("The food was great but the service was terrible")?;
//! println!("{} ({:.2})", result.sentiment, result.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! # Batch Inference
//!
//! ```rust,no_run
//! # use candle_sentiment::sentiment::{SentimentAnalysisPipelineBuilder, ModernBertSize};
//! # fn main() -> candle_sentiment::error::Result<()> {
//! # let pipeline = SentimentAnalysisPipelineBuilder::modernbert(ModernBertSize::Base).build()?;
//! let reviews = &[
//!     "Best purchase I've ever made!",
//!     "Terrible quality, very disappointed.",
//!     "It's okay, I guess.",
//! ];
//!
//! let output = pipeline.run(reviews)?;
//!
//! for r in output.results {
//!     let r = r.result?;
//!     println!("{}: {:?}", r.sentiment, r.probabilities);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Custom classifiers
//!
//! Anything implementing [`SentimentOracle`] can drive the pipeline; see
//! [`SentimentAnalysisPipelineBuilder::with_oracle`] and [`ScriptedOracle`].

// ============ Internal API ============

pub(crate) mod builder;
pub(crate) mod calibration;
pub(crate) mod contrast;
pub(crate) mod cues;
pub(crate) mod lexicon;
pub(crate) mod model;
pub(crate) mod pipeline;
pub(crate) mod types;

// ============ Public API ============

pub use crate::loaders::SentimentConfig;
pub use crate::models::{ModernBertOracle, ModernBertSize};
pub use crate::pipelines::stats::PipelineStats;
pub use builder::SentimentAnalysisPipelineBuilder;
pub use calibration::{
    blend, finalize, mixed_distribution, mixed_label, mixed_neutral, simple_distribution,
    simple_neutral, CalibrationConfig,
};
pub use contrast::{segment, split_on_contrast, ContrastSplit, Segmentation};
pub use cues::{cue_modifier, scan_cues, CueCounts};
pub use lexicon::{
    LexiconConfig, LexiconSets, PhraseMatcher, DEFAULT_CONTRAST_MARKERS, DEFAULT_INTENSIFIERS,
    DEFAULT_UNCERTAINTY_MARKERS,
};
pub use model::{ScriptedOracle, SentimentOracle};
pub use pipeline::{BatchOutput, BatchResult, Output, SentimentAnalysisPipeline};
pub use types::{Distribution, ScorePair, SentimentLabel, SentimentResult};

#[doc(hidden)]
pub use pipeline::SentimentInput;

/// Named calibration constants (the defaults of [`CalibrationConfig`]).
pub mod constants {
    pub use super::calibration::{
        AFTER_WEIGHT, BEFORE_WEIGHT, BLEND_CAP, INTENSIFIER_STEP, MAX_CONFIDENCE,
        MAX_CUE_MODIFIER, MIN_CONFIDENCE, MIN_CUE_MODIFIER, MIXED_CLOSE_DIFF,
        MIXED_NEUTRAL_FLOOR, MIXED_NEUTRAL_OVERRIDE_DIFF, MIXED_NEUTRAL_PEAK, SIMPLE_CLOSE_DIFF,
        SIMPLE_MODERATE_DIFF, SIMPLE_NEUTRAL_FLOOR, SIMPLE_NEUTRAL_MODERATE,
        SIMPLE_NEUTRAL_PEAK, UNCERTAINTY_STEP,
    };
}
