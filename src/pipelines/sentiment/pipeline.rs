use std::sync::Arc;

use tracing::{debug, trace};

use super::calibration::{self, CalibrationConfig};
use super::contrast::{self, Segmentation};
use super::cues;
use super::lexicon::LexiconSets;
use super::model::{CountingOracle, SentimentOracle};
use super::types::SentimentResult;
use crate::error::{PipelineError, Result};
use crate::pipelines::stats::PipelineStats;

// ============ Output types ============

/// Single-text output from `run()`.
#[derive(Debug, Clone)]
pub struct Output {
    /// The calibrated result.
    pub result: SentimentResult,
    /// Execution statistics.
    pub stats: PipelineStats,
}

/// Result for one text in a batch.
#[derive(Debug)]
pub struct BatchResult {
    /// The input text.
    pub text: String,
    /// Calibrated result or error for this text.
    pub result: Result<SentimentResult>,
}

/// Batch output from `run()`.
#[derive(Debug)]
pub struct BatchOutput {
    /// Results for each input.
    pub results: Vec<BatchResult>,
    /// Execution statistics.
    pub stats: PipelineStats,
}

// ============ Input trait for type-based dispatch ============

#[doc(hidden)]
pub trait SentimentInput<'a> {
    /// Output type for `.run()`.
    type Output;

    #[doc(hidden)]
    fn into_texts(self) -> Vec<&'a str>;
    #[doc(hidden)]
    fn convert_output(
        texts: Vec<&'a str>,
        results: Vec<Result<SentimentResult>>,
        stats: PipelineStats,
    ) -> Result<Self::Output>;
}

impl<'a> SentimentInput<'a> for &'a str {
    type Output = Output;

    fn into_texts(self) -> Vec<&'a str> {
        vec![self]
    }

    fn convert_output(
        _texts: Vec<&'a str>,
        mut results: Vec<Result<SentimentResult>>,
        stats: PipelineStats,
    ) -> Result<Self::Output> {
        let result = results
            .pop()
            .ok_or_else(|| PipelineError::Unexpected("No result produced".into()))??;
        Ok(Output { result, stats })
    }
}

fn batch_output(
    texts: Vec<&str>,
    results: Vec<Result<SentimentResult>>,
    stats: PipelineStats,
) -> BatchOutput {
    let results = texts
        .into_iter()
        .zip(results)
        .map(|(text, result)| BatchResult {
            text: text.to_string(),
            result,
        })
        .collect();
    BatchOutput { results, stats }
}

impl<'a> SentimentInput<'a> for &'a [&'a str] {
    type Output = BatchOutput;

    fn into_texts(self) -> Vec<&'a str> {
        self.to_vec()
    }

    fn convert_output(
        texts: Vec<&'a str>,
        results: Vec<Result<SentimentResult>>,
        stats: PipelineStats,
    ) -> Result<Self::Output> {
        Ok(batch_output(texts, results, stats))
    }
}

impl<'a, const N: usize> SentimentInput<'a> for &'a [&'a str; N] {
    type Output = BatchOutput;

    fn into_texts(self) -> Vec<&'a str> {
        self.as_slice().to_vec()
    }

    fn convert_output(
        texts: Vec<&'a str>,
        results: Vec<Result<SentimentResult>>,
        stats: PipelineStats,
    ) -> Result<Self::Output> {
        Ok(batch_output(texts, results, stats))
    }
}

// ============ Pipeline ============

/// Turns a binary classifier's scores into a calibrated Positive/Negative/Neutral answer.
///
/// Construct with [`SentimentAnalysisPipelineBuilder`](super::SentimentAnalysisPipelineBuilder).
///
/// # Examples
///
/// ```rust
/// # use candle_sentiment::sentiment::{ScorePair, ScriptedOracle, SentimentAnalysisPipelineBuilder, SentimentLabel};
/// # fn main() -> candle_sentiment::error::Result<()> {
/// let oracle = ScriptedOracle::new().with("I love this product", ScorePair::new(0.9, 0.1)?);
/// let pipeline = SentimentAnalysisPipelineBuilder::with_oracle(oracle).build()?;
///
/// let result = pipeline.analyze("I love this product")?;
/// assert_eq!(result.sentiment, SentimentLabel::Positive);
/// assert!((result.confidence - 0.857).abs() < 1e-3);
/// # Ok(())
/// # }
/// ```
pub struct SentimentAnalysisPipeline<O: SentimentOracle> {
    pub(crate) oracle: O,
    pub(crate) lexicon: Arc<LexiconSets>,
    pub(crate) calibration: CalibrationConfig,
}

impl<O: SentimentOracle> SentimentAnalysisPipeline<O> {
    /// Analyze text sentiment.
    ///
    /// Single input → [`Output`], batch → [`BatchOutput`]. In a batch each text
    /// succeeds or fails on its own.
    pub fn run<'a, I: SentimentInput<'a>>(&self, input: I) -> Result<I::Output> {
        let mut stats_builder = PipelineStats::start();
        let texts = input.into_texts();
        let item_count = texts.len();

        let results: Vec<Result<SentimentResult>> = texts
            .iter()
            .map(|text| {
                let oracle = CountingOracle::new(&self.oracle);
                let outcome = self.analyze_inner(text, &oracle);
                stats_builder.record_oracle_calls(oracle.calls());
                let (result, mixed) = outcome?;
                if mixed {
                    stats_builder.record_mixed();
                }
                Ok(result)
            })
            .collect();

        I::convert_output(texts, results, stats_builder.finish(item_count))
    }

    /// Classify one text.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InputRejected`] for blank text, [`PipelineError::Inference`]
    /// if any classifier call fails. There is no retry.
    pub fn analyze(&self, text: &str) -> Result<SentimentResult> {
        self.analyze_inner(text, &self.oracle).map(|(result, _)| result)
    }

    fn analyze_inner<C: SentimentOracle + ?Sized>(
        &self,
        text: &str,
        oracle: &C,
    ) -> Result<(SentimentResult, bool)> {
        if text.trim().is_empty() {
            return Err(PipelineError::InputRejected("Text cannot be empty".to_string()));
        }

        let counts = cues::scan_cues(text, &self.lexicon);
        let modifier = cues::cue_modifier(counts, &self.calibration);
        trace!(
            intensifiers = counts.intensifiers,
            uncertainty = counts.uncertainty,
            modifier,
            "linguistic cues"
        );

        let segmentation = contrast::segment(text, &self.lexicon, oracle)?;
        let mixed = segmentation.is_mixed();

        let (sentiment, probabilities) = match segmentation {
            Segmentation::Simple => {
                let scores = oracle.classify(text)?.validated()?;
                let distribution = calibration::simple_distribution(scores, &self.calibration);
                (distribution.argmax(), distribution)
            }
            Segmentation::Mixed { before, after, .. } => {
                let blended = calibration::blend(before, after, &self.calibration);
                let distribution = calibration::mixed_distribution(blended, &self.calibration);
                (
                    calibration::mixed_label(blended, &self.calibration),
                    distribution,
                )
            }
        };

        let result = calibration::finalize(sentiment, probabilities, modifier, &self.calibration);
        debug!(
            sentiment = %result.sentiment,
            confidence = result.confidence,
            mixed,
            "sentiment analyzed"
        );
        Ok((result, mixed))
    }

    /// The lexicon this pipeline scans with.
    pub fn lexicon(&self) -> &LexiconSets {
        &self.lexicon
    }

    /// The calibration constants in use.
    pub fn calibration(&self) -> &CalibrationConfig {
        &self.calibration
    }

    /// The underlying classifier.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::sentiment::model::ScriptedOracle;
    use crate::pipelines::sentiment::types::{ScorePair, SentimentLabel};

    fn pair(positive: f64, negative: f64) -> ScorePair {
        ScorePair::new(positive, negative).unwrap()
    }

    fn pipeline(oracle: ScriptedOracle) -> SentimentAnalysisPipeline<ScriptedOracle> {
        SentimentAnalysisPipeline {
            oracle,
            lexicon: LexiconSets::shared_default().unwrap(),
            calibration: CalibrationConfig::default(),
        }
    }

    #[test]
    fn blank_text_is_rejected_before_classification() {
        let pipeline = pipeline(ScriptedOracle::new().with_default(pair(0.5, 0.5)));
        let err = pipeline.analyze("   \n\t").unwrap_err();
        assert!(matches!(err, PipelineError::InputRejected(_)));
        assert_eq!(pipeline.oracle().call_count(), 0);
    }

    #[test]
    fn simple_path_classifies_whole_text_once() {
        let oracle = ScriptedOracle::new().with("I love this product", pair(0.9, 0.1));
        let pipeline = pipeline(oracle);
        let result = pipeline.analyze("I love this product").unwrap();

        assert_eq!(result.sentiment, SentimentLabel::Positive);
        assert!((result.confidence - 0.9 / 1.05).abs() < 1e-9);
        assert_eq!(pipeline.oracle().calls(), vec!["I love this product"]);
    }

    #[test]
    fn mixed_path_uses_blended_scores() {
        let pipeline = pipeline(
            ScriptedOracle::new()
                .with("the food was great", pair(0.9, 0.1))
                .with("the service was terrible", pair(0.1, 0.9)),
        );
        let result = pipeline
            .analyze("The food was great but the service was terrible")
            .unwrap();

        assert_eq!(result.sentiment, SentimentLabel::Negative);
        assert!((result.probabilities.negative - 0.58 / 1.54).abs() < 1e-9);
        assert_eq!(result.confidence, 0.40);
        assert_eq!(pipeline.oracle().call_count(), 2);
    }

    #[test]
    fn agreeing_segments_fall_back_to_whole_text() {
        let pipeline = pipeline(
            ScriptedOracle::new()
                .with("the room was clean", pair(0.8, 0.2))
                .with("the staff were kind", pair(0.7, 0.3))
                .with("The room was clean but the staff were kind", pair(0.85, 0.1)),
        );
        let result = pipeline
            .analyze("The room was clean but the staff were kind")
            .unwrap();

        assert_eq!(result.sentiment, SentimentLabel::Positive);
        assert!((result.probabilities.neutral - 0.05 / 1.0).abs() < 1e-9);
        assert_eq!(pipeline.oracle().call_count(), 3);
    }

    #[test]
    fn batch_run_reports_each_item() {
        let pipeline = pipeline(
            ScriptedOracle::new()
                .with_default(pair(0.9, 0.1))
                .with("good", pair(0.9, 0.1))
                .with("bad", pair(0.1, 0.9)),
        );
        let output = pipeline.run(&["good but bad", "  ", "fine"]).unwrap();

        assert_eq!(output.results.len(), 3);
        assert_eq!(output.results[0].text, "good but bad");
        assert!(output.results[0].result.is_ok());
        assert!(matches!(
            output.results[1].result,
            Err(PipelineError::InputRejected(_))
        ));
        assert!(output.results[2].result.is_ok());
        assert_eq!(output.stats.items_processed, 3);
        assert_eq!(output.stats.mixed_items, 1);
        // Mixed text: two halves. Blank: none. Plain text: one.
        assert_eq!(output.stats.oracle_calls, 3);
    }

    #[test]
    fn oracle_calls_cover_agreeing_halves_and_failures() {
        let pipeline = pipeline(
            ScriptedOracle::new()
                .with_default(pair(0.8, 0.2))
                .failing_on("it broke"),
        );
        let output = pipeline.run(&["good but fine", "it broke"]).unwrap();

        assert!(output.results[0].result.is_ok());
        assert!(output.results[1].result.is_err());
        assert_eq!(output.stats.mixed_items, 0);
        assert_eq!(output.stats.oracle_calls, 4);
    }

    #[test]
    fn single_run_surfaces_errors() {
        let pipeline = pipeline(ScriptedOracle::new().failing_on("broken"));
        assert!(matches!(
            pipeline.run("broken"),
            Err(PipelineError::Inference(_))
        ));
    }
}
