use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::types::ScorePair;
use crate::error::{PipelineError, Result};

/// A binary sentiment classifier the calibration runs on top of.
///
/// Implementations return one independent score per class. Failures surface as
/// [`PipelineError::Inference`]; the pipeline never retries them.
pub trait SentimentOracle {
    /// Score one text segment.
    fn classify(&self, segment: &str) -> Result<ScorePair>;
}

impl<O: SentimentOracle + ?Sized> SentimentOracle for &O {
    fn classify(&self, segment: &str) -> Result<ScorePair> {
        (**self).classify(segment)
    }
}

impl<O: SentimentOracle + ?Sized> SentimentOracle for Arc<O> {
    fn classify(&self, segment: &str) -> Result<ScorePair> {
        (**self).classify(segment)
    }
}

impl<O: SentimentOracle + ?Sized> SentimentOracle for Box<O> {
    fn classify(&self, segment: &str) -> Result<ScorePair> {
        (**self).classify(segment)
    }
}

/// Deterministic oracle answering from a fixed table.
///
/// Segments are looked up after trimming, lower-casing and collapsing
/// whitespace, so `" The food was great "` and `"the food  was great"` share an
/// entry. Every call is recorded.
///
/// ```rust
/// use candle_sentiment::sentiment::{ScorePair, ScriptedOracle, SentimentOracle};
///
/// # fn main() -> candle_sentiment::error::Result<()> {
/// let oracle = ScriptedOracle::new()
///     .with("great", ScorePair::new(0.9, 0.1)?)
///     .with_default(ScorePair::new(0.5, 0.5)?);
///
/// assert_eq!(oracle.classify(" GREAT ")?.positive, 0.9);
/// assert_eq!(oracle.classify("anything else")?.positive, 0.5);
/// assert_eq!(oracle.call_count(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    table: HashMap<String, ScorePair>,
    default: Option<ScorePair>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    /// Empty table with no default; every lookup fails until entries are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `scores` for `segment`.
    pub fn with(mut self, segment: &str, scores: ScorePair) -> Self {
        self.table.insert(normalize(segment), scores);
        self
    }

    /// Answer `scores` for any segment without an entry.
    pub fn with_default(mut self, scores: ScorePair) -> Self {
        self.default = Some(scores);
        self
    }

    /// Fail with an inference error whenever `segment` is classified.
    pub fn failing_on(mut self, segment: &str) -> Self {
        self.failing.insert(normalize(segment));
        self
    }

    /// Segments classified so far, exactly as received.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of classify calls so far.
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl SentimentOracle for ScriptedOracle {
    fn classify(&self, segment: &str) -> Result<ScorePair> {
        self.calls
            .lock()
            .map_err(|_| PipelineError::Unexpected("Oracle call log poisoned".to_string()))?
            .push(segment.to_string());

        let key = normalize(segment);
        if self.failing.contains(&key) {
            return Err(PipelineError::Inference(format!(
                "Scripted failure for segment '{key}'"
            )));
        }

        self.table
            .get(&key)
            .copied()
            .or(self.default)
            .ok_or_else(|| {
                PipelineError::Inference(format!("No scripted scores for segment '{key}'"))
            })
    }
}

fn normalize(segment: &str) -> String {
    segment
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Forwards to another oracle and counts the calls made through it.
pub(crate) struct CountingOracle<'a, O: ?Sized> {
    inner: &'a O,
    calls: Cell<usize>,
}

impl<'a, O: SentimentOracle + ?Sized> CountingOracle<'a, O> {
    pub(crate) fn new(inner: &'a O) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl<O: SentimentOracle + ?Sized> SentimentOracle for CountingOracle<'_, O> {
    fn classify(&self, segment: &str) -> Result<ScorePair> {
        self.calls.set(self.calls.get() + 1);
        self.inner.classify(segment)
    }
}
