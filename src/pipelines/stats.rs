use std::time::{Duration, Instant};

/// Execution statistics for one `run()` call.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Total execution time.
    pub total_time: Duration,
    /// Number of texts processed.
    pub items_processed: usize,
    /// Number of texts that took the mixed (two-segment) path.
    pub mixed_items: usize,
    /// Classifier calls made across all texts, including ones that failed.
    pub oracle_calls: usize,
}

impl PipelineStats {
    /// Create a new stats tracker (call at start of operation).
    pub(crate) fn start() -> PipelineStatsBuilder {
        PipelineStatsBuilder {
            start_time: Instant::now(),
            mixed_items: 0,
            oracle_calls: 0,
        }
    }

    /// Average time per processed text.
    pub fn time_per_item(&self) -> Duration {
        match u32::try_from(self.items_processed) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_time / n,
        }
    }
}

/// Builder for PipelineStats - tracks timing from creation to finish.
pub(crate) struct PipelineStatsBuilder {
    start_time: Instant,
    mixed_items: usize,
    oracle_calls: usize,
}

impl PipelineStatsBuilder {
    /// Count one text that took the mixed path.
    pub fn record_mixed(&mut self) {
        self.mixed_items += 1;
    }

    /// Add classifier calls made for one text.
    pub fn record_oracle_calls(&mut self, calls: usize) {
        self.oracle_calls += calls;
    }

    /// Finalize stats with the number of items processed.
    pub fn finish(self, items_processed: usize) -> PipelineStats {
        PipelineStats {
            total_time: self.start_time.elapsed(),
            items_processed,
            mixed_items: self.mixed_items,
            oracle_calls: self.oracle_calls,
        }
    }
}
