//! Running counters for the worker loop.

use serde::Serialize;
use std::time::Duration;

use super::outcome::Outcome;

/// Counts of message outcomes since the worker started.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkerStats {
    /// Messages received from the input queue
    pub received: u64,
    /// Results published downstream
    pub published: u64,
    /// Messages consumed without a result
    pub skipped: u64,
    /// Messages dropped after a stage failure
    pub failed: u64,
    /// Total time spent handling messages
    #[serde(skip)]
    pub busy: Duration,
}

impl WorkerStats {
    /// Record one handled message.
    pub fn record(&mut self, outcome: &Outcome, elapsed: Duration) {
        self.received += 1;
        self.busy += elapsed;
        match outcome {
            Outcome::Published(_) => self.published += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }

    /// Mean handling time per message in milliseconds.
    pub fn mean_ms(&self) -> f64 {
        if self.received == 0 {
            0.0
        } else {
            self.busy.as_secs_f64() * 1000.0 / self.received as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::worker::outcome::SkipReason;

    #[test]
    fn test_record_counts_by_outcome() {
        let mut stats = WorkerStats::default();
        stats.record(
            &Outcome::Skipped(SkipReason::Unrecognized),
            Duration::from_millis(10),
        );
        stats.record(
            &Outcome::Failed(PipelineError::Inference("x".into())),
            Duration::from_millis(30),
        );

        assert_eq!(stats.received, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.published, 0);
        assert!((stats.mean_ms() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean_ms_empty() {
        assert_eq!(WorkerStats::default().mean_ms(), 0.0);
    }
}
