use crate::job::{FailureReason, JobOutcome, JobResult};
use serde::{Deserialize, Serialize};

/// Aggregate counters of one run. Only the orchestrator's main loop writes
/// them, after a window has fully joined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRunStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub processed: usize,
    pub timeouts: usize,
    pub non_zero_exits: usize,
    pub spawn_errors: usize,
    pub aborted: usize,
    /// Never admitted because of an interrupt
    pub skipped: usize,
}

impl BatchRunStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, result: &JobResult) {
        self.processed += 1;
        match &result.outcome {
            JobOutcome::Succeeded => self.succeeded += 1,
            JobOutcome::Failed(reason) => {
                self.failed += 1;
                match reason {
                    FailureReason::Timeout => self.timeouts += 1,
                    FailureReason::NonZeroExit { .. } => self.non_zero_exits += 1,
                    FailureReason::SpawnError { .. } => self.spawn_errors += 1,
                    FailureReason::Aborted => self.aborted += 1,
                }
            }
        }
    }

    /// Percentage of processed jobs, 0..=100
    pub fn progress_percent(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        self.processed * 100 / self.total
    }

    /// Succeeded over total, 0.0 for an empty run
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub stats: BatchRunStats,
    /// In job order
    pub results: Vec<JobResult>,
    /// Windows actually executed
    pub windows: usize,
    /// Admission stopped early by an interrupt
    pub interrupted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(outcome: JobOutcome) -> JobResult {
        JobResult::new("job", outcome, Duration::from_millis(5))
    }

    #[test]
    fn record_classifies_failures() {
        let mut stats = BatchRunStats::new(5);
        stats.record(&result(JobOutcome::Succeeded));
        stats.record(&result(JobOutcome::Failed(FailureReason::Timeout)));
        stats.record(&result(JobOutcome::Failed(FailureReason::NonZeroExit {
            code: Some(2),
            output: String::new(),
        })));
        stats.record(&result(JobOutcome::Failed(FailureReason::SpawnError {
            message: "nope".to_string(),
        })));

        assert_eq!(stats.processed, 4);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 3);
        assert_eq!(
            (stats.timeouts, stats.non_zero_exits, stats.spawn_errors),
            (1, 1, 1)
        );
        assert_eq!(stats.progress_percent(), 80);
    }

    #[test]
    fn empty_run_has_zero_rates() {
        let stats = BatchRunStats::new(0);
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.progress_percent(), 0);
    }
}
