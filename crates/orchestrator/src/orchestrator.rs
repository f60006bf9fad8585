use crate::error::{OrchestratorError, Result};
use crate::job::{FailureReason, JobDescriptor, JobOutcome, JobResult};
use crate::runner::JobRunner;
use crate::stats::{BatchReport, BatchRunStats};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Scheduler settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Window size: jobs in flight at any instant
    pub max_concurrent: usize,
    /// Pause between consecutive windows
    pub inter_batch_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            inter_batch_delay: Duration::from_secs(5),
        }
    }
}

/// Window-based job scheduler.
///
/// Jobs are cut into consecutive windows of `max_concurrent`. A window starts
/// only after the previous one has fully joined and the pause has elapsed, so
/// windows never overlap.
pub struct BatchOrchestrator<R> {
    runner: Arc<R>,
    config: OrchestratorConfig,
    /// Stops admission of new windows
    shutdown: CancellationToken,
    /// Parent of every per-job token; kills in-flight jobs
    abort: CancellationToken,
}

impl<R> BatchOrchestrator<R>
where
    R: JobRunner + 'static,
{
    pub fn new(runner: Arc<R>, config: OrchestratorConfig) -> Result<Self> {
        if config.max_concurrent == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            runner,
            config,
            shutdown: CancellationToken::new(),
            abort: CancellationToken::new(),
        })
    }

    /// Cancel to drain: the running window finishes, no further window starts.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel to kill every in-flight job.
    pub fn abort_token(&self) -> CancellationToken {
        self.abort.clone()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub async fn run(&self, jobs: Vec<JobDescriptor>) -> BatchReport {
        let total = jobs.len();
        let window_count = total.div_ceil(self.config.max_concurrent);
        let mut stats = BatchRunStats::new(total);
        let mut results = Vec::with_capacity(total);
        let mut windows = 0;
        let mut interrupted = false;

        for (index, window) in jobs.chunks(self.config.max_concurrent).enumerate() {
            if self.shutdown.is_cancelled() {
                interrupted = true;
                break;
            }

            log::info!(
                "Window {}/{}: {} jobs (progress {}/{}, {}%)",
                index + 1,
                window_count,
                window.len(),
                stats.processed,
                total,
                stats.progress_percent()
            );

            let window_results = self.run_window(window).await;
            windows += 1;
            for result in &window_results {
                stats.record(result);
            }
            results.extend(window_results);

            let is_last = index + 1 == window_count;
            if !is_last && !self.pause().await {
                interrupted = true;
                break;
            }
        }

        stats.skipped = total - stats.processed;
        if interrupted {
            log::warn!("Interrupted: {} jobs not started", stats.skipped);
        }

        BatchReport {
            stats,
            results,
            windows,
            interrupted,
        }
    }

    /// Launch every job of the window and wait until all are terminal.
    async fn run_window(&self, window: &[JobDescriptor]) -> Vec<JobResult> {
        let handles: Vec<_> = window
            .iter()
            .cloned()
            .map(|job| {
                let runner = Arc::clone(&self.runner);
                let cancel = self.abort.child_token();
                tokio::spawn(async move { runner.run(&job, cancel).await })
            })
            .collect();

        let mut results = Vec::with_capacity(window.len());
        for (job, handle) in window.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => JobResult::new(
                    job.unique_name.clone(),
                    JobOutcome::Failed(FailureReason::SpawnError {
                        message: format!("job task failed: {e}"),
                    }),
                    Duration::ZERO,
                ),
            };
            log_result(&result);
            results.push(result);
        }
        results
    }

    /// Returns false when the pause was cut short by a shutdown request.
    async fn pause(&self) -> bool {
        if self.config.inter_batch_delay.is_zero() {
            return !self.shutdown.is_cancelled();
        }
        log::debug!(
            "Pausing {:?} before next window",
            self.config.inter_batch_delay
        );
        tokio::select! {
            _ = tokio::time::sleep(self.config.inter_batch_delay) => true,
            _ = self.shutdown.cancelled() => false,
        }
    }
}

fn log_result(result: &JobResult) {
    match &result.outcome {
        JobOutcome::Succeeded => {
            log::info!("{} succeeded in {} ms", result.unique_name, result.duration_ms)
        }
        JobOutcome::Failed(FailureReason::Timeout) => log::warn!(
            "{} timed out after {} ms",
            result.unique_name,
            result.duration_ms
        ),
        JobOutcome::Failed(FailureReason::NonZeroExit { code, .. }) => log::warn!(
            "{} failed with exit code {}",
            result.unique_name,
            code.map_or("signal".to_string(), |c| c.to_string())
        ),
        JobOutcome::Failed(FailureReason::SpawnError { message }) => {
            log::warn!("{} could not start: {message}", result.unique_name)
        }
        JobOutcome::Failed(FailureReason::Aborted) => {
            log::warn!("{} aborted", result.unique_name)
        }
    }
}
