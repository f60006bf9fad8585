//! # Specgen Orchestrator
//!
//! Runs one external generation process per job, at most `max_concurrent` at a
//! time, in consecutive windows.
//!
//! ## Scheduling
//!
//! ```text
//! jobs ──> window 1 ──join──> pause ──> window 2 ──join──> ... ──> BatchReport
//!            │
//!            ├─ job ─ spawn ─┬─ exit 0        ─> Succeeded
//!            ├─ job          ├─ exit != 0     ─> Failed(NonZeroExit)
//!            └─ job          ├─ timer fires   ─> kill ─> Failed(Timeout)
//!                            └─ cannot spawn  ─> Failed(SpawnError)
//! ```
//!
//! An interrupt stops admission of new windows; the current one drains.
//!
//! ## Example
//!
//! ```no_run
//! use specgen_orchestrator::{BatchOrchestrator, OrchestratorConfig, ProcessRunner};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> specgen_orchestrator::Result<()> {
//!     let runner = Arc::new(ProcessRunner::new("npx", ["ts-node", "scripts/llm/run-one.ts"]));
//!     let orchestrator = BatchOrchestrator::new(runner, OrchestratorConfig::default())?;
//!     let report = orchestrator.run(Vec::new()).await;
//!     println!("{} succeeded", report.stats.succeeded);
//!     Ok(())
//! }
//! ```

mod error;
mod job;
mod orchestrator;
mod runner;
mod stats;

pub use error::{OrchestratorError, Result};
pub use job::{
    discover_jobs, prepare_output_dirs, DiscoveredJobs, FailureReason, JobDescriptor,
    JobOutcome, JobResult, JobSource,
};
pub use orchestrator::{BatchOrchestrator, OrchestratorConfig};
pub use runner::{JobRunner, ProcessRunner, OUTPUT_TAIL_BYTES};
pub use stats::{BatchReport, BatchRunStats};
