use crate::job::{FailureReason, JobDescriptor, JobOutcome, JobResult};
use async_trait::async_trait;
use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Bytes of combined output kept for a failed job
pub const OUTPUT_TAIL_BYTES: usize = 4096;

/// How long to wait for output pipes after the process exited. Detached
/// descendants may keep them open.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Executes a single job to a terminal state.
///
/// Implementations must return once the job's timeout elapses or `cancel`
/// fires, whatever the job is doing.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &JobDescriptor, cancel: CancellationToken) -> JobResult;
}

/// Spawns `<program> <args...> <job flags>` per job.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: OsString,
    args: Vec<OsString>,
}

enum Ended {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

impl ProcessRunner {
    pub fn new<I, S>(program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn command(&self, job: &JobDescriptor) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(job.process_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group so a kill reaches the generator's children too
        #[cfg(unix)]
        command.process_group(0);
        command
    }

    async fn execute(&self, job: &JobDescriptor, cancel: &CancellationToken) -> JobOutcome {
        let mut child = match self.command(job).spawn() {
            Ok(child) => child,
            Err(e) => {
                return JobOutcome::Failed(FailureReason::SpawnError {
                    message: format!("{}: {e}", self.program.to_string_lossy()),
                })
            }
        };

        let stdout = child.stdout.take().map(|pipe| tokio::spawn(drain(pipe)));
        let stderr = child.stderr.take().map(|pipe| tokio::spawn(drain(pipe)));

        let ended = tokio::select! {
            status = child.wait() => Ended::Exited(status),
            _ = tokio::time::sleep(job.timeout()) => Ended::TimedOut,
            _ = cancel.cancelled() => Ended::Cancelled,
        };

        match ended {
            Ended::Exited(Ok(status)) if status.success() => {
                abort_drain(stdout);
                abort_drain(stderr);
                JobOutcome::Succeeded
            }
            Ended::Exited(Ok(status)) => {
                let mut combined = collect(stdout).await;
                let err = collect(stderr).await;
                if !err.is_empty() {
                    combined.extend_from_slice(b"\nERROR: ");
                    combined.extend_from_slice(&err);
                }
                let output = tail(&combined, OUTPUT_TAIL_BYTES);
                log::debug!("{} output tail:\n{output}", job.unique_name);
                JobOutcome::Failed(FailureReason::NonZeroExit {
                    code: status.code(),
                    output,
                })
            }
            Ended::Exited(Err(e)) => {
                terminate(&mut child).await;
                abort_drain(stdout);
                abort_drain(stderr);
                JobOutcome::Failed(FailureReason::SpawnError {
                    message: format!("failed to wait for process: {e}"),
                })
            }
            Ended::TimedOut => {
                terminate(&mut child).await;
                abort_drain(stdout);
                abort_drain(stderr);
                JobOutcome::Failed(FailureReason::Timeout)
            }
            Ended::Cancelled => {
                terminate(&mut child).await;
                abort_drain(stdout);
                abort_drain(stderr);
                JobOutcome::Failed(FailureReason::Aborted)
            }
        }
    }
}

#[async_trait]
impl JobRunner for ProcessRunner {
    async fn run(&self, job: &JobDescriptor, cancel: CancellationToken) -> JobResult {
        let started = Instant::now();
        log::debug!("Starting {} ({})", job.unique_name, job.input_path.display());
        let outcome = self.execute(job, &cancel).await;
        JobResult::new(job.unique_name.clone(), outcome, started.elapsed())
    }
}

/// Kill the process group (Unix), then the child itself, and reap it.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id().and_then(|pid| libc::pid_t::try_from(pid).ok()) {
            // Negative pid addresses the whole group
            unsafe {
                let _ = libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    if let Err(e) = child.kill().await {
        log::debug!("Kill after timeout failed: {e}");
    }
}

async fn drain<R: AsyncRead + Unpin>(mut pipe: R) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf).await;
    buf
}

async fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    let Some(mut handle) = handle else {
        return Vec::new();
    };
    match timeout(PIPE_DRAIN_GRACE, &mut handle).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(_)) => Vec::new(),
        Err(_) => {
            handle.abort();
            Vec::new()
        }
    }
}

fn abort_drain(handle: Option<JoinHandle<Vec<u8>>>) {
    if let Some(handle) = handle {
        handle.abort();
    }
}

/// Last `max` bytes of `bytes` as lossy UTF-8
fn tail(bytes: &[u8], max: usize) -> String {
    let start = bytes.len().saturating_sub(max);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}
