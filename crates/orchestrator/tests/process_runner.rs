use pretty_assertions::assert_eq;
use specgen_orchestrator::{
    BatchOrchestrator, FailureReason, JobDescriptor, JobOutcome, JobRunner, OrchestratorConfig,
    ProcessRunner,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// `sh -c <script>`; job flags arrive as `$1..$5`
fn shell(script: &str) -> ProcessRunner {
    ProcessRunner::new("sh", ["-c", script, "specgen-job"])
}

fn job(dir: &Path, name: &str, timeout_sec: u64) -> JobDescriptor {
    JobDescriptor {
        unique_name: name.to_string(),
        input_path: dir.join(format!("{name}.sol")),
        output_path: dir.join(format!("{name}.spec.ts")),
        model: "test-model".to_string(),
        timeout_sec,
        retries: 0,
    }
}

#[cfg(target_os = "linux")]
fn is_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        // Zombies are dead for our purposes
        Ok(stat) => !stat
            .rsplit(')')
            .next()
            .is_some_and(|rest| rest.trim_start().starts_with('Z')),
        Err(_) => false,
    }
}

#[tokio::test]
async fn successful_job_receives_its_flags() {
    let dir = TempDir::new().unwrap();
    let runner = shell(r#"printf '%s\n' "$@" > "${2#--out=}""#);
    let job = job(dir.path(), "Token__0x01", 10);

    let result = runner.run(&job, CancellationToken::new()).await;

    assert_eq!(result.outcome, JobOutcome::Succeeded);
    let written = std::fs::read_to_string(&job.output_path).unwrap();
    let expected = format!(
        "--input={}\n--out={}\n--model=test-model\n--retries=0\n--timeout=10\n",
        job.input_path.display(),
        job.output_path.display()
    );
    assert_eq!(written, expected);
}

#[tokio::test]
async fn non_zero_exit_keeps_combined_output() {
    let dir = TempDir::new().unwrap();
    let runner = shell("echo partial; echo boom >&2; exit 3");

    let result = runner
        .run(&job(dir.path(), "Broken__0x02", 10), CancellationToken::new())
        .await;

    assert_eq!(
        result.outcome,
        JobOutcome::Failed(FailureReason::NonZeroExit {
            code: Some(3),
            output: "partial\n\nERROR: boom".to_string(),
        })
    );
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let dir = TempDir::new().unwrap();
    let runner = ProcessRunner::new("/nonexistent/specgen-generator", Vec::<String>::new());

    let result = runner
        .run(&job(dir.path(), "Ghost__0x03", 10), CancellationToken::new())
        .await;

    assert!(matches!(
        result.outcome,
        JobOutcome::Failed(FailureReason::SpawnError { .. })
    ));
}

#[tokio::test]
async fn hung_job_is_killed_at_its_timeout() {
    let dir = TempDir::new().unwrap();
    // Background child proves the whole process group goes down
    let runner = shell(r#"sleep 30 & echo $! > "${1#--input=}.pid"; wait"#);
    let job = job(dir.path(), "Hang__0x04", 1);

    let started = Instant::now();
    let result = runner.run(&job, CancellationToken::new()).await;
    let elapsed = started.elapsed();

    assert_eq!(result.outcome, JobOutcome::Failed(FailureReason::Timeout));
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");

    #[cfg(target_os = "linux")]
    {
        let pid_file = format!("{}.pid", job.input_path.display());
        let pid: u32 = std::fs::read_to_string(pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while is_alive(pid) && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!is_alive(pid), "grandchild {pid} survived the timeout");
    }
}

#[tokio::test]
async fn timed_out_job_does_not_stall_its_window() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(shell(r#"case "$1" in *Hang__*) sleep 30;; esac"#));
    let orchestrator = BatchOrchestrator::new(
        runner,
        OrchestratorConfig {
            max_concurrent: 2,
            inter_batch_delay: Duration::ZERO,
        },
    )
    .unwrap();

    let started = Instant::now();
    let report = orchestrator
        .run(vec![
            job(dir.path(), "Hang__0x05", 1),
            job(dir.path(), "Quick__0x06", 1),
            job(dir.path(), "Quick__0x07", 1),
        ])
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.stats.timeouts, 1);
    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(report.stats.processed, 3);
}

#[tokio::test]
async fn abort_kills_in_flight_jobs() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(shell("sleep 30"));
    let orchestrator = BatchOrchestrator::new(
        runner,
        OrchestratorConfig {
            max_concurrent: 2,
            inter_batch_delay: Duration::ZERO,
        },
    )
    .unwrap();

    let shutdown = orchestrator.shutdown_token();
    let abort = orchestrator.abort_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.cancel();
        abort.cancel();
    });

    let started = Instant::now();
    let report = orchestrator
        .run(vec![
            job(dir.path(), "Slow__0x08", 60),
            job(dir.path(), "Slow__0x09", 60),
            job(dir.path(), "Slow__0x0a", 60),
        ])
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(report.interrupted);
    assert_eq!(report.stats.aborted, 2);
    assert_eq!(report.stats.skipped, 1);
    assert!(report
        .results
        .iter()
        .all(|r| r.outcome == JobOutcome::Failed(FailureReason::Aborted)));
}
