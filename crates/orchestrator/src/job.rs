use crate::error::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use specgen_flattener::SizeCategory;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One generation job. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub unique_name: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub model: String,
    /// Hard wall-clock bound, also forwarded to the process
    pub timeout_sec: u64,
    /// Opaque to the orchestrator; only the spawned process retries
    pub retries: u32,
}

impl JobDescriptor {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }

    /// Flags appended to the generator command line
    pub fn process_args(&self) -> Vec<OsString> {
        let mut input = OsString::from("--input=");
        input.push(&self.input_path);
        let mut out = OsString::from("--out=");
        out.push(&self.output_path);
        vec![
            input,
            out,
            format!("--model={}", self.model).into(),
            format!("--retries={}", self.retries).into(),
            format!("--timeout={}", self.timeout_sec).into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Killed by the wall-clock timer
    Timeout,
    NonZeroExit {
        code: Option<i32>,
        /// Tail of combined stdout/stderr
        output: String,
    },
    SpawnError {
        message: String,
    },
    /// Killed by a hard abort request
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Failed(FailureReason),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub unique_name: String,
    pub outcome: JobOutcome,
    pub duration_ms: u64,
}

impl JobResult {
    pub fn new(unique_name: impl Into<String>, outcome: JobOutcome, duration: Duration) -> Self {
        Self {
            unique_name: unique_name.into(),
            outcome,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Where jobs come from and how they are parameterised
#[derive(Debug, Clone)]
pub struct JobSource {
    /// Contains one directory per size category
    pub jobs_dir: PathBuf,
    pub out_dir: PathBuf,
    pub sizes: Vec<SizeCategory>,
    pub input_suffix: String,
    pub output_suffix: String,
    pub model: String,
    pub timeout_sec: u64,
    pub retries: u32,
    /// Case-insensitive substring filter on the unique name
    pub target: Option<String>,
    /// Skip jobs whose output already exists
    pub skip_completed: bool,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveredJobs {
    pub jobs: Vec<JobDescriptor>,
    /// Jobs left out because their output already exists
    pub already_completed: usize,
}

/// List jobs under `<jobs_dir>/<size>/*<input_suffix>`, in size then name order.
///
/// A missing jobs directory or two jobs sharing an output path are fatal.
pub fn discover_jobs(source: &JobSource) -> Result<DiscoveredJobs> {
    if !source.jobs_dir.is_dir() {
        return Err(OrchestratorError::MissingDirectory(source.jobs_dir.clone()));
    }
    if source.input_suffix.is_empty() {
        return Err(OrchestratorError::InvalidConfig(
            "input suffix must not be empty".to_string(),
        ));
    }

    let target = source.target.as_ref().map(|t| t.to_lowercase());
    let mut discovered = DiscoveredJobs::default();
    let mut outputs: HashMap<PathBuf, String> = HashMap::new();

    let mut seen_sizes = HashSet::new();
    for size in &source.sizes {
        // `small,small` lists the directory once
        if !seen_sizes.insert(*size) {
            continue;
        }
        let size_dir = source.jobs_dir.join(size.as_str());
        if !size_dir.is_dir() {
            log::debug!("No {} jobs directory at {}", size, size_dir.display());
            continue;
        }

        for input_path in list_inputs(&size_dir, &source.input_suffix)? {
            let Some(unique_name) = unique_name_of(&input_path, &source.input_suffix) else {
                continue;
            };
            if let Some(target) = &target {
                if !unique_name.to_lowercase().contains(target) {
                    continue;
                }
            }

            let output_path = source
                .out_dir
                .join(size.as_str())
                .join(format!("{unique_name}{}", source.output_suffix));

            if output_path == input_path {
                return Err(OrchestratorError::InvalidConfig(format!(
                    "job {unique_name} would overwrite its own input {}",
                    input_path.display()
                )));
            }
            if let Some(first) = outputs.get(&output_path) {
                return Err(OrchestratorError::DuplicateOutput {
                    first: first.clone(),
                    second: unique_name,
                    path: output_path,
                });
            }
            outputs.insert(output_path.clone(), unique_name.clone());

            if source.skip_completed && output_path.exists() {
                discovered.already_completed += 1;
                continue;
            }

            discovered.jobs.push(JobDescriptor {
                unique_name,
                input_path,
                output_path,
                model: source.model.clone(),
                timeout_sec: source.timeout_sec,
                retries: source.retries,
            });
        }
    }

    if let Some(limit) = source.limit {
        discovered.jobs.truncate(limit);
    }

    if discovered.already_completed > 0 {
        log::info!(
            "Skipped {} already completed jobs (use --force to regenerate)",
            discovered.already_completed
        );
    }
    log::info!("Found {} jobs to process", discovered.jobs.len());
    Ok(discovered)
}

/// Create the parent directory of every output path
pub fn prepare_output_dirs(jobs: &[JobDescriptor]) -> Result<()> {
    for job in jobs {
        if let Some(parent) = job.output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn list_inputs(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(suffix) && name.len() > suffix.len());
        if matches {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

fn unique_name_of(path: &Path, suffix: &str) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(suffix))
        .map(str::to_string)
}
