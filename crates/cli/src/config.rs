use anyhow::{bail, Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use specgen_flattener::{SizeThresholds, DEFAULT_SOURCE_EXTENSION};
use specgen_orchestrator::OrchestratorConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "specgen.toml";

/// Whole-pipeline settings. Loaded once, overlaid with flags, then only read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub corpus: CorpusConfig,
    pub compiler: CompilerConfig,
    pub generator: GeneratorConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorpusConfig {
    pub small_max_lines: usize,
    pub medium_max_lines: usize,
    /// Source file extension, without the dot
    pub extension: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        let thresholds = SizeThresholds::default();
        Self {
            small_max_lines: thresholds.small_max_lines,
            medium_max_lines: thresholds.medium_max_lines,
            extension: DEFAULT_SOURCE_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub program: PathBuf,
    pub timeout_secs: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("solc"),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub program: String,
    /// Placed before the per-job flags
    pub args: Vec<String>,
    pub model: String,
    /// Forwarded to the generator; never acted on here
    pub retries: u32,
    pub timeout_secs: u64,
    pub input_suffix: String,
    pub output_suffix: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            args: vec!["ts-node".to_string(), "scripts/llm/run-one.ts".to_string()],
            model: "qwen2.5-coder:3b".to_string(),
            retries: 3,
            timeout_secs: 900,
            input_suffix: ".sol".to_string(),
            output_suffix: ".spec.ts".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub max_concurrent: usize,
    pub inter_batch_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            max_concurrent: defaults.max_concurrent,
            inter_batch_delay_ms: u64::try_from(defaults.inter_batch_delay.as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}

impl PipelineConfig {
    /// Read `explicit`, else `specgen.toml` in the working directory if
    /// present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let implicit = Path::new(DEFAULT_CONFIG_FILE);
                if implicit.is_file() {
                    Self::from_file(implicit)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Err(message) = self.thresholds().validate() {
            bail!("corpus: {message}");
        }
        if self.corpus.extension.trim_start_matches('.').is_empty() {
            bail!("corpus.extension must not be empty");
        }
        if self.compiler.timeout_secs == 0 {
            bail!("compiler.timeout_secs must be at least 1");
        }
        if self.generator.timeout_secs == 0 {
            bail!("generator.timeout_secs must be at least 1");
        }
        if self.generator.program.trim().is_empty() {
            bail!("generator.program must not be empty");
        }
        if self.generator.input_suffix.is_empty() {
            bail!("generator.input_suffix must not be empty");
        }
        if self.scheduler.max_concurrent == 0 {
            bail!("scheduler.max_concurrent must be at least 1");
        }
        Ok(())
    }

    pub fn thresholds(&self) -> SizeThresholds {
        SizeThresholds {
            small_max_lines: self.corpus.small_max_lines,
            medium_max_lines: self.corpus.medium_max_lines,
        }
    }

    pub fn compiler_timeout(&self) -> Duration {
        Duration::from_secs(self.compiler.timeout_secs)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_concurrent: self.scheduler.max_concurrent,
            inter_batch_delay: Duration::from_millis(self.scheduler.inter_batch_delay_ms),
        }
    }

    /// Suffix of flattened unit files, e.g. `.sol`
    pub fn unit_suffix(&self) -> String {
        format!(".{}", self.corpus.extension.trim_start_matches('.'))
    }

    /// Name of a flattened unit file, which is also a generation input
    pub fn unit_file_name(&self, unique_name: &str) -> String {
        format!("{unique_name}{}", self.unit_suffix())
    }
}
