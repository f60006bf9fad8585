use crate::config::PipelineConfig;
use anyhow::{Context as AnyhowContext, Result};
use serde::Serialize;
use specgen_flattener::{CorpusScanner, ImportFlattener, SizeCategory, SourceFlattener};
use specgen_orchestrator::{
    discover_jobs, prepare_output_dirs, BatchOrchestrator, BatchReport, JobSource, ProcessRunner,
};
use specgen_symbols::{unique_name, NameRegistry, SolcCompiler, SymbolResolver, SymbolStrategy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Counters of one flatten step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlattenSummary {
    pub scanned: usize,
    pub empty: usize,
    pub flattened: usize,
    pub compiler_named: usize,
    pub fallback_named: usize,
    pub unnamed: usize,
    pub collisions: usize,
    pub written: usize,
}

/// Scan `corpus`, flatten and name every unit, write each to
/// `<units_out>/<size>/<uniqueName>.<ext>`.
pub async fn flatten_corpus(
    config: &PipelineConfig,
    corpus: &Path,
    units_out: &Path,
) -> Result<FlattenSummary> {
    let units = CorpusScanner::new(corpus, config.thresholds())
        .with_extension(config.corpus.extension.clone())
        .scan()
        .context("Failed to scan corpus")?;

    std::fs::create_dir_all(units_out)
        .with_context(|| format!("Failed to create {}", units_out.display()))?;

    let flattener = ImportFlattener::new();
    let resolver = SymbolResolver::new(SolcCompiler::new(
        config.compiler.program.clone(),
        config.compiler_timeout(),
    ));
    let mut registry = NameRegistry::new();
    let mut summary = FlattenSummary {
        scanned: units.len(),
        ..Default::default()
    };
    log::info!("Flattening {} units from {}", units.len(), corpus.display());

    for unit in &units {
        if unit.size == SizeCategory::Empty {
            log::debug!("Skipping empty unit {}", unit.origin_id);
            summary.empty += 1;
            continue;
        }

        let flat = flattener.flatten(unit);
        summary.flattened += 1;

        let resolved = resolver
            .resolve(&unit.origin_id, &flat.flattened_text, &unit.raw_text)
            .await;
        let Some(symbol) = resolved.symbol_name else {
            summary.unnamed += 1;
            continue;
        };
        match resolved.strategy {
            SymbolStrategy::Compiler => summary.compiler_named += 1,
            SymbolStrategy::Fallback => summary.fallback_named += 1,
            SymbolStrategy::None => {}
        }

        let name = unique_name(&unit.origin_id, &symbol);
        if let Err(collision) = registry.claim(&name, &unit.origin_id) {
            log::error!("{collision}");
            summary.collisions += 1;
            continue;
        }

        let dir = units_out.join(unit.size.as_str());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(config.unit_file_name(&name));
        std::fs::write(&path, &flat.flattened_text)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::debug!(
            "{} -> {} ({} files inlined)",
            unit.origin_id,
            path.display(),
            flat.visited.len().saturating_sub(1)
        );
        summary.written += 1;
    }

    log::info!(
        "Flattened {} units: {} written, {} unnamed, {} collisions",
        summary.flattened,
        summary.written,
        summary.unnamed,
        summary.collisions
    );
    Ok(summary)
}

/// Which jobs a generate step runs
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub jobs_dir: PathBuf,
    pub out_dir: PathBuf,
    pub sizes: Vec<SizeCategory>,
    pub target: Option<String>,
    pub force: bool,
    pub limit: Option<usize>,
}

pub async fn generate(config: &PipelineConfig, request: &GenerateRequest) -> Result<BatchReport> {
    let source = JobSource {
        jobs_dir: request.jobs_dir.clone(),
        out_dir: request.out_dir.clone(),
        sizes: request.sizes.clone(),
        input_suffix: config.generator.input_suffix.clone(),
        output_suffix: config.generator.output_suffix.clone(),
        model: config.generator.model.clone(),
        timeout_sec: config.generator.timeout_secs,
        retries: config.generator.retries,
        target: request.target.clone(),
        skip_completed: !request.force,
        limit: request.limit,
    };
    let discovered = discover_jobs(&source).context("Failed to discover jobs")?;
    prepare_output_dirs(&discovered.jobs).context("Failed to create output directories")?;

    let runner = ProcessRunner::new(&config.generator.program, &config.generator.args);
    let orchestrator = BatchOrchestrator::new(Arc::new(runner), config.orchestrator_config())?;
    log::info!(
        "Generating {} specs with {} (model {}, {} at a time)",
        discovered.jobs.len(),
        config.generator.program,
        config.generator.model,
        config.scheduler.max_concurrent
    );

    let interrupts = tokio::spawn(watch_interrupts(
        orchestrator.shutdown_token(),
        orchestrator.abort_token(),
    ));
    let report = orchestrator.run(discovered.jobs).await;
    interrupts.abort();
    Ok(report)
}

/// First Ctrl-C drains the current window, the second kills it.
async fn watch_interrupts(shutdown: CancellationToken, abort: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    log::warn!("Interrupt received: finishing the current window (Ctrl-C again to abort)");
    shutdown.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        log::warn!("Second interrupt: killing running jobs");
        abort.cancel();
    }
}
