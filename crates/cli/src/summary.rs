use crate::pipeline::FlattenSummary;
use anyhow::{Context as AnyhowContext, Result};
use specgen_orchestrator::BatchReport;
use std::path::Path;

pub fn print_flatten(summary: &FlattenSummary) {
    println!("Flatten summary:");
    println!("  Scanned:        {}", summary.scanned);
    println!("  Empty:          {}", summary.empty);
    println!("  Flattened:      {}", summary.flattened);
    println!("  Compiler named: {}", summary.compiler_named);
    println!("  Fallback named: {}", summary.fallback_named);
    println!("  Unnamed:        {}", summary.unnamed);
    println!("  Collisions:     {}", summary.collisions);
    println!("  Written:        {}", summary.written);
}

pub fn print_batch(report: &BatchReport) {
    let stats = &report.stats;
    println!("Generation summary:");
    println!("  Total:        {}", stats.total);
    println!("  Succeeded:    {}", stats.succeeded);
    println!(
        "  Failed:       {} (timeouts {}, exit errors {}, spawn errors {}, aborted {})",
        stats.failed, stats.timeouts, stats.non_zero_exits, stats.spawn_errors, stats.aborted
    );
    if report.interrupted {
        println!("  Not started:  {}", stats.skipped);
    }
    println!("  Success rate: {:.1}%", stats.success_rate() * 100.0);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Write the full report, per-job results included
pub fn write_report(path: &Path, report: &BatchReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(report)?;
    std::fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Report written to {}", path.display());
    Ok(())
}
