use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use config::PipelineConfig;
use pipeline::GenerateRequest;
use specgen_flattener::SizeCategory;
use std::path::PathBuf;

mod config;
mod pipeline;
mod summary;

#[derive(Parser)]
#[command(name = "specgen")]
#[command(about = "Flatten smart-contract corpora and batch-generate test specifications", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Configuration file (default: ./specgen.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inline local imports and file every unit under its unique name
    Flatten(FlattenArgs),

    /// Run the generator over flattened units, a window at a time
    Generate(GenerateArgs),

    /// Flatten, then generate from the freshly written units
    Run(RunArgs),
}

#[derive(Args)]
struct FlattenArgs {
    /// Corpus directory
    #[arg(long)]
    corpus: PathBuf,

    /// Where flattened units are written, one directory per size
    #[arg(long)]
    units_out: PathBuf,

    /// Units with fewer lines are small
    #[arg(long)]
    small: Option<usize>,

    /// Units with at most this many lines are medium
    #[arg(long)]
    medium: Option<usize>,

    /// Compiler executable
    #[arg(long)]
    solc: Option<PathBuf>,

    /// Compiler timeout in seconds
    #[arg(long)]
    solc_timeout: Option<u64>,
}

#[derive(Args)]
struct GenerateArgs {
    /// Directory holding small/, medium/ and large/ inputs
    #[arg(long)]
    jobs_dir: PathBuf,

    #[command(flatten)]
    options: GenerateOptions,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    flatten: FlattenArgs,

    /// Inputs for generation (default: --units-out)
    #[arg(long)]
    jobs_dir: Option<PathBuf>,

    #[command(flatten)]
    options: GenerateOptions,
}

#[derive(Args)]
struct GenerateOptions {
    /// Where specs are written, one directory per size
    #[arg(long)]
    out: PathBuf,

    /// Model forwarded to the generator
    #[arg(long)]
    model: Option<String>,

    /// Size categories to process (comma-separated)
    #[arg(long, value_delimiter = ',', value_parser = parse_generated_size)]
    sizes: Vec<SizeCategory>,

    /// Only units whose name contains this (case-insensitive)
    #[arg(long)]
    target: Option<String>,

    /// Regenerate specs that already exist
    #[arg(long)]
    force: bool,

    /// Process at most N jobs
    #[arg(long)]
    limit: Option<usize>,

    /// Jobs per window
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Per-job timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Retry count forwarded to the generator
    #[arg(long)]
    retries: Option<u32>,

    /// Pause between windows in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Generator executable (drops configured arguments unless --generator-arg is given)
    #[arg(long)]
    generator: Option<String>,

    /// Argument placed before the per-job flags (repeatable)
    #[arg(long = "generator-arg", allow_hyphen_values = true)]
    generator_args: Vec<String>,

    /// Input file suffix
    #[arg(long)]
    input_suffix: Option<String>,

    /// Output file suffix
    #[arg(long)]
    output_suffix: Option<String>,

    /// Write the full run report as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Print run statistics as JSON instead of the text summary
    #[arg(long)]
    json: bool,
}

fn parse_generated_size(raw: &str) -> std::result::Result<SizeCategory, String> {
    match SizeCategory::parse(raw.trim()) {
        Some(SizeCategory::Empty) | None => Err(format!(
            "unknown size '{raw}' (expected small, medium or large)"
        )),
        Some(size) => Ok(size),
    }
}

impl FlattenArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(small) = self.small {
            config.corpus.small_max_lines = small;
        }
        if let Some(medium) = self.medium {
            config.corpus.medium_max_lines = medium;
        }
        if let Some(solc) = &self.solc {
            config.compiler.program = solc.clone();
        }
        if let Some(secs) = self.solc_timeout {
            config.compiler.timeout_secs = secs;
        }
    }
}

impl GenerateOptions {
    fn apply(&self, config: &mut PipelineConfig) {
        let generator = &mut config.generator;
        if let Some(program) = &self.generator {
            generator.program = program.clone();
            generator.args.clear();
        }
        if !self.generator_args.is_empty() {
            generator.args = self.generator_args.clone();
        }
        if let Some(model) = &self.model {
            generator.model = model.clone();
        }
        if let Some(timeout) = self.timeout {
            generator.timeout_secs = timeout;
        }
        if let Some(retries) = self.retries {
            generator.retries = retries;
        }
        if let Some(suffix) = &self.input_suffix {
            generator.input_suffix = suffix.clone();
        }
        if let Some(suffix) = &self.output_suffix {
            generator.output_suffix = suffix.clone();
        }
        if let Some(max) = self.max_concurrent {
            config.scheduler.max_concurrent = max;
        }
        if let Some(delay) = self.delay_ms {
            config.scheduler.inter_batch_delay_ms = delay;
        }
    }

    fn request(&self, jobs_dir: PathBuf) -> GenerateRequest {
        let sizes = if self.sizes.is_empty() {
            SizeCategory::GENERATED.to_vec()
        } else {
            self.sizes.clone()
        };
        GenerateRequest {
            jobs_dir,
            out_dir: self.out.clone(),
            sizes,
            target: self.target.clone(),
            force: self.force,
            limit: self.limit,
        }
    }

    async fn execute(&self, config: &PipelineConfig, jobs_dir: PathBuf) -> Result<()> {
        let report = pipeline::generate(config, &self.request(jobs_dir)).await?;
        if let Some(path) = &self.summary_json {
            summary::write_report(path, &report)?;
        }
        if self.json {
            summary::print_json(&report.stats)?;
        } else {
            summary::print_batch(&report);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Flatten(args) => {
            args.apply(&mut config);
            config.validate()?;
            let flattened = pipeline::flatten_corpus(&config, &args.corpus, &args.units_out).await?;
            summary::print_flatten(&flattened);
        }
        Commands::Generate(args) => {
            args.options.apply(&mut config);
            config.validate()?;
            args.options.execute(&config, args.jobs_dir).await?;
        }
        Commands::Run(args) => {
            args.flatten.apply(&mut config);
            args.options.apply(&mut config);
            if args.jobs_dir.is_none() {
                // Generation reads exactly the units flattened here
                let unit_suffix = config.unit_suffix();
                if let Some(suffix) = &args.options.input_suffix {
                    if *suffix != unit_suffix {
                        bail!(
                            "--input-suffix {suffix} cannot match units written as *{unit_suffix}"
                        );
                    }
                }
                config.generator.input_suffix = unit_suffix;
            }
            config.validate()?;

            let flattened =
                pipeline::flatten_corpus(&config, &args.flatten.corpus, &args.flatten.units_out)
                    .await?;
            if !args.options.json {
                summary::print_flatten(&flattened);
            }

            let jobs_dir = args
                .jobs_dir
                .unwrap_or_else(|| args.flatten.units_out.clone());
            args.options.execute(&config, jobs_dir).await?;
        }
    }

    Ok(())
}
