use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use unimatch_lib::aggregation::collect_raw_names;
use unimatch_lib::directory::client::minimum_exhaustion_time;
use unimatch_lib::directory::{DirectoryClient, ReqwestTransport};
use unimatch_lib::matching::{run_resolution, ResolutionCascade, RunOptions};
use unimatch_lib::utils::config::{ResolverConfig, StorePaths};
use unimatch_lib::utils::env::load_env;
use unimatch_lib::utils::layout::initialize_layout;
use unimatch_lib::utils::progress_bars::progress_config::ProgressConfig;

#[derive(Parser)]
#[command(author, version, about = "Resolve scraped university names to canonical directory profiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the data directories and a .env template
    Init {
        /// Project root to initialise
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Count raw university names in the scraped corpus
    Aggregate {
        /// Corpus file (defaults to the configured raw file)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Frequency table file (defaults to the configured one)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Resolve every aggregated name against the reference stores
    Resolve(ResolveArgs),
    /// Aggregate, then resolve
    Run(ResolveArgs),
}

#[derive(Args, Clone)]
struct ResolveArgs {
    /// Only process the N most frequent names
    #[arg(long)]
    limit: Option<usize>,

    /// Dry run mode (don't write the reference stores)
    #[arg(long)]
    dry_run: bool,

    /// Write a JSON run report next to the stores
    #[arg(long)]
    report: bool,
}

impl From<ResolveArgs> for RunOptions {
    fn from(args: ResolveArgs) -> Self {
        RunOptions {
            limit: args.limit,
            dry_run: args.dry_run,
            write_report: args.report,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and environment
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    load_env();

    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Command::Init { root } => {
            let report = initialize_layout(&root).context("Failed to initialise data layout")?;
            for dir in &report.directories {
                info!("📁 {}", dir.display());
            }
        }
        Command::Aggregate { input, output } => {
            let paths = StorePaths::from_env();
            aggregate(&paths, input, output)?;
        }
        Command::Resolve(args) => {
            let config = ResolverConfig::from_env();
            resolve(&config, args.into()).await?;
        }
        Command::Run(args) => {
            let config = ResolverConfig::from_env();
            aggregate(&config.paths, None, None)?;
            resolve(&config, args.into()).await?;
        }
    }

    info!("Done in {:.2?}", start.elapsed());
    Ok(())
}

fn aggregate(paths: &StorePaths, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let input = input.unwrap_or_else(|| paths.raw_file.clone());
    let output = output.unwrap_or_else(|| paths.frequency_file.clone());
    info!("Phase 1: Collecting raw names from {}", input.display());
    let summary = collect_raw_names(&input, &output)?;
    info!(
        "Phase 1 complete: {} distinct names written to {}",
        summary.distinct_names,
        output.display()
    );
    Ok(())
}

async fn resolve(config: &ResolverConfig, options: RunOptions) -> Result<()> {
    config.log_config();
    info!(
        "An unanswered directory call gives up after at least {:?}",
        minimum_exhaustion_time(&config.directory)
    );
    let progress_config = ProgressConfig::from_env();

    let transport = ReqwestTransport::new()?;
    let client = DirectoryClient::new(transport, config.directory.clone());
    let cascade = ResolutionCascade::new(client, config.thresholds);

    info!("Phase 2: Resolving names");
    let stats = run_resolution(config, &cascade, &options, &progress_config)
        .await
        .context("Resolution run failed")?;
    info!(
        "Phase 2 complete: run {} resolved {} of {} names",
        stats.run_id,
        stats.resolved(),
        stats.processed
    );
    Ok(())
}
