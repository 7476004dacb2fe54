// src/matching/manager.rs - Drives the cascade over the whole frequency worklist
use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

use crate::directory::DirectoryLookup;
use crate::matching::cascade::ResolutionCascade;
use crate::models::ResolutionStats;
use crate::storage::{JsonlStore, ReferenceData, ReferenceStores};
use crate::utils::config::ResolverConfig;
use crate::utils::progress_bars::logging::{tier_breakdown_message, ResolutionLogger};
use crate::utils::progress_bars::progress_config::ProgressConfig;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Process only the first N names of the worklist.
    pub limit: Option<usize>,
    /// Resolve in memory without writing any store.
    pub dry_run: bool,
    /// Write the run statistics as JSON next to the stores.
    pub write_report: bool,
}

/// Resolves every name of the frequency table, most frequent first, and
/// persists the reference stores every `checkpoint_every` names and at the end.
pub async fn run_resolution<D: DirectoryLookup>(
    config: &ResolverConfig,
    cascade: &ResolutionCascade<D>,
    options: &RunOptions,
    progress_config: &ProgressConfig,
) -> Result<ResolutionStats> {
    let logger = ResolutionLogger::resolution();
    let run_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    logger.log_phase("Loading", Some("frequency table and reference stores"));
    let worklist = load_worklist(&config.paths.frequency_file, options.limit);
    let stores = ReferenceStores::from_paths(&config.paths);
    let mut data = stores.load();

    let mut stats = ResolutionStats::new(run_id.clone(), worklist.len(), options.dry_run);
    logger.log_start(&run_id, worklist.len(), options.dry_run);

    if worklist.is_empty() {
        warn!(
            "Worklist is empty. Run the aggregate step first to fill {}",
            config.paths.frequency_file.display()
        );
    }

    let pb = progress_config.create_progress_bar(worklist.len() as u64, "names");

    for name in &worklist {
        let outcome = cascade.resolve(name, &mut data).await;
        stats.record(&outcome);

        if let Some(pb) = &pb {
            pb.inc(1);
            if progress_config.should_show_tier_breakdown() {
                pb.set_message(tier_breakdown_message(&stats));
            }
        }

        if !options.dry_run
            && config.checkpoint_every > 0
            && stats.processed % config.checkpoint_every == 0
        {
            checkpoint(&stores, &data, &mut stats, &logger);
        }
    }

    if let Some(pb) = &pb {
        pb.finish_with_message(tier_breakdown_message(&stats));
    }

    if options.dry_run {
        logger.log_phase("Dry run", Some("stores left untouched"));
    } else {
        checkpoint(&stores, &data, &mut stats, &logger);
    }

    stats.elapsed_secs = start.elapsed().as_secs_f64();
    logger.log_completion(&stats);

    if options.write_report {
        let report_path = config.paths.run_report_file(&run_id);
        write_run_report(&report_path, &stats)?;
        info!("📝 Run report written to {}", report_path.display());
    }

    Ok(stats)
}

/// Frequency-table keys in stored order, optionally truncated.
fn load_worklist(frequency_file: &Path, limit: Option<usize>) -> Vec<String> {
    let frequencies = JsonlStore::<u64>::new(frequency_file).load();
    let take = limit.unwrap_or(usize::MAX);
    frequencies.keys().take(take).map(str::to_string).collect()
}

fn checkpoint(
    stores: &ReferenceStores,
    data: &ReferenceData,
    stats: &mut ResolutionStats,
    logger: &ResolutionLogger,
) {
    let report = stores.save(data);
    if report.is_ok() {
        stats.checkpoints_written += 1;
    } else {
        stats.checkpoint_failures += 1;
    }
    logger.log_checkpoint(stats.processed, &report.failed_stores);
}

pub fn write_run_report(path: &Path, stats: &ResolutionStats) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(stats).context("Failed to serialize run report")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
