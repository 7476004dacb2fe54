// src/utils/progress_bars/logging.rs - Logging helpers for resolution runs
use log::{debug, error, info, warn};
use std::time::Instant;

use crate::models::{ResolutionOutcome, ResolutionStats, ResolutionTier};

#[derive(Clone)]
pub struct ResolutionLogger {
    stage_name: &'static str,
    stage_emoji: &'static str,
    start_time: Instant,
}

impl ResolutionLogger {
    pub fn new(stage_name: &'static str, stage_emoji: &'static str) -> Self {
        Self {
            stage_name,
            stage_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn resolution() -> Self {
        Self::new("RESOLVE", "🎓")
    }

    pub fn aggregation() -> Self {
        Self::new("AGGREGATE", "📊")
    }

    pub fn log_start(&self, run_id: &str, worklist_size: usize, dry_run: bool) {
        info!(
            "[{}] {} 🚀 Starting run {} over {} names{}",
            self.stage_name,
            self.stage_emoji,
            run_id,
            worklist_size,
            if dry_run { " (dry run, stores will not be written)" } else { "" }
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.stage_name, self.stage_emoji, phase, details, elapsed.as_secs_f32()
            ),
            None => info!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.stage_name, self.stage_emoji, phase, elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_outcome(&self, name: &str, outcome: &ResolutionOutcome) {
        let tier = outcome.tier();
        match outcome {
            ResolutionOutcome::Skipped => {
                info!("[{}] {} SKIPPED {}", self.stage_name, tier.emoji(), name)
            }
            ResolutionOutcome::Cached { canonical } => debug!(
                "[{}] {} {} -> {} (already mapped)",
                self.stage_name,
                tier.emoji(),
                name,
                canonical
            ),
            ResolutionOutcome::Matched { matched_key, canonical, score, .. } => info!(
                "[{}] {} {} -> {} via '{}' ({}, score {:.1})",
                self.stage_name,
                tier.emoji(),
                name,
                canonical,
                matched_key,
                tier,
                score
            ),
            ResolutionOutcome::Discovered { canonical, via_acronym } => info!(
                "[{}] {} {} -> {} (new profile{})",
                self.stage_name,
                tier.emoji(),
                name,
                canonical,
                if *via_acronym { ", found by acronym" } else { "" }
            ),
            ResolutionOutcome::Failed { failure_count } => warn!(
                "[{}] {} failed to find {} for {} times",
                self.stage_name,
                tier.emoji(),
                name,
                failure_count
            ),
        }
    }

    pub fn log_checkpoint(&self, processed: usize, failed_stores: &[String]) {
        if failed_stores.is_empty() {
            info!(
                "[{}] {} 💾 Checkpoint after {} names [+{:.1}s]",
                self.stage_name,
                self.stage_emoji,
                processed,
                self.start_time.elapsed().as_secs_f32()
            );
        } else {
            error!(
                "[{}] {} ⚠️  Checkpoint after {} names did not write: {:?} (in-memory state kept)",
                self.stage_name, self.stage_emoji, processed, failed_stores
            );
        }
    }

    pub fn log_completion(&self, stats: &ResolutionStats) {
        info!(
            "[{}] {} 🎉 COMPLETED: {} of {} names processed in {:.2?}",
            self.stage_name,
            self.stage_emoji,
            stats.processed,
            stats.worklist_size,
            self.start_time.elapsed()
        );
        for tier in ResolutionTier::ALL {
            let count = stats.count(tier);
            if count > 0 {
                info!("[{}]    {} {:<14} {}", self.stage_name, tier.emoji(), tier.as_str(), count);
            }
        }
        info!(
            "[{}] {} 📊 Results: {} resolved, {} lookups avoided by local tiers, {} via acronym retry",
            self.stage_name,
            self.stage_emoji,
            stats.resolved(),
            stats.network_lookups_avoided(),
            stats.discovered_via_acronym
        );
        if stats.checkpoint_failures > 0 {
            warn!(
                "[{}] {} ⚠️  {} checkpoint(s) failed to write",
                self.stage_name, self.stage_emoji, stats.checkpoint_failures
            );
        }
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.stage_name, self.stage_emoji, message);
    }
}

/// One-line progress message with counts per tier.
pub fn tier_breakdown_message(stats: &ResolutionStats) -> String {
    format!(
        "map {} | profile {} | acronym {} | new {} | skip {} | fail {}",
        stats.count(ResolutionTier::MapFuzzy) + stats.count(ResolutionTier::ExactCache),
        stats.count(ResolutionTier::ProfileFuzzy),
        stats.count(ResolutionTier::AcronymFuzzy),
        stats.count(ResolutionTier::LiveLookup),
        stats.count(ResolutionTier::Skip),
        stats.count(ResolutionTier::Failed)
    )
}
