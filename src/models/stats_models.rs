// src/models/stats_models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::resolution::{ResolutionOutcome, ResolutionTier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub worklist_size: usize,
    pub processed: usize,
    pub tier_counts: BTreeMap<ResolutionTier, usize>,
    /// Names fetched by the acronym retry rather than the raw name.
    pub discovered_via_acronym: usize,
    pub checkpoints_written: usize,
    pub checkpoint_failures: usize,
    pub elapsed_secs: f64,
}

impl ResolutionStats {
    pub fn new(run_id: String, worklist_size: usize, dry_run: bool) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            dry_run,
            worklist_size,
            processed: 0,
            tier_counts: BTreeMap::new(),
            discovered_via_acronym: 0,
            checkpoints_written: 0,
            checkpoint_failures: 0,
            elapsed_secs: 0.0,
        }
    }

    pub fn record(&mut self, outcome: &ResolutionOutcome) {
        self.processed += 1;
        *self.tier_counts.entry(outcome.tier()).or_insert(0) += 1;
        if let ResolutionOutcome::Discovered { via_acronym: true, .. } = outcome {
            self.discovered_via_acronym += 1;
        }
    }

    pub fn count(&self, tier: ResolutionTier) -> usize {
        self.tier_counts.get(&tier).copied().unwrap_or(0)
    }

    /// Names that ended with a map entry other than the skip sentinel.
    pub fn resolved(&self) -> usize {
        self.processed - self.count(ResolutionTier::Skip) - self.count(ResolutionTier::Failed)
    }

    pub fn network_lookups_avoided(&self) -> usize {
        self.count(ResolutionTier::ExactCache)
            + self.count(ResolutionTier::MapFuzzy)
            + self.count(ResolutionTier::ProfileFuzzy)
            + self.count(ResolutionTier::AcronymFuzzy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_tiers() {
        let mut stats = ResolutionStats::new("run".to_string(), 4, false);
        stats.record(&ResolutionOutcome::Skipped);
        stats.record(&ResolutionOutcome::Cached { canonical: "A".to_string() });
        stats.record(&ResolutionOutcome::Discovered { canonical: "B".to_string(), via_acronym: true });
        stats.record(&ResolutionOutcome::Failed { failure_count: 1 });

        assert_eq!(stats.processed, 4);
        assert_eq!(stats.count(ResolutionTier::Skip), 1);
        assert_eq!(stats.count(ResolutionTier::MapFuzzy), 0);
        assert_eq!(stats.resolved(), 2);
        assert_eq!(stats.network_lookups_avoided(), 1);
        assert_eq!(stats.discovered_via_acronym, 1);
    }

    #[test]
    fn test_stats_serialize_tier_keys() {
        let mut stats = ResolutionStats::new("run".to_string(), 1, true);
        stats.record(&ResolutionOutcome::Skipped);
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["tier_counts"]["skip"], 1);
        assert_eq!(value["dry_run"], true);
    }
}
