// src/models/resolution.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Map-store value marking a raw name as intentionally excluded.
pub const SKIPPED_SENTINEL: &str = "skipped";

/// Cascade tier that settled a raw name, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    Skip,
    ExactCache,
    MapFuzzy,
    ProfileFuzzy,
    AcronymFuzzy,
    LiveLookup,
    Failed,
}

impl ResolutionTier {
    pub const ALL: [ResolutionTier; 7] = [
        ResolutionTier::Skip,
        ResolutionTier::ExactCache,
        ResolutionTier::MapFuzzy,
        ResolutionTier::ProfileFuzzy,
        ResolutionTier::AcronymFuzzy,
        ResolutionTier::LiveLookup,
        ResolutionTier::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::Skip => "skip",
            ResolutionTier::ExactCache => "exact_cache",
            ResolutionTier::MapFuzzy => "map_fuzzy",
            ResolutionTier::ProfileFuzzy => "profile_fuzzy",
            ResolutionTier::AcronymFuzzy => "acronym_fuzzy",
            ResolutionTier::LiveLookup => "live_lookup",
            ResolutionTier::Failed => "failed",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            ResolutionTier::Skip => "⏭️",
            ResolutionTier::ExactCache => "💾",
            ResolutionTier::MapFuzzy => "🗺️",
            ResolutionTier::ProfileFuzzy => "🏛️",
            ResolutionTier::AcronymFuzzy => "🔤",
            ResolutionTier::LiveLookup => "🌐",
            ResolutionTier::Failed => "❌",
        }
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the cascade decided for one raw name.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    Skipped,
    Cached {
        canonical: String,
    },
    /// A fuzzy tier reused an existing key. `matched_key` is the map or
    /// profile key that scored above the tier threshold.
    Matched {
        tier: ResolutionTier,
        matched_key: String,
        canonical: String,
        score: f64,
    },
    Discovered {
        canonical: String,
        via_acronym: bool,
    },
    Failed {
        failure_count: u64,
    },
}

impl ResolutionOutcome {
    pub fn tier(&self) -> ResolutionTier {
        match self {
            ResolutionOutcome::Skipped => ResolutionTier::Skip,
            ResolutionOutcome::Cached { .. } => ResolutionTier::ExactCache,
            ResolutionOutcome::Matched { tier, .. } => *tier,
            ResolutionOutcome::Discovered { .. } => ResolutionTier::LiveLookup,
            ResolutionOutcome::Failed { .. } => ResolutionTier::Failed,
        }
    }

    /// Canonical name recorded in the map store, if any.
    pub fn canonical(&self) -> Option<&str> {
        match self {
            ResolutionOutcome::Skipped => Some(SKIPPED_SENTINEL),
            ResolutionOutcome::Cached { canonical }
            | ResolutionOutcome::Matched { canonical, .. }
            | ResolutionOutcome::Discovered { canonical, .. } => Some(canonical),
            ResolutionOutcome::Failed { .. } => None,
        }
    }
}
