pub mod profile;
pub mod resolution;
pub mod stats_models;

pub use profile::{CanonicalProfile, GeoLocation, InstitutionRecord, StoredProfile, SummaryStats};
pub use resolution::{ResolutionOutcome, ResolutionTier, SKIPPED_SENTINEL};
pub use stats_models::ResolutionStats;
