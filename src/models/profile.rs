// src/models/profile.rs - Canonical institution profiles and directory payloads
use serde::{Deserialize, Serialize};

/// Citation statistics as reported by the directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    #[serde(rename = "2yr_mean_citedness")]
    pub two_year_mean_citedness: Option<f64>,
    pub h_index: Option<u64>,
    pub i10_index: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub city: Option<String>,
    pub geonames_city_id: Option<String>,
    pub region: Option<String>,
    pub country_code: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One candidate object from a directory `results` array. Only the fields
/// kept in a canonical profile are decoded; everything else is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstitutionRecord {
    pub id: Option<String>,
    pub display_name: String,
    pub works_count: Option<u64>,
    pub cited_by_count: Option<u64>,
    pub summary_stats: Option<SummaryStats>,
    pub geo: Option<GeoLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProfile {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub works_count: Option<u64>,
    pub cited_by_count: Option<u64>,
    pub summary_stats: Option<SummaryStats>,
    pub geo: Option<GeoLocation>,
}

impl From<InstitutionRecord> for CanonicalProfile {
    fn from(record: InstitutionRecord) -> Self {
        Self {
            id: record.id,
            display_name: Some(record.display_name),
            works_count: record.works_count,
            cited_by_count: record.cited_by_count,
            summary_stats: record.summary_stats,
            geo: record.geo,
        }
    }
}

impl CanonicalProfile {
    /// Fills fields that are still empty from `other`. Populated fields are
    /// never replaced, so a written profile only ever grows.
    pub fn merge_missing(&mut self, other: CanonicalProfile) {
        if self.id.is_none() {
            self.id = other.id;
        }
        if self.display_name.is_none() {
            self.display_name = other.display_name;
        }
        if self.works_count.is_none() {
            self.works_count = other.works_count;
        }
        if self.cited_by_count.is_none() {
            self.cited_by_count = other.cited_by_count;
        }
        if self.summary_stats.is_none() {
            self.summary_stats = other.summary_stats;
        }
        if self.geo.is_none() {
            self.geo = other.geo;
        }
    }
}

/// Value persisted in the profiles store: `{"<canonical name>": {"data": {...}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredProfile {
    pub data: CanonicalProfile,
}

impl StoredProfile {
    pub fn new(profile: CanonicalProfile) -> Self {
        Self { data: profile }
    }
}
