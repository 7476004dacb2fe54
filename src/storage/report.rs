// src/storage/report.rs - Summary of the persisted reference stores
use serde::Serialize;
use std::collections::HashSet;

use crate::models::SKIPPED_SENTINEL;
use crate::storage::ReferenceData;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreReport {
    pub profiles: usize,
    pub mappings: usize,
    pub skipped_mappings: usize,
    pub distinct_canonicals: usize,
    /// Profiles that no mapping points at.
    pub unreferenced_profiles: Vec<String>,
    /// Canonical names used by mappings but missing from the profile store.
    pub dangling_canonicals: Vec<String>,
    pub failed_names: usize,
    /// Most-failed names first.
    pub top_failures: Vec<(String, u64)>,
}

pub fn summarize(data: &ReferenceData, top_n: usize) -> StoreReport {
    let mut canonicals: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut skipped_mappings = 0;
    for canonical in data.map.values() {
        if canonical == SKIPPED_SENTINEL {
            skipped_mappings += 1;
        } else if seen.insert(canonical.as_str()) {
            canonicals.push(canonical.as_str());
        }
    }

    let unreferenced_profiles = data
        .profiles
        .keys()
        .filter(|key| !seen.contains(key))
        .map(str::to_string)
        .collect();
    let dangling_canonicals = canonicals
        .iter()
        .filter(|canonical| !data.profiles.contains_key(canonical))
        .map(|canonical| canonical.to_string())
        .collect();

    let mut top_failures: Vec<(String, u64)> = data
        .failures
        .iter()
        .map(|(name, count)| (name.to_string(), *count))
        .collect();
    top_failures.sort_by(|a, b| b.1.cmp(&a.1));
    top_failures.truncate(top_n);

    StoreReport {
        profiles: data.profiles.len(),
        mappings: data.map.len(),
        skipped_mappings,
        distinct_canonicals: canonicals.len(),
        unreferenced_profiles,
        dangling_canonicals,
        failed_names: data.failures.len(),
        top_failures,
    }
}
