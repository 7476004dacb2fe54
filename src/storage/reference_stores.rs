// src/storage/reference_stores.rs - The three stores a resolution run owns
use anyhow::Result;
use log::{error, info};
use std::path::Path;

use crate::models::StoredProfile;
use crate::storage::jsonl::{JsonlStore, OrderedTable};
use crate::utils::config::StorePaths;

/// In-memory state of the profiles, map and failure stores for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    pub profiles: OrderedTable<StoredProfile>,
    pub map: OrderedTable<String>,
    pub failures: OrderedTable<u64>,
}

/// Result of checkpointing all three stores. Each store is attempted even
/// when an earlier one fails.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub failed_stores: Vec<String>,
}

impl SaveReport {
    pub fn is_ok(&self) -> bool {
        self.failed_stores.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceStores {
    profiles: JsonlStore<StoredProfile>,
    map: JsonlStore<String>,
    failures: JsonlStore<u64>,
}

impl ReferenceStores {
    pub fn new(profiles: &Path, map: &Path, failures: &Path) -> Self {
        Self {
            profiles: JsonlStore::new(profiles),
            map: JsonlStore::new(map),
            failures: JsonlStore::new(failures),
        }
    }

    pub fn from_paths(paths: &StorePaths) -> Self {
        Self::new(&paths.profiles_file, &paths.map_file, &paths.failed_file)
    }

    pub fn load(&self) -> ReferenceData {
        let data = ReferenceData {
            profiles: self.profiles.load(),
            map: self.map.load(),
            failures: self.failures.load(),
        };
        info!(
            "Reference stores loaded: {} profiles, {} mappings, {} failure entries",
            data.profiles.len(),
            data.map.len(),
            data.failures.len()
        );
        data
    }

    /// Writes all three stores. Failures are logged at error level and
    /// reported back; the in-memory data is left untouched.
    pub fn save(&self, data: &ReferenceData) -> SaveReport {
        let mut report = SaveReport::default();
        record_save(&mut report, self.map.path(), self.map.save(&data.map));
        record_save(&mut report, self.profiles.path(), self.profiles.save(&data.profiles));
        record_save(&mut report, self.failures.path(), self.failures.save(&data.failures));
        report
    }
}

fn record_save(report: &mut SaveReport, path: &Path, result: Result<()>) {
    if let Err(e) = result {
        error!("Failed to write {}: {:#}", path.display(), e);
        report.failed_stores.push(path.display().to_string());
    }
}
