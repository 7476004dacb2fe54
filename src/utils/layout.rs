// src/utils/layout.rs - One-time data directory setup
use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::config::{DEFAULT_SEARCH_API, DEFAULT_SPECIFIC_SEARCH_API};

const DATA_SUBDIRS: [&str; 4] = ["data/raw", "data/processed", "data/reference", "logs"];

#[derive(Debug)]
pub struct LayoutReport {
    pub directories: Vec<PathBuf>,
    /// None when an existing `.env` was left in place.
    pub env_file: Option<PathBuf>,
}

/// Creates the data directories under `root` and writes a `.env` template
/// pointing at them. An existing `.env` is never overwritten.
pub fn initialize_layout(root: &Path) -> Result<LayoutReport> {
    info!("Project root identified as {}", root.display());
    let mut directories = Vec::with_capacity(DATA_SUBDIRS.len());
    for sub in DATA_SUBDIRS {
        let dir = root.join(sub);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        directories.push(dir);
    }

    let env_path = root.join(".env");
    let env_file = if env_path.exists() {
        info!("{} already exists, leaving it untouched", env_path.display());
        None
    } else {
        fs::write(&env_path, env_template(root))
            .with_context(|| format!("Failed to write {}", env_path.display()))?;
        info!("{} generated successfully", env_path.display());
        Some(env_path)
    };

    Ok(LayoutReport { directories, env_file })
}

fn env_template(root: &Path) -> String {
    format!(
        "# Data directories\n\
         UNIMATCH_RAW_DATA_DIR={raw}\n\
         UNIMATCH_REFERENCE_DATA_DIR={reference}\n\
         UNIMATCH_RAW_FILE=initial_run.jsonl\n\
         \n\
         # Directory API\n\
         OPENALEX_SEARCH_API={search}\n\
         OPENALEX_SPECIFIC_SEARCH_API={specific}\n\
         API_MAX_RETRIES=4\n\
         API_TIMEOUT_SECS=10\n\
         API_BACKOFF_BASE_MS=1000\n\
         API_PRE_CALL_DELAY_MS=100\n\
         # API_RATE_LIMIT_PER_SEC=10\n\
         \n\
         # Matching\n\
         MAP_MATCH_THRESHOLD=90\n\
         PROFILE_MATCH_THRESHOLD=95\n\
         ACRONYM_MATCH_THRESHOLD=95\n\
         CHECKPOINT_EVERY=50\n\
         \n\
         RUST_LOG=info\n",
        raw = root.join("data/raw").display(),
        reference = root.join("data/reference").display(),
        search = DEFAULT_SEARCH_API,
        specific = DEFAULT_SPECIFIC_SEARCH_API,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_initialize_creates_directories_and_env() {
        let dir = tempdir().unwrap();
        let report = initialize_layout(dir.path()).unwrap();

        assert_eq!(report.directories.len(), 4);
        assert!(dir.path().join("data/reference").is_dir());
        assert!(dir.path().join("logs").is_dir());

        let env = fs::read_to_string(report.env_file.unwrap()).unwrap();
        assert!(env.contains("OPENALEX_SEARCH_API=https://api.openalex.org/institutions?search="));
        assert!(env.contains("MAP_MATCH_THRESHOLD=90"));
    }

    #[test]
    fn test_existing_env_is_kept() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".env"), "CUSTOM=1\n").unwrap();

        let report = initialize_layout(dir.path()).unwrap();
        assert!(report.env_file.is_none());
        assert_eq!(fs::read_to_string(dir.path().join(".env")).unwrap(), "CUSTOM=1\n");
    }
}
