// src/utils/config.rs - Run configuration
//
// Read once from the environment at startup and passed explicitly to every
// component afterwards.

use log::{info, warn};
use std::env;
use std::fmt::Display;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SEARCH_API: &str = "https://api.openalex.org/institutions?search=";
pub const DEFAULT_SPECIFIC_SEARCH_API: &str =
    "https://api.openalex.org/institutions?filter=display_name.search:";

/// Locations of the corpus and the persisted stores.
#[derive(Debug, Clone, PartialEq)]
pub struct StorePaths {
    pub raw_data_dir: PathBuf,
    pub reference_data_dir: PathBuf,
    pub raw_file: PathBuf,
    pub frequency_file: PathBuf,
    pub profiles_file: PathBuf,
    pub map_file: PathBuf,
    pub failed_file: PathBuf,
}

impl StorePaths {
    pub fn new(raw_data_dir: &Path, reference_data_dir: &Path) -> Self {
        Self {
            raw_data_dir: raw_data_dir.to_path_buf(),
            reference_data_dir: reference_data_dir.to_path_buf(),
            raw_file: raw_data_dir.join("initial_run.jsonl"),
            frequency_file: reference_data_dir.join("universities_raw_name.jsonl"),
            profiles_file: reference_data_dir.join("universities_lookup.jsonl"),
            map_file: reference_data_dir.join("universities_map.jsonl"),
            failed_file: reference_data_dir.join("failed.jsonl"),
        }
    }

    pub fn from_env() -> Self {
        let raw_data_dir = PathBuf::from(env_string("UNIMATCH_RAW_DATA_DIR", "data/raw"));
        let reference_data_dir =
            PathBuf::from(env_string("UNIMATCH_REFERENCE_DATA_DIR", "data/reference"));
        Self {
            raw_file: raw_data_dir.join(env_string("UNIMATCH_RAW_FILE", "initial_run.jsonl")),
            frequency_file: reference_data_dir
                .join(env_string("UNIMATCH_FREQUENCY_FILE", "universities_raw_name.jsonl")),
            profiles_file: reference_data_dir
                .join(env_string("UNIMATCH_PROFILES_FILE", "universities_lookup.jsonl")),
            map_file: reference_data_dir.join(env_string("UNIMATCH_MAP_FILE", "universities_map.jsonl")),
            failed_file: reference_data_dir.join(env_string("UNIMATCH_FAILED_FILE", "failed.jsonl")),
            raw_data_dir,
            reference_data_dir,
        }
    }

    /// Where the JSON summary of a resolution run is written.
    pub fn run_report_file(&self, run_id: &str) -> PathBuf {
        self.reference_data_dir
            .join("runs")
            .join(format!("resolution_run_{}.json", run_id))
    }
}

/// Per-call HTTP policy for the directory client.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries beyond the first attempt.
    pub max_retries: u32,
    pub timeout: Duration,
    pub backoff_base: Duration,
    pub pre_call_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            timeout: Duration::from_secs(10),
            backoff_base: Duration::from_secs(1),
            pre_call_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_parse("API_MAX_RETRIES", defaults.max_retries),
            timeout: Duration::from_secs(env_parse("API_TIMEOUT_SECS", defaults.timeout.as_secs())),
            backoff_base: Duration::from_millis(env_parse(
                "API_BACKOFF_BASE_MS",
                defaults.backoff_base.as_millis() as u64,
            )),
            pre_call_delay: Duration::from_millis(env_parse(
                "API_PRE_CALL_DELAY_MS",
                defaults.pre_call_delay.as_millis() as u64,
            )),
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay after the failed attempt `attempt` (0-based): base * 2^attempt.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Sum of every backoff delay a call that always fails waits through.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_retries)
            .map(|attempt| self.backoff_delay(attempt))
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(d))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryConfig {
    pub search_endpoint: String,
    pub specific_search_endpoint: String,
    pub retry: RetryPolicy,
    pub rate_limit_per_sec: Option<NonZeroU32>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            search_endpoint: DEFAULT_SEARCH_API.to_string(),
            specific_search_endpoint: DEFAULT_SPECIFIC_SEARCH_API.to_string(),
            retry: RetryPolicy::default(),
            rate_limit_per_sec: None,
        }
    }
}

impl DirectoryConfig {
    pub fn from_env() -> Self {
        let rate_limit_per_sec = match env::var("API_RATE_LIMIT_PER_SEC") {
            Ok(raw) => match raw.trim().parse::<u32>().ok().and_then(NonZeroU32::new) {
                Some(limit) => Some(limit),
                None => {
                    warn!("Ignoring invalid API_RATE_LIMIT_PER_SEC value '{}'", raw);
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            search_endpoint: env_string("OPENALEX_SEARCH_API", DEFAULT_SEARCH_API),
            specific_search_endpoint: env_string(
                "OPENALEX_SPECIFIC_SEARCH_API",
                DEFAULT_SPECIFIC_SEARCH_API,
            ),
            retry: RetryPolicy::from_env(),
            rate_limit_per_sec,
        }
    }
}

/// Score cutoffs (0-100) for the three fuzzy tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThresholds {
    pub map: f64,
    pub profile: f64,
    pub acronym: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            map: 90.0,
            profile: 95.0,
            acronym: 95.0,
        }
    }
}

impl MatchThresholds {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            map: env_parse("MAP_MATCH_THRESHOLD", defaults.map),
            profile: env_parse("PROFILE_MATCH_THRESHOLD", defaults.profile),
            acronym: env_parse("ACRONYM_MATCH_THRESHOLD", defaults.acronym),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub paths: StorePaths,
    pub directory: DirectoryConfig,
    pub thresholds: MatchThresholds,
    /// Save all stores every N processed names; 0 saves only at the end.
    pub checkpoint_every: usize,
}

impl ResolverConfig {
    pub fn from_env() -> Self {
        Self {
            paths: StorePaths::from_env(),
            directory: DirectoryConfig::from_env(),
            thresholds: MatchThresholds::from_env(),
            checkpoint_every: env_parse("CHECKPOINT_EVERY", 50usize),
        }
    }

    pub fn log_config(&self) {
        info!("⚙️  Resolver configuration:");
        info!("   Corpus: {}", self.paths.raw_file.display());
        info!("   Reference data: {}", self.paths.reference_data_dir.display());
        info!(
            "   Directory endpoints: {} | {}",
            self.directory.search_endpoint, self.directory.specific_search_endpoint
        );
        info!(
            "   Retry policy: {} retries, {:?} timeout, {:?} base backoff, {:?} pre-call delay",
            self.directory.retry.max_retries,
            self.directory.retry.timeout,
            self.directory.retry.backoff_base,
            self.directory.retry.pre_call_delay
        );
        match self.directory.rate_limit_per_sec {
            Some(limit) => info!("   Rate limit: {} requests/second", limit),
            None => info!("   Rate limit: pre-call delay only"),
        }
        info!(
            "   Thresholds: map={} profile={} acronym={}",
            self.thresholds.map, self.thresholds.profile, self.thresholds.acronym
        );
        if self.checkpoint_every > 0 {
            info!("   Checkpoint every {} names", self.checkpoint_every);
        } else {
            info!("   Checkpoint at end of run only");
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value '{}' for {}, using default {}", raw, key, default);
            default
        }),
        Err(_) => default,
    }
}
