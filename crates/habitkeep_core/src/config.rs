//! Store configuration resolved from the environment.
//!
//! # Invariants
//! - Blank environment values fall back to defaults.
//! - Resolution never fails; malformed numbers fall back to defaults.

use std::path::PathBuf;
use std::time::Duration;

pub const DATA_PATH_ENV: &str = "HABITKEEP_DATA_PATH";
pub const PERSIST_RETRY_MS_ENV: &str = "HABITKEEP_PERSIST_RETRY_MS";
const DEFAULT_DATA_FILE_NAME: &str = "habitkeep_state.json";

/// Where and how the state document is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// JSON state document path.
    pub data_path: PathBuf,
    /// Pause before the single retry of a failed document write.
    pub persist_retry_backoff: Duration,
}

impl StoreConfig {
    pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(25);

    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            persist_retry_backoff: Self::DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Reads `HABITKEEP_DATA_PATH` and `HABITKEEP_PERSIST_RETRY_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_path = lookup(DATA_PATH_ENV)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DATA_FILE_NAME));
        let persist_retry_backoff = lookup(PERSIST_RETRY_MS_ENV)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map_or(Self::DEFAULT_RETRY_BACKOFF, Duration::from_millis);

        Self {
            data_path,
            persist_retry_backoff,
        }
    }
}
