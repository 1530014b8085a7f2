//! Server configuration resolved from the environment.

use habitkeep_core::{default_log_level, StoreConfig};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const BIND_ADDR_ENV: &str = "HABITKEEP_BIND_ADDR";
pub const LOG_LEVEL_ENV: &str = "HABITKEEP_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "HABITKEEP_LOG_DIR";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// File logging is enabled only when set.
    pub log_dir: Option<PathBuf>,
    pub store: StoreConfig,
}

impl ServerConfig {
    /// # Errors
    /// - `HABITKEEP_BIND_ADDR` is set but is not a socket address.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok(), StoreConfig::from_env())
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        store: StoreConfig,
    ) -> Result<Self, String> {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let raw_addr = non_blank(BIND_ADDR_ENV).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse::<SocketAddr>()
            .map_err(|err| format!("invalid {BIND_ADDR_ENV} `{raw_addr}`: {err}"))?;

        Ok(Self {
            bind_addr,
            log_level: non_blank(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: non_blank(LOG_DIR_ENV).map(PathBuf::from),
            store,
        })
    }
}
