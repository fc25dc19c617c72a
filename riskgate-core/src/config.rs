//! Core-level configuration: where snapshots live and how often they
//! refresh. The HTTP-facing `riskgate-server` config wraps this.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the snapshot base directory.
pub const BLOCKLIST_DIR_ENV: &str = "RISKGATE_BLOCKLIST_DIR";

/// Default project-relative snapshot base directory.
pub const DEFAULT_BLOCKLIST_DIR: &str = "priv/blocklists";

/// Periodic refresh cadence.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Retry cadence after a failed refresh.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub base_dir: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BLOCKLIST_DIR),
        }
    }
}

impl LoaderConfig {
    pub fn from_env() -> Self {
        let base_dir = std::env::var(BLOCKLIST_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_BLOCKLIST_DIR));
        Self { base_dir }
    }
}
