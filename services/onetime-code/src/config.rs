use serde::Deserialize;

use onetime_core::config::Config;

use crate::domain::types::DEFAULT_TTL_SECS;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct OnetimeCodeConfig {
    /// PostgreSQL connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// Code validity window in seconds (default 600). Env var: `ONETIME_CODE_TTL_SECS`.
    #[serde(default = "default_ttl_secs")]
    pub onetime_code_ttl_secs: i64,
    /// Seconds between reaper sweeps (default 60). Env var: `ONETIME_CODE_REAPER_INTERVAL_SECS`.
    #[serde(default = "default_reaper_interval_secs")]
    pub onetime_code_reaper_interval_secs: u64,
}

fn default_ttl_secs() -> i64 {
    DEFAULT_TTL_SECS
}

fn default_reaper_interval_secs() -> u64 {
    60
}

impl Config for OnetimeCodeConfig {}

impl OnetimeCodeConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.onetime_code_ttl_secs)
    }

    pub fn reaper_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.onetime_code_reaper_interval_secs.max(1))
    }
}
