use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ASSET_URL_KEY: &str = "url-4K-SDR-240FPS";
pub const DEFAULT_DAEMON_NAME: &str = "idleassetsd";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// HTTPS manifest location. When unset the manifest is read from the
    /// active storage root.
    pub manifest_url: Option<String>,
    pub concurrency: usize,
    pub download_retries: u32,
    pub retry_backoff_ms: u64,
    pub timeout_secs: u64,
    pub user_root: Option<String>,
    pub legacy_root: Option<String>,
    pub daemon_name: String,
    pub asset_url_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            manifest_url: None,
            concurrency: 4,
            download_retries: 5,
            retry_backoff_ms: 1000,
            timeout_secs: 600,
            user_root: None,
            legacy_root: None,
            daemon_name: DEFAULT_DAEMON_NAME.to_string(),
            asset_url_key: DEFAULT_ASSET_URL_KEY.to_string(),
        }
    }
}

impl AppConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Worker count for downloads and size probes, never zero.
    pub fn workers(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.retry_backoff_ms;
        Duration::from_millis(base + u64::from(attempt) * base / 2)
    }
}

/// Defaults, then an optional `Config.toml`, then `AERIAL_SYNC_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();
    let builder = Config::builder()
        .set_default("concurrency", defaults.concurrency as u64)?
        .set_default("download_retries", u64::from(defaults.download_retries))?
        .set_default("retry_backoff_ms", defaults.retry_backoff_ms)?
        .set_default("timeout_secs", defaults.timeout_secs)?
        .set_default("daemon_name", defaults.daemon_name)?
        .set_default("asset_url_key", defaults.asset_url_key)?
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("AERIAL_SYNC").try_parsing(true))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
