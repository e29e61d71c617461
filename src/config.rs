use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use validator::Validate;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_CHANNEL_PUSH_DELAY_MS: u64 = 300;
const DEFAULT_CHANNEL_PUSH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DB_TXN_TIMEOUT_SECS: u64 = 15;

/// How newly-allocated orders are released to the picking queue.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AutoReleaseInterval {
    Immediate,
    EveryFiveMinutes,
    EveryFifteenMinutes,
    Hourly,
}

impl AutoReleaseInterval {
    /// Tick period for the background release loop; `None` means release
    /// happens inline at allocation time.
    pub fn period_secs(&self) -> Option<u64> {
        match self {
            Self::Immediate => None,
            Self::EveryFiveMinutes => Some(300),
            Self::EveryFifteenMinutes => Some(900),
            Self::Hourly => Some(3600),
        }
    }
}

impl Default for AutoReleaseInterval {
    fn default() -> Self {
        Self::Immediate
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ChannelSyncConfig {
    /// Delay between consecutive pushes in an all-products sweep.
    #[serde(default = "default_push_delay_ms")]
    pub push_delay_ms: u64,

    /// Timeout for each outbound push.
    #[serde(default = "default_push_timeout_secs")]
    pub push_timeout_secs: u64,

    /// Fallback external location for aggregate pushes when no warehouse
    /// carries an external mapping.
    #[serde(default)]
    pub default_external_location_ref: Option<String>,
}

impl Default for ChannelSyncConfig {
    fn default() -> Self {
        Self {
            push_delay_ms: DEFAULT_CHANNEL_PUSH_DELAY_MS,
            push_timeout_secs: DEFAULT_CHANNEL_PUSH_TIMEOUT_SECS,
            default_external_location_ref: None,
        }
    }
}

/// Application configuration, layered from `config/default.toml`, an
/// environment-specific file, and `WMS_*` environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    pub database_url: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_db_txn_timeout_secs")]
    pub db_txn_timeout_secs: u64,

    #[serde(default)]
    pub auto_release: AutoReleaseInterval,

    #[serde(default)]
    pub channel_sync: ChannelSyncConfig,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_push_delay_ms() -> u64 {
    DEFAULT_CHANNEL_PUSH_DELAY_MS
}

fn default_push_timeout_secs() -> u64 {
    DEFAULT_CHANNEL_PUSH_TIMEOUT_SECS
}

fn default_db_txn_timeout_secs() -> u64 {
    DEFAULT_DB_TXN_TIMEOUT_SECS
}

impl AppConfig {
    /// Load configuration for the current run environment.
    pub fn load() -> Result<Self, ConfigError> {
        let run_env =
            std::env::var("WMS_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

        let mut builder = Config::builder()
            .set_default("environment", run_env.clone())?;

        let default_file = Path::new(CONFIG_DIR).join("default.toml");
        if default_file.exists() {
            builder = builder.add_source(File::from(default_file));
        }
        let env_file = Path::new(CONFIG_DIR).join(format!("{run_env}.toml"));
        if env_file.exists() {
            builder = builder.add_source(File::from(env_file));
        }

        // WMS_DATABASE_URL, WMS_PORT, WMS_CHANNEL_SYNC__PUSH_DELAY_MS, ...
        builder = builder.add_source(Environment::with_prefix("WMS").separator("__"));

        let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
        // Legacy deployments export the aggregate push target directly.
        if cfg.channel_sync.default_external_location_ref.is_none() {
            if let Ok(loc) = std::env::var("EXTERNAL_DEFAULT_LOCATION_ID") {
                if !loc.trim().is_empty() {
                    cfg.channel_sync.default_external_location_ref = Some(loc);
                }
            }
        }
        cfg.validate()
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;
        Ok(cfg)
    }

    /// Test-friendly constructor used by the integration harness.
    pub fn for_tests(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 0,
            log_level: "debug".to_string(),
            environment: "test".to_string(),
            db_txn_timeout_secs: DEFAULT_DB_TXN_TIMEOUT_SECS,
            auto_release: AutoReleaseInterval::Immediate,
            channel_sync: ChannelSyncConfig {
                push_delay_ms: 0,
                push_timeout_secs: 5,
                default_external_location_ref: None,
            },
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_release_periods() {
        assert_eq!(AutoReleaseInterval::Immediate.period_secs(), None);
        assert_eq!(AutoReleaseInterval::EveryFiveMinutes.period_secs(), Some(300));
        assert_eq!(AutoReleaseInterval::EveryFifteenMinutes.period_secs(), Some(900));
        assert_eq!(AutoReleaseInterval::Hourly.period_secs(), Some(3600));
    }

    #[test]
    fn test_config_uses_memory_friendly_defaults() {
        let cfg = AppConfig::for_tests("sqlite::memory:");
        assert_eq!(cfg.environment, "test");
        assert_eq!(cfg.channel_sync.push_delay_ms, 0);
    }
}
