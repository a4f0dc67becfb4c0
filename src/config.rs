use std::{path::Path, str::FromStr, time::Duration};

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "TEMPERATURE_BRIDGE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "temperature_bridge.toml";
const ENV_PREFIX: &str = "TEMPERATURE_BRIDGE";

fn default_name() -> String {
    "Temperature Sensor".to_string()
}

fn default_url() -> String {
    "http://192.168.100.4/temperature".to_string()
}

fn default_request_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration. Error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid sensor url {url:?}. Error: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request timeout must be greater than zero.")]
    ZeroTimeout,

    #[error("Unknown log level {0:?}.")]
    InvalidLogLevel(String),
}

#[derive(Debug, Deserialize)]
struct RawSensorConfig {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default = "default_url")]
    url: String,
    // `config` lowercases keys read from files.
    #[serde(default, alias = "updateInterval", alias = "updateinterval")]
    update_interval: Option<u64>,
    #[serde(default = "default_request_timeout")]
    request_timeout: u64,
}

impl Default for RawSensorConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            url: default_url(),
            update_interval: None,
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLoggingConfig {
    #[serde(default = "default_log_level")]
    level: String,
}

impl Default for RawLoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    sensor: RawSensorConfig,
    #[serde(default)]
    logging: RawLoggingConfig,
}

/// The sensor instance. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Display label; the bridge never interprets it.
    pub name: String,
    pub url: Url,
    /// Seconds between polls. `None` or `Some(0)` disables polling.
    pub update_interval: Option<u64>,
    /// Seconds any single request may take.
    pub request_timeout: u64,
}

impl SensorConfig {
    /// The polling period, or `None` when polling is disabled.
    pub fn polling_interval(&self) -> Option<Duration> {
        match self.update_interval {
            Some(secs) if secs > 0 => Some(Duration::from_secs(secs)),
            _ => None,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LevelFilter,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub sensor: SensorConfig,
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Load defaults, then the optional TOML file at `path`, then
    /// `TEMPERATURE_BRIDGE_<SECTION>__<KEY>` environment variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::from_builder(builder)
    }

    /// Path named by `TEMPERATURE_BRIDGE_CONFIG`, or the default.
    pub fn default_path() -> String {
        std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder().add_source(File::from_str(contents, FileFormat::Toml)),
        )
    }

    fn from_builder(
        builder: ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let raw: RawConfig = builder.build()?.try_deserialize()?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let url = Url::parse(&raw.sensor.url).map_err(|e| ConfigError::InvalidUrl {
            url: raw.sensor.url.clone(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl {
                url: raw.sensor.url,
                reason: "scheme must be http or https".to_string(),
            });
        }

        if raw.sensor.request_timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let level = LevelFilter::from_str(&raw.logging.level)
            .map_err(|_| ConfigError::InvalidLogLevel(raw.logging.level.clone()))?;

        Ok(Self {
            sensor: SensorConfig {
                name: raw.sensor.name,
                url,
                update_interval: raw.sensor.update_interval,
                request_timeout: raw.sensor.request_timeout,
            },
            logging: LoggingConfig { level },
        })
    }
}
