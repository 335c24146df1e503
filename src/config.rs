//! Configuration management for prom-query-proxy
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Datasource descriptors are validated while deserializing, so a loaded
//! `Config` never holds an unparsed URL or duration.

use crate::error::{AppError, AppResult};
use crate::shared::params::parse_duration_literal;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for the per-backend label-values timeout
const MAX_LABEL_VALUES_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Ordered datasource list; order decides selection ties
    pub datasources: Vec<Datasource>,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-backend timeout applied to each label-values fan-out request
    #[serde(default = "default_label_values_timeout")]
    pub label_values_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            label_values_timeout_seconds: default_label_values_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_label_values_timeout() -> u64 {
    30
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Raw datasource entry as written in the config file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatasourceSpec {
    url: String,
    resolution: String,
    #[serde(default)]
    retention: Option<String>,
    #[serde(default, alias = "startTime")]
    start_time: Option<String>,
}

/// A query backend and the routing facts attached to it
///
/// All fields are private: a `Datasource` is validated once when built and
/// cannot be mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "DatasourceSpec")]
pub struct Datasource {
    url: Url,
    resolution: Duration,
    retention: Option<Duration>,
    start_time: Option<DateTime<Utc>>,
}

impl Datasource {
    /// Create a datasource with unlimited retention
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the URL does not parse or is not http(s).
    pub fn new(url: &str, resolution: Duration) -> AppResult<Self> {
        Ok(Self {
            url: parse_base_url(url)?,
            resolution,
            retention: None,
            start_time: None,
        })
    }

    /// Set the retention window; zero means unlimited
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = (!retention.is_zero()).then_some(retention);
        self
    }

    /// Set the declared start time
    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Base URL requests are forwarded to
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Interval between stored samples
    pub fn resolution(&self) -> Duration {
        self.resolution
    }

    /// Retention window ending now, `None` when unlimited
    pub fn retention(&self) -> Option<Duration> {
        self.retention
    }

    /// Declared start time
    ///
    /// Parsed and reported at startup only; selection never consults it.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }
}

impl TryFrom<DatasourceSpec> for Datasource {
    type Error = AppError;

    fn try_from(spec: DatasourceSpec) -> Result<Self, Self::Error> {
        let resolution = parse_duration_literal(&spec.resolution).map_err(|e| {
            AppError::Config(format!(
                "datasource '{}' has invalid resolution: {}",
                spec.url, e
            ))
        })?;

        let mut datasource = Datasource::new(&spec.url, resolution)?;

        if let Some(retention) = spec.retention.as_deref() {
            let retention = parse_duration_literal(retention).map_err(|e| {
                AppError::Config(format!(
                    "datasource '{}' has invalid retention: {}",
                    spec.url, e
                ))
            })?;
            datasource = datasource.with_retention(retention);
        }

        if let Some(start_time) = spec.start_time.as_deref() {
            let start_time = DateTime::parse_from_rfc3339(start_time).map_err(|e| {
                AppError::Config(format!(
                    "datasource '{}' has invalid start_time '{}': {}",
                    spec.url, start_time, e
                ))
            })?;
            datasource = datasource.with_start_time(start_time.with_timezone(&Utc));
        }

        Ok(datasource)
    }
}

fn parse_base_url(raw: &str) -> AppResult<Url> {
    if raw.is_empty() {
        return Err(AppError::Config(
            "datasources[].url is required".to_string(),
        ));
    }

    let url = Url::parse(raw)
        .map_err(|e| AppError::Config(format!("datasource url '{}' is invalid: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(AppError::Config(format!(
            "datasource url '{}' must start with 'http://' or 'https://'",
            raw
        )));
    }

    Ok(url)
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Per-datasource checks already ran during deserialization; this covers
    /// the cross-field rules.
    pub fn validate(&self) -> AppResult<()> {
        if self.datasources.is_empty() {
            return Err(AppError::Config(
                "at least one [[datasources]] entry is required".to_string(),
            ));
        }

        let timeout = self.server.label_values_timeout_seconds;
        if timeout == 0 || timeout > MAX_LABEL_VALUES_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "server.label_values_timeout_seconds must be in 1..={}, got {}",
                MAX_LABEL_VALUES_TIMEOUT_SECONDS, timeout
            )));
        }

        Ok(())
    }

    /// Address the server binds to unless overridden on the command line
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Timeout applied to each backend during label-values aggregation
    pub fn label_values_timeout(&self) -> Duration {
        Duration::from_secs(self.server.label_values_timeout_seconds)
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
