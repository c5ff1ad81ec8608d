// src/config.rs

//! Manages server configuration: loading, resolving defaults, and validation.

use crate::core::protocol::frame::{DEFAULT_MAX_FRAME_SIZE, LENGTH_PREFIX_LEN};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_port() -> u16 {
    9445
}

/// A raw representation of the config file before validation.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_max_clients")]
    max_clients: usize,
    #[serde(default = "default_idle_timeout", with = "humantime_serde")]
    idle_timeout: Duration,
    #[serde(default = "default_max_frame_size")]
    max_frame_size: usize,
    #[serde(default = "default_origin")]
    origin: String,
    #[serde(default)]
    smoothing_cfg: u32,
    #[serde(default)]
    metrics: MetricsConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    19445
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    64
}
fn default_idle_timeout() -> Duration {
    Duration::from_secs(5)
}
fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}
fn default_origin() -> String {
    "ProtoBuffer".to_string()
}

/// Represents the final, validated server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub max_clients: usize,
    /// A client that sends nothing for this long is disconnected.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
    /// Frames declaring a larger payload are a protocol violation.
    pub max_frame_size: usize,
    /// Label announced with every registration; the client IP is appended.
    pub origin: String,
    pub smoothing_cfg: u32,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            idle_timeout: default_idle_timeout(),
            max_frame_size: default_max_frame_size(),
            origin: default_origin(),
            smoothing_cfg: 0,
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid configuration in '{path}'"))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw_config: RawConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;

        let config = Config {
            host: raw_config.host,
            port: raw_config.port,
            log_level: raw_config.log_level,
            max_clients: raw_config.max_clients,
            idle_timeout: raw_config.idle_timeout,
            max_frame_size: raw_config.max_frame_size,
            origin: raw_config.origin,
            smoothing_cfg: raw_config.smoothing_cfg,
            metrics: raw_config.metrics,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }
        if self.idle_timeout.is_zero() {
            return Err(anyhow!("idle_timeout cannot be 0"));
        }
        if self.max_frame_size < LENGTH_PREFIX_LEN {
            return Err(anyhow!(
                "max_frame_size must be at least {} bytes",
                LENGTH_PREFIX_LEN
            ));
        }
        if self.max_frame_size > u32::MAX as usize {
            return Err(anyhow!(
                "max_frame_size cannot exceed {} bytes",
                u32::MAX
            ));
        }
        if self.origin.trim().is_empty() {
            return Err(anyhow!("origin cannot be empty"));
        }

        if self.idle_timeout < Duration::from_millis(100) {
            warn!(
                "very short idle_timeout of {:?}; clients will be dropped between frames.",
                self.idle_timeout
            );
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(anyhow!("metrics.port cannot be 0"));
            }
            if self.metrics.port == self.port {
                return Err(anyhow!(
                    "metrics.port cannot be the same as the main server port"
                ));
            }
        }
        Ok(())
    }
}
