//! QTP Configuration Module
//!
//! Loads connector, pump and error-policy settings from a TOML file with
//! `QTP_`-prefixed environment overrides (`QTP_CONNECTOR__PORT=7400`).

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_PATH: &str = "config/qtp.toml";

/// Complete transport configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct QtpConfig {
    pub connector: ConnectorConfig,
    pub pump: PumpConfig,
    pub errors: ErrorPolicy,
}

/// Connector settings, the control surface a transport exposes to management
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ConnectorConfig {
    pub name: String,
    pub reconnect_delay_ms: u64,
    pub thread_name_prefix: String,
    pub bind_address: String,
    pub port: u16,
    pub max_connections: usize,
    pub accepting: bool,
    pub graceful_stop_period_ms: u64,
    /// Share of connections closed by a graceful close, 0..=100
    pub graceful_close_percentage: u8,
}

/// Message pump sizing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PumpConfig {
    pub max_frame_size: usize,
    pub compose_buffer_limit: usize,
    pub idle_park_ms: u64,
}

/// Whether per-message errors are skipped or close the connection
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ErrorPolicy {
    pub skip_corrupted_messages: bool,
    pub skip_unknown_messages: bool,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            name: defaults::connector::NAME.to_string(),
            reconnect_delay_ms: defaults::connector::RECONNECT_DELAY_MS,
            thread_name_prefix: defaults::connector::THREAD_NAME_PREFIX.to_string(),
            bind_address: defaults::connector::BIND_ADDRESS.to_string(),
            port: defaults::connector::PORT,
            max_connections: defaults::connector::MAX_CONNECTIONS,
            accepting: true,
            graceful_stop_period_ms: defaults::connector::GRACEFUL_STOP_PERIOD_MS,
            graceful_close_percentage: defaults::connector::GRACEFUL_CLOSE_PERCENTAGE,
        }
    }
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            max_frame_size: defaults::pump::MAX_FRAME_SIZE,
            compose_buffer_limit: defaults::pump::COMPOSE_BUFFER_LIMIT,
            idle_park_ms: defaults::pump::IDLE_PARK_MS,
        }
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            skip_corrupted_messages: true,
            skip_unknown_messages: true,
        }
    }
}

impl ConnectorConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn graceful_stop_period(&self) -> Duration {
        Duration::from_millis(self.graceful_stop_period_ms)
    }
}

impl PumpConfig {
    pub fn idle_park(&self) -> Duration {
        Duration::from_millis(self.idle_park_ms)
    }
}

impl QtpConfig {
    /// Load configuration from a file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or(Path::new(DEFAULT_PATH));
        info!("Loading QTP config: {:?}", path);

        let config = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(
                Environment::with_prefix("QTP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut config: QtpConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.expand_env_vars()?;
        config.validate()?;
        debug!(connector = %config.connector.name, "QTP config loaded");
        Ok(config)
    }

    /// Parse configuration from TOML text, without environment overrides
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: QtpConfig = toml::from_str(text).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Expand environment variables in string values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        let connector = &mut self.connector;
        for (field, value) in [
            ("name", &mut connector.name),
            ("thread_name_prefix", &mut connector.thread_name_prefix),
            ("bind_address", &mut connector.bind_address),
        ] {
            let expanded = shellexpand::env(value.as_str())
                .with_context(|| format!("Failed to expand connector.{field}"))?
                .into_owned();
            *value = expanded;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.connector.max_connections == 0 {
            bail!("connector.max_connections must be positive");
        }
        if self.connector.graceful_close_percentage > 100 {
            bail!(
                "connector.graceful_close_percentage must be within 0..=100, got {}",
                self.connector.graceful_close_percentage
            );
        }
        if self.pump.max_frame_size == 0 {
            bail!("pump.max_frame_size must be positive");
        }
        if self.pump.compose_buffer_limit == 0 {
            bail!("pump.compose_buffer_limit must be positive");
        }
        Ok(())
    }
}

/// Convenience function to load configuration from the default location
pub fn load_config() -> Result<QtpConfig> {
    QtpConfig::load(None)
}
