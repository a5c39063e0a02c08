//! # QTP Transport Configuration
//!
//! Settings for the connection lifecycle and message pump, loaded once at
//! startup and then passed by value into connectors.
//!
//! ## Sections
//!
//! - **connector**: naming, reconnect delay and the management control surface
//!   (bind address, port, max connections, accepting flag, graceful stop/close)
//! - **pump**: frame size limit, per-pass compose budget, idle park timeout
//! - **errors**: whether corrupted or unknown messages close the connection
//!
//! ## Usage
//!
//! ```no_run
//! use qtp_config::QtpConfig;
//!
//! let config = QtpConfig::load(Some(std::path::Path::new("config/qtp.toml")))?;
//! let limit = config.pump.compose_buffer_limit;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod defaults;
pub mod qtp_config;

// Re-export commonly used types
pub use qtp_config::{load_config, ConnectorConfig, ErrorPolicy, PumpConfig, QtpConfig};
