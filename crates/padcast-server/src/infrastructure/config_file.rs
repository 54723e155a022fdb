//! Optional TOML configuration file.
//!
//! Every section and field may be omitted; missing values take the built-in
//! defaults via `#[serde(default = "...")]`.  Example:
//!
//! ```toml
//! [server]
//! ws_bind = "127.0.0.1"
//! ws_port = 8080
//! log_level = "debug"
//!
//! [device]
//! vendor_id = 0x054C
//! product_id = 0x0CE6
//!
//! [calibration]
//! deadzone = 0.1
//! sample_target = 100
//! tick_period_ms = 50
//! ```
//!
//! The file is only read when a path is given (`--config` /
//! `PADCAST_CONFIG`).  CLI flags and environment variables are applied on top
//! of the result in `main.rs`.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use padcast_core::{Tuning, DEFAULT_DEADZONE, DEFAULT_SAMPLE_TARGET, DEFAULT_TICK_PERIOD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::config::{DeviceFilter, ServerConfig, DUALSENSE_PRODUCT_ID, DUALSENSE_VENDOR_ID};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field parsed but its value is unusable.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub device: DeviceSection,
    #[serde(default)]
    pub calibration: CalibrationSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// IP address for the WebSocket listener.
    #[serde(default = "default_ws_bind")]
    pub ws_bind: String,
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSection {
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,
    #[serde(default = "default_product_id")]
    pub product_id: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibrationSection {
    #[serde(default = "default_deadzone")]
    pub deadzone: f64,
    #[serde(default = "default_sample_target")]
    pub sample_target: u32,
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            ws_bind: default_ws_bind(),
            ws_port: default_ws_port(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
        }
    }
}

impl Default for CalibrationSection {
    fn default() -> Self {
        Self {
            deadzone: default_deadzone(),
            sample_target: default_sample_target(),
            tick_period_ms: default_tick_period_ms(),
        }
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_ws_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_ws_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_vendor_id() -> u16 {
    DUALSENSE_VENDOR_ID
}
fn default_product_id() -> u16 {
    DUALSENSE_PRODUCT_ID
}
fn default_deadzone() -> f64 {
    DEFAULT_DEADZONE
}
fn default_sample_target() -> u32 {
    DEFAULT_SAMPLE_TARGET
}
fn default_tick_period_ms() -> u64 {
    u64::try_from(DEFAULT_TICK_PERIOD.as_millis()).unwrap_or(50)
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or mistyped fields.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses the file at `path`.  A missing file is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Converts the file values into a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] if `server.ws_bind` is not an IP
    /// address.  Tuning ranges are checked later by
    /// [`ServerConfig::validate`], after CLI overrides.
    pub fn into_server_config(self) -> Result<ServerConfig, ConfigError> {
        let ip: IpAddr = self
            .server
            .ws_bind
            .parse()
            .map_err(|e| ConfigError::InvalidField {
                field: "server.ws_bind",
                reason: format!("'{}': {e}", self.server.ws_bind),
            })?;

        Ok(ServerConfig {
            ws_bind_addr: SocketAddr::new(ip, self.server.ws_port),
            device: DeviceFilter {
                vendor_id: self.device.vendor_id,
                product_id: self.device.product_id,
            },
            tuning: Tuning {
                deadzone: self.calibration.deadzone,
                sample_target: self.calibration.sample_target,
                tick_period: Duration::from_millis(self.calibration.tick_period_ms),
            },
            log_level: self.server.log_level,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
