//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup by merging defaults, an optional TOML file and
//! CLI/environment overrides (see `main.rs` and
//! [`crate::infrastructure::config_file`]), validated, and then handed to the
//! service by value.
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! reads here) lets tests construct exactly the configuration they need.

use std::net::SocketAddr;

use padcast_core::{Tuning, TuningError};

/// USB vendor id of Sony Interactive Entertainment.
pub const DUALSENSE_VENDOR_ID: u16 = 0x054C;

/// USB product id of the DualSense controller.
pub const DUALSENSE_PRODUCT_ID: u16 = 0x0CE6;

/// Which HID devices count as controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self {
            vendor_id: DUALSENSE_VENDOR_ID,
            product_id: DUALSENSE_PRODUCT_ID,
        }
    }
}

impl DeviceFilter {
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

/// All runtime configuration for the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    ///
    /// `0.0.0.0` accepts listeners from any interface; `127.0.0.1` keeps the
    /// stream local to this machine.
    pub ws_bind_addr: SocketAddr,

    /// Controllers to attach.
    pub device: DeviceFilter,

    /// Calibration and deadzone tuning.
    pub tuning: Tuning,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    /// | Field          | Default                    |
    /// |----------------|----------------------------|
    /// | ws_bind_addr   | `0.0.0.0:8080`             |
    /// | device         | `054c:0ce6` (DualSense)    |
    /// | tuning         | [`Tuning::default`]        |
    /// | log_level      | `info`                     |
    fn default() -> Self {
        Self {
            ws_bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            device: DeviceFilter::default(),
            tuning: Tuning::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Checks the parts of the configuration that types alone cannot.
    ///
    /// # Errors
    ///
    /// Returns the [`TuningError`] for an unusable tuning value.
    pub fn validate(&self) -> Result<(), TuningError> {
        self.tuning.validate()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_port_is_8080() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.ws_bind_addr.port(), 8080);
        assert!(cfg.ws_bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_default_filter_is_dualsense() {
        let filter = DeviceFilter::default();
        assert!(filter.matches(0x054C, 0x0CE6));
        assert!(!filter.matches(0x054C, 0x09CC), "DualShock 4 is a different report layout");
    }

    #[test]
    fn test_default_tuning_matches_core_defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.tuning.deadzone, 0.1);
        assert_eq!(cfg.tuning.sample_target, 100);
        assert_eq!(cfg.tuning.tick_period, Duration::from_millis(50));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_tuning_fails_validation() {
        let mut cfg = ServerConfig::default();
        cfg.tuning.sample_target = 0;
        assert_eq!(cfg.validate(), Err(TuningError::ZeroSampleTarget));
    }
}
