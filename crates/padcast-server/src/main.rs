//! padcast: DualSense controller broadcaster, entry point.
//!
//! Attaches every matching controller, calibrates each one's stick centers
//! from a few seconds of resting reports, then streams decoded input to every
//! connected WebSocket listener as JSON.
//!
//! # Usage
//!
//! ```text
//! padcast [OPTIONS]
//!
//! Options:
//!   --config         <PATH>   TOML config file
//!   --ws-port        <PORT>   WebSocket listener port [default: 8080]
//!   --ws-bind        <IP>     WebSocket bind address [default: 0.0.0.0]
//!   --vendor-id      <ID>     USB vendor id, hex (0x054c) or decimal
//!   --product-id     <ID>     USB product id, hex (0x0ce6) or decimal
//!   --deadzone       <F>      Stick deadzone in [0, 1) [default: 0.1]
//!   --sample-target  <N>      Calibration samples per device [default: 100]
//!   --tick-period-ms <MS>     Calibration sample spacing [default: 50]
//!   --log-level      <LEVEL>  Log filter when RUST_LOG is unset [default: info]
//!   --demo                    Use one synthetic controller instead of HID
//! ```
//!
//! # Precedence
//!
//! Built-in defaults, then the config file, then environment variables, then
//! CLI flags.
//!
//! | Variable               | Flag               |
//! |------------------------|--------------------|
//! | `PADCAST_CONFIG`       | `--config`         |
//! | `PADCAST_WS_PORT`      | `--ws-port`        |
//! | `PADCAST_WS_BIND`      | `--ws-bind`        |
//! | `PADCAST_VENDOR_ID`    | `--vendor-id`      |
//! | `PADCAST_PRODUCT_ID`   | `--product-id`     |
//! | `PADCAST_DEADZONE`     | `--deadzone`       |
//! | `PADCAST_SAMPLE_TARGET`| `--sample-target`  |
//! | `PADCAST_TICK_PERIOD_MS`| `--tick-period-ms`|
//! | `PADCAST_LOG_LEVEL`    | `--log-level`      |

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use padcast_server::domain::ServerConfig;
use padcast_server::infrastructure::report_source::ScriptedDeviceProvider;
use padcast_server::infrastructure::{DeviceProvider, FileConfig, Service};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Calibrates DualSense controllers and broadcasts their input over WebSocket.
///
/// Every option is optional; unset options fall back to the config file and
/// then to built-in defaults.
#[derive(Debug, Parser)]
#[command(
    name = "padcast",
    about = "Calibrates DualSense controllers and broadcasts their input over WebSocket",
    version
)]
struct Cli {
    /// TOML config file.  Missing when given is an error.
    #[arg(long, env = "PADCAST_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port for the WebSocket listener.
    #[arg(long, env = "PADCAST_WS_PORT")]
    ws_port: Option<u16>,

    /// IP address to bind the WebSocket listener to.
    ///
    /// `0.0.0.0` accepts listeners from the LAN; `127.0.0.1` keeps the stream
    /// local.
    #[arg(long, env = "PADCAST_WS_BIND")]
    ws_bind: Option<String>,

    /// USB vendor id of the controllers to attach.
    #[arg(long, env = "PADCAST_VENDOR_ID", value_parser = parse_usb_id)]
    vendor_id: Option<u16>,

    /// USB product id of the controllers to attach.
    #[arg(long, env = "PADCAST_PRODUCT_ID", value_parser = parse_usb_id)]
    product_id: Option<u16>,

    /// Radius around the calibrated center with reduced stick response.
    #[arg(long, env = "PADCAST_DEADZONE")]
    deadzone: Option<f64>,

    /// Resting reports averaged per device during calibration.
    #[arg(long, env = "PADCAST_SAMPLE_TARGET")]
    sample_target: Option<u32>,

    /// Milliseconds between calibration samples.
    #[arg(long, env = "PADCAST_TICK_PERIOD_MS")]
    tick_period_ms: Option<u64>,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[arg(long, env = "PADCAST_LOG_LEVEL")]
    log_level: Option<String>,

    /// Serve one synthetic controller resting at center instead of real
    /// hardware.
    #[arg(long)]
    demo: bool,
}

/// Parses `0x054c`-style hex or plain decimal.
fn parse_usb_id(text: &str) -> Result<u16, String> {
    let text = text.trim();
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    };
    parsed.map_err(|e| format!("'{text}' is not a USB id: {e}"))
}

impl Cli {
    /// Merges the config file (if any) and these overrides into a validated
    /// [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, the bind
    /// address is not an IP address, or a tuning value is out of range.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let mut file = match &self.config {
            Some(path) => FileConfig::load(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => FileConfig::default(),
        };

        if let Some(port) = self.ws_port {
            file.server.ws_port = port;
        }
        if let Some(bind) = self.ws_bind {
            file.server.ws_bind = bind;
        }
        if let Some(level) = self.log_level {
            file.server.log_level = level;
        }
        if let Some(id) = self.vendor_id {
            file.device.vendor_id = id;
        }
        if let Some(id) = self.product_id {
            file.device.product_id = id;
        }
        if let Some(deadzone) = self.deadzone {
            file.calibration.deadzone = deadzone;
        }
        if let Some(target) = self.sample_target {
            file.calibration.sample_target = target;
        }
        if let Some(ms) = self.tick_period_ms {
            file.calibration.tick_period_ms = ms;
        }

        let config = file
            .into_server_config()
            .context("invalid configuration")?;
        config.validate().context("invalid calibration tuning")?;
        Ok(config)
    }
}

#[cfg(feature = "hid")]
fn hardware_provider(config: &ServerConfig) -> Box<dyn DeviceProvider> {
    Box::new(padcast_server::infrastructure::report_source::hid::HidDeviceProvider::new(
        config.device,
    ))
}

#[cfg(not(feature = "hid"))]
fn hardware_provider(_config: &ServerConfig) -> Box<dyn DeviceProvider> {
    Box::new(padcast_server::infrastructure::report_source::UnavailableDeviceProvider)
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// Runs on a single-threaded runtime: the service's event loop owns all
/// pipeline state, and HID reads happen on dedicated reader threads.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let demo = cli.demo;
    let config = cli.into_server_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "padcast starting: ws={}, device={:04x}:{:04x}, deadzone={}, calibration={} samples every {:?}",
        config.ws_bind_addr,
        config.device.vendor_id,
        config.device.product_id,
        config.tuning.deadzone,
        config.tuning.sample_target,
        config.tuning.tick_period
    );

    let provider = if demo {
        info!("demo mode: serving one synthetic controller");
        Box::new(ScriptedDeviceProvider::demo()) as Box<dyn DeviceProvider>
    } else {
        hardware_provider(&config)
    };

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let service = Service::bind(config).await?;
    service.run(provider, running).await?;

    info!("padcast stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
