//! Infrastructure layer for padcast-server.
//!
//! Everything that touches the outside world: HID devices, sockets, files
//! and threads.
//!
//! # Responsibilities
//!
//! - Enumerating and opening controllers, reading their reports
//! - Accepting WebSocket listeners and writing frames to them
//! - Loading the optional TOML config file
//! - Running the service event loop that wires it all together
//!
//! # What does NOT belong here?
//!
//! - Report decoding or calibration math (that is `padcast-core`)
//! - Envelope shapes (that is the domain layer)
//! - CLI parsing (that is done in `main.rs`)

pub mod config_file;
pub mod report_source;
pub mod service;
pub mod ws_server;

pub use config_file::{ConfigError, FileConfig};
pub use report_source::{DeviceProvider, ReportSource, SourceError};
pub use service::Service;
