//! Domain layer for padcast-server.
//!
//! Pure types with no I/O: the envelope protocol spoken to listeners and the
//! server configuration.  Decoding and calibration types come from
//! `padcast-core`.
//!
//! # What does NOT belong here?
//!
//! - Any `tokio`, socket or HID types
//! - File I/O or environment variable reading

pub mod config;
pub mod messages;

pub use config::{DeviceFilter, ServerConfig};
pub use messages::{Envelope, StatusKind};
