//! padcast-server library crate.
//!
//! Attaches DualSense-class controllers, calibrates their sticks, decodes
//! their reports and streams the result to WebSocket listeners as JSON.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Controllers (HID, 64-byte reports)
//!         ↓
//! [padcast-server]
//!   ├── domain/           Envelope protocol, ServerConfig
//!   ├── application/      Calibration driver, ControllerHub, BroadcastDistributor
//!   └── infrastructure/
//!         ├── report_source/  hidapi + scripted sources, reader threads
//!         ├── ws_server/      WebSocket accept loop (tokio-tungstenite)
//!         ├── config_file/    TOML config
//!         └── service/        Event loop
//!         ↓
//! Listeners (JSON over WebSocket)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain`, `padcast-core` and the source trait.
//! - `infrastructure` depends on all other layers plus `tokio`,
//!   `tokio-tungstenite` and `hidapi`.

/// Domain layer: pure types (no I/O).
pub mod domain;

/// Application layer: calibration, per-device state, fan-out.
pub mod application;

/// Infrastructure layer: devices, sockets, config file, event loop.
pub mod infrastructure;
