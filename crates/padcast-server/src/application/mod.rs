//! Application layer for padcast-server.
//!
//! Knows *what* happens to a report (calibrate, decode, store, fan out) but
//! not where reports come from or how frames reach listeners.
//!
//! # Responsibilities
//!
//! - Driving per-device calibration from a [`Ticker`]
//! - Holding calibration state and snapshot slots in the [`ControllerHub`]
//! - Fanning envelopes out through the [`BroadcastDistributor`]
//!
//! # What does NOT belong here?
//!
//! - Opening HID devices or sockets (that is infrastructure)
//! - Spawning tasks or threads

pub mod broadcast;
pub mod calibration;
pub mod hub;

pub use broadcast::{
    BroadcastDistributor, BroadcastReport, ConnectionId, ConnectionRegistry, ListenerConnection,
    ListenerSendError,
};
pub use calibration::{
    calibrate, calibration_tick, ImmediateTicker, IntervalTicker, Ticker, TickOutcome,
};
pub use hub::ControllerHub;
