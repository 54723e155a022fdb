//! Domain types and math for the calibration and decoding pipeline.
//!
//! Everything in this module is pure: no I/O, no clocks, no async.  The
//! server crate supplies the device reads and the timer that drive
//! [`calibration::CalibrationState`].

pub mod calibration;
pub mod deadzone;
pub mod snapshot;
pub mod tuning;
