//! # padcast-core
//!
//! Pure building blocks for turning raw DualSense-class controller reports
//! into calibrated input snapshots.
//!
//! - **`report`** – the 64-byte report layout, validation
//!   ([`RawReport`]) and the stateless [`decode`] function.
//! - **`domain`** – the per-device calibration state machine
//!   ([`CalibrationState`]), the deadzone transform, the decoded
//!   [`InputSnapshot`] and the pipeline [`Tuning`].
//!
//! This crate performs no I/O and has no async runtime dependency; device
//! access, timers and the listener transport live in `padcast-server`.
//!
//! # Example
//!
//! ```rust
//! use padcast_core::{decode, CalibrationState, SampleOutcome};
//!
//! let mut resting = [0u8; 64];
//! resting[1..5].copy_from_slice(&[130, 128, 128, 128]);
//!
//! let mut state = CalibrationState::new(2);
//! state.record_sample(&resting);
//! assert!(matches!(state.record_sample(&resting), SampleOutcome::Completed(_)));
//!
//! let snapshot = decode(&resting, &state).expect("calibrated");
//! assert_eq!(snapshot.left_stick.x, 0.0);
//! ```

pub mod domain;
pub mod report;

pub use domain::calibration::{
    AxisCalibration, CalibrationState, SampleAccumulator, SampleOutcome, StickCenters,
};
pub use domain::deadzone::{apply_deadzone, DEFAULT_DEADZONE};
pub use domain::snapshot::{Buttons, DPad, InputSnapshot, StickVector, Triggers};
pub use domain::tuning::{Tuning, TuningError, DEFAULT_SAMPLE_TARGET, DEFAULT_TICK_PERIOD};
pub use report::layout::REPORT_LEN;
pub use report::{decode, RawReport, ReportDecoder, ReportError};
