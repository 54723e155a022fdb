//! Per-device pipeline state: calibration and latest snapshot.
//!
//! The hub holds one slot per *known* device index, i.e. every controller
//! that discovery matched, whether or not it could be opened.  Each slot owns
//! its device's [`CalibrationState`] and its most recent [`InputSnapshot`].
//! Nothing is shared across slots.
//!
//! ```text
//! slot 0: Calibrated  → Some(snapshot)   (decoding)
//! slot 1: Sampling    → None             (still calibrating)
//! slot 2: Failed      → None             (attach or read failure)
//! ```
//!
//! [`ControllerHub::apply_report`] is the only writer of snapshots, and it
//! only writes the slot whose device produced the report.

use padcast_core::{CalibrationState, InputSnapshot, ReportDecoder, Tuning};
use tracing::trace;

use crate::domain::messages::Envelope;

/// Calibration state and latest snapshot for every known device.
#[derive(Debug, Clone)]
pub struct ControllerHub {
    calibrations: Vec<CalibrationState>,
    snapshots: Vec<Option<InputSnapshot>>,
    decoder: ReportDecoder,
}

impl ControllerHub {
    /// Creates `slot_count` slots, all sampling towards `tuning.sample_target`.
    pub fn new(slot_count: usize, tuning: &Tuning) -> Self {
        Self {
            calibrations: vec![CalibrationState::new(tuning.sample_target); slot_count],
            snapshots: vec![None; slot_count],
            decoder: ReportDecoder::new(tuning.deadzone),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn calibration(&self, index: usize) -> Option<&CalibrationState> {
        self.calibrations.get(index)
    }

    pub fn calibration_mut(&mut self, index: usize) -> Option<&mut CalibrationState> {
        self.calibrations.get_mut(index)
    }

    pub fn snapshot(&self, index: usize) -> Option<&InputSnapshot> {
        self.snapshots.get(index).and_then(Option::as_ref)
    }

    /// Indices of devices still collecting calibration samples.
    pub fn sampling_indices(&self) -> Vec<usize> {
        self.calibrations
            .iter()
            .enumerate()
            .filter(|(_, state)| state.is_sampling())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn any_sampling(&self) -> bool {
        self.calibrations.iter().any(CalibrationState::is_sampling)
    }

    /// Marks a device that could not be opened.  Its slot stays `None`.
    pub fn mark_failed(&mut self, index: usize) {
        if let Some(state) = self.calibrations.get_mut(index) {
            state.abort();
        }
    }

    /// Decodes a streamed report for `index`.
    ///
    /// Returns the `controllers` envelope to broadcast when the report
    /// produced a snapshot; `None` when the device is not calibrated, the
    /// report is malformed, or the index is unknown.
    pub fn apply_report(&mut self, index: usize, report: &[u8]) -> Option<Envelope> {
        let calibration = self.calibrations.get(index)?;
        let Some(snapshot) = self.decoder.decode(report, calibration) else {
            trace!("controller {index}: report not decoded (len {})", report.len());
            return None;
        };
        self.snapshots[index] = Some(snapshot);
        Some(self.controllers_envelope())
    }

    /// The full current state, one entry per slot.
    pub fn controllers_envelope(&self) -> Envelope {
        Envelope::Controllers {
            controllers: self.snapshots.clone(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
