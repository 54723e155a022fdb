//! Stick-center calibration state machine.
//!
//! Each device starts in [`CalibrationState::Sampling`] and averages a fixed
//! number of resting reports to find where its sticks sit when untouched.
//!
//! ```text
//!                record_sample (count < target)
//!                ┌──────────┐
//!                ▼          │
//!          ┌──────────┐─────┘   count == target   ┌─────────────┐
//!  new ──▶ │ Sampling │ ──────────────────────────▶ │ Calibrated  │
//!          └──────────┘                             └─────────────┘
//!                │ abort (device read failed)
//!                ▼
//!          ┌──────────┐
//!          │  Failed  │
//!          └──────────┘
//! ```
//!
//! Both terminal states are final: later samples are ignored and nothing
//! restarts sampling.  The state machine does no I/O; the caller performs the
//! device read and reports either the bytes ([`CalibrationState::record_sample`])
//! or the failure ([`CalibrationState::abort`]).

use tracing::debug;

use crate::report::layout::{
    AXIS_CENTER, LEFT_STICK_X, LEFT_STICK_Y, REPORT_LEN, RIGHT_STICK_X, RIGHT_STICK_Y,
};

// ── Per-axis accumulator ──────────────────────────────────────────────────────

/// Running sum of raw byte samples for one stick axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisCalibration {
    sum: u64,
    sample_count: u32,
}

impl AxisCalibration {
    fn add(&mut self, raw: u8) {
        self.sum += u64::from(raw);
        self.sample_count += 1;
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Normalized center in `[-1, 1]`, or `None` until exactly `target`
    /// samples have been recorded.
    pub fn center(&self, target: u32) -> Option<f64> {
        if target == 0 || self.sample_count != target {
            return None;
        }
        let average = self.sum as f64 / f64::from(target);
        Some((average - AXIS_CENTER) / AXIS_CENTER)
    }
}

/// Accumulators for all four stick axes.  Counts always advance together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleAccumulator {
    pub left_x: AxisCalibration,
    pub left_y: AxisCalibration,
    pub right_x: AxisCalibration,
    pub right_y: AxisCalibration,
    target: u32,
}

impl SampleAccumulator {
    fn new(target: u32) -> Self {
        Self {
            left_x: AxisCalibration::default(),
            left_y: AxisCalibration::default(),
            right_x: AxisCalibration::default(),
            right_y: AxisCalibration::default(),
            target,
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.left_x.sample_count
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    fn centers(&self) -> Option<StickCenters> {
        Some(StickCenters {
            left_x: self.left_x.center(self.target)?,
            left_y: self.left_y.center(self.target)?,
            right_x: self.right_x.center(self.target)?,
            right_y: self.right_y.center(self.target)?,
        })
    }
}

/// Normalized resting position of every stick axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StickCenters {
    pub left_x: f64,
    pub left_y: f64,
    pub right_x: f64,
    pub right_y: f64,
}

// ── State machine ─────────────────────────────────────────────────────────────

/// Result of feeding one report to [`CalibrationState::record_sample`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// The sample was counted; more are needed.
    Accumulated { count: u32, target: u32 },
    /// The report had the wrong length and was not counted.
    Skipped { len: usize },
    /// This sample reached the target; the device is now calibrated.
    Completed(StickCenters),
    /// Calibration had already finished or failed.
    Ignored,
}

/// Calibration progress of one device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationState {
    Sampling(SampleAccumulator),
    Calibrated(StickCenters),
    Failed,
}

impl CalibrationState {
    /// Starts sampling towards `sample_target` resting reports.
    ///
    /// A target of `0` can never be reached and would leave the device
    /// sampling forever; [`crate::Tuning::validate`] rejects it.
    pub fn new(sample_target: u32) -> Self {
        Self::Sampling(SampleAccumulator::new(sample_target))
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self, Self::Calibrated(_))
    }

    pub fn is_sampling(&self) -> bool {
        matches!(self, Self::Sampling(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns the centers once calibrated.
    pub fn centers(&self) -> Option<&StickCenters> {
        match self {
            Self::Calibrated(centers) => Some(centers),
            _ => None,
        }
    }

    /// Feeds one raw report into the accumulator.
    ///
    /// Reports whose length is not [`REPORT_LEN`] are skipped without being
    /// counted.  Bytes 1/2 feed the left stick, 3/4 the right stick.
    pub fn record_sample(&mut self, report: &[u8]) -> SampleOutcome {
        let Self::Sampling(acc) = self else {
            return SampleOutcome::Ignored;
        };

        if report.len() != REPORT_LEN {
            debug!(len = report.len(), "calibration sample skipped: wrong length");
            return SampleOutcome::Skipped { len: report.len() };
        }

        acc.left_x.add(report[LEFT_STICK_X]);
        acc.left_y.add(report[LEFT_STICK_Y]);
        acc.right_x.add(report[RIGHT_STICK_X]);
        acc.right_y.add(report[RIGHT_STICK_Y]);

        match acc.centers() {
            Some(centers) => {
                *self = Self::Calibrated(centers);
                SampleOutcome::Completed(centers)
            }
            None => SampleOutcome::Accumulated {
                count: acc.sample_count(),
                target: acc.target(),
            },
        }
    }

    /// Moves a sampling device to [`CalibrationState::Failed`].
    ///
    /// Returns `true` if the state changed.  Terminal states are left alone.
    pub fn abort(&mut self) -> bool {
        if self.is_sampling() {
            *self = Self::Failed;
            true
        } else {
            false
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
