//! Report → [`InputSnapshot`] decoding.
//!
//! Decoding is a pure function of the raw bytes and the device's calibration
//! state.  Nothing is decoded until the device is calibrated: an uncalibrated
//! stick would report its resting bias as movement.
//!
//! # Byte handling
//!
//! | Field    | Source                              | Transform                         |
//! |----------|-------------------------------------|-----------------------------------|
//! | buttons  | bits of offsets 8, 9, 10            | `byte & mask != 0`                |
//! | d-pad    | low nibble of offset 8              | hat value → four flags            |
//! | sticks   | offsets 1–4                         | `(b - 128) / 128`, then deadzone  |
//! | triggers | offsets 5, 6                        | `b / 255`                         |

use crate::domain::calibration::CalibrationState;
use crate::domain::deadzone::{apply_deadzone, DEFAULT_DEADZONE};
use crate::domain::snapshot::{Buttons, DPad, InputSnapshot, StickVector, Triggers};
use crate::report::layout::{
    face, misc, system, AXIS_CENTER, BUTTONS_FACE, BUTTONS_MISC, BUTTONS_SYSTEM, DPAD_MASK,
    LEFT_STICK_X, LEFT_STICK_Y, RIGHT_STICK_X, RIGHT_STICK_Y, TRIGGER_L2, TRIGGER_MAX, TRIGGER_R2,
};
use crate::report::RawReport;

/// Decodes with the default deadzone.
///
/// Returns `None` unless `raw` is exactly one report long and `calib` is
/// [`CalibrationState::Calibrated`].
pub fn decode(raw: &[u8], calib: &CalibrationState) -> Option<InputSnapshot> {
    ReportDecoder::default().decode(raw, calib)
}

/// Decoder carrying the configured deadzone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportDecoder {
    deadzone: f64,
}

impl Default for ReportDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_DEADZONE)
    }
}

impl ReportDecoder {
    pub fn new(deadzone: f64) -> Self {
        Self { deadzone }
    }

    pub fn deadzone(&self) -> f64 {
        self.deadzone
    }

    /// See [`decode`].
    pub fn decode(&self, raw: &[u8], calib: &CalibrationState) -> Option<InputSnapshot> {
        let centers = calib.centers()?;
        let report = RawReport::try_from(raw).ok()?;

        let stick = |x_offset: usize, y_offset: usize, cx: f64, cy: f64| StickVector {
            x: apply_deadzone(normalize_axis(report.byte(x_offset)), cx, self.deadzone),
            y: apply_deadzone(normalize_axis(report.byte(y_offset)), cy, self.deadzone),
        };

        Some(InputSnapshot {
            buttons: decode_buttons(&report),
            dpad: decode_dpad(report.byte(BUTTONS_FACE) & DPAD_MASK),
            left_stick: stick(LEFT_STICK_X, LEFT_STICK_Y, centers.left_x, centers.left_y),
            right_stick: stick(RIGHT_STICK_X, RIGHT_STICK_Y, centers.right_x, centers.right_y),
            triggers: Triggers {
                l2: normalize_trigger(report.byte(TRIGGER_L2)),
                r2: normalize_trigger(report.byte(TRIGGER_R2)),
            },
        })
    }
}

/// Maps a raw stick byte onto `[-1, 1)`.  `128` is the nominal center.
pub fn normalize_axis(raw: u8) -> f64 {
    (f64::from(raw) - AXIS_CENTER) / AXIS_CENTER
}

/// Maps a raw trigger byte onto `[0, 1]`.
pub fn normalize_trigger(raw: u8) -> f64 {
    f64::from(raw) / TRIGGER_MAX
}

/// Reads the twelve button bits.
pub fn decode_buttons(report: &RawReport) -> Buttons {
    let face_bits = report.byte(BUTTONS_FACE);
    let misc_bits = report.byte(BUTTONS_MISC);
    let system_bits = report.byte(BUTTONS_SYSTEM);

    Buttons {
        square: face_bits & face::SQUARE != 0,
        cross: face_bits & face::CROSS != 0,
        circle: face_bits & face::CIRCLE != 0,
        triangle: face_bits & face::TRIANGLE != 0,
        l1: misc_bits & misc::L1 != 0,
        r1: misc_bits & misc::R1 != 0,
        create: misc_bits & misc::CREATE != 0,
        options: misc_bits & misc::OPTIONS != 0,
        l3: misc_bits & misc::L3 != 0,
        r3: misc_bits & misc::R3 != 0,
        ps: system_bits & system::PS != 0,
        mute: system_bits & system::MUTE != 0,
    }
}

/// Expands a hat value into four direction flags.
///
/// ```text
///        7  0  1
///         ╲ │ ╱
///      6 ── · ── 2       8..=15: neutral
///         ╱ │ ╲
///        5  4  3
/// ```
///
/// Only the low nibble is meaningful; callers mask with [`DPAD_MASK`].
pub fn decode_dpad(hat: u8) -> DPad {
    DPad {
        up: matches!(hat, 0 | 1 | 7),
        right: matches!(hat, 1..=3),
        down: matches!(hat, 3..=5),
        left: matches!(hat, 5..=7),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
