//! Decoded controller state.
//!
//! An [`InputSnapshot`] is what listeners receive: one per device per decoded
//! report.  The serde representation is the listener-facing JSON shape, so
//! field names here are part of the wire contract:
//!
//! ```json
//! {
//!   "buttons": {"square":false,"cross":true,...,"mute":false},
//!   "dpad": {"up":true,"right":true,"down":false,"left":false},
//!   "leftStick": {"x":0.0,"y":-0.25},
//!   "rightStick": {"x":0.0,"y":0.0},
//!   "triggers": {"l2":0.0,"r2":1.0}
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Discrete button states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buttons {
    pub square: bool,
    pub cross: bool,
    pub circle: bool,
    pub triangle: bool,
    pub l1: bool,
    pub r1: bool,
    pub create: bool,
    pub options: bool,
    /// Left stick press.
    pub l3: bool,
    /// Right stick press.
    pub r3: bool,
    pub ps: bool,
    pub mute: bool,
}

/// Directional pad.
///
/// The four directions are independent so diagonals set two flags at once
/// (up-right sets both `up` and `right`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DPad {
    pub up: bool,
    pub right: bool,
    pub down: bool,
    pub left: bool,
}

/// Calibrated, deadzone-corrected stick position.  Both axes are in `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StickVector {
    pub x: f64,
    pub y: f64,
}

/// Analog trigger travel.  Both values are in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Triggers {
    pub l2: f64,
    pub r2: f64,
}

/// A complete decoded view of one report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSnapshot {
    pub buttons: Buttons,
    pub dpad: DPad,
    pub left_stick: StickVector,
    pub right_stick: StickVector,
    pub triggers: Triggers,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
