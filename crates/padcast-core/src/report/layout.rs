//! Byte layout of a DualSense-class USB input report.
//!
//! ```text
//! offset  0     report id (not decoded)
//! offset  1-2   left stick x / y        (0..=255, rest ≈ 128)
//! offset  3-4   right stick x / y       (0..=255, rest ≈ 128)
//! offset  5-6   l2 / r2 trigger travel  (0..=255)
//! offset  7     sequence counter        (not decoded)
//! offset  8     low nibble: d-pad hat, high nibble: face buttons
//! offset  9     shoulders, create/options, stick presses
//! offset 10     ps / mute
//! offset 11-63  motion, touchpad, battery (not decoded)
//! ```
//!
//! All values in this module are fixed by the hardware; nothing here is
//! configurable.

/// Length of every valid report.  Anything else is malformed.
pub const REPORT_LEN: usize = 64;

/// Nominal resting value of a stick axis byte.
pub const AXIS_CENTER: f64 = 128.0;

/// Largest raw trigger value.
pub const TRIGGER_MAX: f64 = 255.0;

// ── Analog offsets ────────────────────────────────────────────────────────────

pub const LEFT_STICK_X: usize = 1;
pub const LEFT_STICK_Y: usize = 2;
pub const RIGHT_STICK_X: usize = 3;
pub const RIGHT_STICK_Y: usize = 4;
pub const TRIGGER_L2: usize = 5;
pub const TRIGGER_R2: usize = 6;

// ── Digital offsets ───────────────────────────────────────────────────────────

/// D-pad hat nibble (low) and face buttons (high).
pub const BUTTONS_FACE: usize = 8;
/// Shoulder buttons, create/options and stick presses.
pub const BUTTONS_MISC: usize = 9;
/// PS and mute buttons.
pub const BUTTONS_SYSTEM: usize = 10;

/// Mask selecting the d-pad hat value from [`BUTTONS_FACE`].
pub const DPAD_MASK: u8 = 0x0F;

/// Bit masks within [`BUTTONS_FACE`].
pub mod face {
    pub const SQUARE: u8 = 0x10;
    pub const CROSS: u8 = 0x20;
    pub const CIRCLE: u8 = 0x40;
    pub const TRIANGLE: u8 = 0x80;
}

/// Bit masks within [`BUTTONS_MISC`].
pub mod misc {
    pub const L1: u8 = 0x01;
    pub const R1: u8 = 0x02;
    pub const CREATE: u8 = 0x10;
    pub const OPTIONS: u8 = 0x20;
    pub const L3: u8 = 0x40;
    pub const R3: u8 = 0x80;
}

/// Bit masks within [`BUTTONS_SYSTEM`].
pub mod system {
    pub const PS: u8 = 0x01;
    pub const MUTE: u8 = 0x04;
}
