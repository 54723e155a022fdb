//! Per-axis stick deadzone with a smooth inner falloff.
//!
//! ```text
//!  output
//!   1 ┤                         ╱
//!     │                       ╱
//!     │                     ╱      outer band: linear rescale of
//!     │                   ╱        [deadzone, 1] onto [0, 1]
//!   0 ┼─────────────····╯
//!     │       inner band: d·|d|/deadzone (quadratic, rises towards
//!     │       `deadzone` just inside the edge)
//!     └─────────┬─────────┬──────── |d|
//!               0      deadzone     1
//! ```
//!
//! Note that the inner band is quadratic, not zero: small offsets from the
//! calibrated center are attenuated rather than discarded.  The two bands do
//! not meet: the inner band tends to `deadzone` at its edge while the outer
//! band restarts from `0.0` exactly at `|d| == deadzone`.

/// Deadzone radius used when none is configured.
pub const DEFAULT_DEADZONE: f64 = 0.1;

/// Applies the calibrated center and deadzone to one normalized axis value.
///
/// `raw_normalized` and `center` are both in `[-1, 1]`.  The result is in
/// `[-1, 1]` and is `0.0` when `raw_normalized == center`.
///
/// `deadzone` must be in `[0, 1)`; [`crate::Tuning::validate`] enforces this
/// for configured values.
pub fn apply_deadzone(raw_normalized: f64, center: f64, deadzone: f64) -> f64 {
    let d = raw_normalized - center;
    let magnitude = d.abs();

    if magnitude < deadzone {
        return d * (magnitude / deadzone);
    }

    // A far-off center can push |d| past 1; clamp so the output stays in range.
    let rescaled = ((magnitude - deadzone) / (1.0 - deadzone)).min(1.0);
    d.signum() * rescaled
}

// ── Tests ─────────────────────────────────────────────────────────────────────
