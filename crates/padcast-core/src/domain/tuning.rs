//! Tunable constants of the calibration and decoding pipeline.

use std::time::Duration;

use thiserror::Error;

use crate::domain::deadzone::DEFAULT_DEADZONE;

/// Number of resting samples averaged per device when none is configured.
pub const DEFAULT_SAMPLE_TARGET: u32 = 100;

/// Delay between calibration samples when none is configured.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(50);

/// A [`Tuning`] value that cannot drive the pipeline.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TuningError {
    #[error("deadzone must be in [0, 1), got {0}")]
    DeadzoneOutOfRange(f64),

    #[error("calibration sample target must be at least 1")]
    ZeroSampleTarget,

    #[error("calibration tick period must be non-zero")]
    ZeroTickPeriod,
}

/// Pipeline tuning.
///
/// | Field           | Effect                                           | Default |
/// |-----------------|--------------------------------------------------|---------|
/// | `deadzone`      | stick responsiveness near rest                   | `0.1`   |
/// | `sample_target` | calibration duration and noise averaging         | `100`   |
/// | `tick_period`   | wall-clock spacing of calibration samples        | 50 ms   |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub deadzone: f64,
    pub sample_target: u32,
    pub tick_period: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            deadzone: DEFAULT_DEADZONE,
            sample_target: DEFAULT_SAMPLE_TARGET,
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }
}

impl Tuning {
    /// Checks that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns the first [`TuningError`] found.
    pub fn validate(&self) -> Result<(), TuningError> {
        if !(0.0..1.0).contains(&self.deadzone) {
            return Err(TuningError::DeadzoneOutOfRange(self.deadzone));
        }
        if self.sample_target == 0 {
            return Err(TuningError::ZeroSampleTarget);
        }
        if self.tick_period.is_zero() {
            return Err(TuningError::ZeroTickPeriod);
        }
        Ok(())
    }

    /// Expected wall-clock duration of one device's calibration.
    ///
    /// Saturates at [`Duration::MAX`] for oversized settings.
    pub fn calibration_duration(&self) -> Duration {
        self.tick_period
            .checked_mul(self.sample_target)
            .unwrap_or(Duration::MAX)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
