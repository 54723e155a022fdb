//! Drives a device's [`CalibrationState`] from timed reads.
//!
//! One *tick* is one synchronous [`ReportSource::read_report`] fed into the
//! state machine.  Ticks come from a [`Ticker`], which in production is a
//! [`tokio::time::Interval`] and in tests fires immediately.
//!
//! ```text
//! tick ──► read_report ──► record_sample ──► Accumulated / Skipped
//!               │                        └─► Completed ─► Calibrated (stop)
//!               └─ Err ─► abort ─► Failed (stop)
//! ```
//!
//! Calibration starts once per device and is never restarted.

use std::time::Duration;

use async_trait::async_trait;
use padcast_core::{CalibrationState, SampleOutcome};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{error, info, trace};

use crate::infrastructure::report_source::{ReportSource, SourceError};

/// Result of one calibration tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A report was read and handed to the state machine.
    Sampled(SampleOutcome),
    /// The read failed; the state is now `Failed`.
    ReadFailed(SourceError),
    /// The state was already terminal, so nothing was read.
    Finished,
}

/// Source of calibration ticks.
#[async_trait]
pub trait Ticker: Send {
    /// Resolves at the next tick.
    async fn tick(&mut self);
}

/// Fixed-period ticker.  A late tick delays the schedule rather than firing
/// a burst, so two reads for one device never overlap or bunch up.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Ticks as fast as it is polled.
#[derive(Debug, Default)]
pub struct ImmediateTicker {
    ticks: u64,
}

impl ImmediateTicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[async_trait]
impl Ticker for ImmediateTicker {
    async fn tick(&mut self) {
        self.ticks += 1;
        tokio::task::yield_now().await;
    }
}

/// Performs one calibration tick for device `index`.
///
/// Blocks for the duration of the read.
pub fn calibration_tick(
    index: usize,
    source: &mut dyn ReportSource,
    state: &mut CalibrationState,
) -> TickOutcome {
    if !state.is_sampling() {
        return TickOutcome::Finished;
    }

    let report = match source.read_report() {
        Ok(report) => report,
        Err(e) => {
            error!("controller {index}: calibration failed: {e}");
            state.abort();
            return TickOutcome::ReadFailed(e);
        }
    };

    let outcome = state.record_sample(&report);
    match &outcome {
        SampleOutcome::Accumulated { count, target } => {
            trace!("controller {index}: calibration sample {count}/{target}");
        }
        SampleOutcome::Completed(centers) => {
            info!(
                "controller {index}: calibrated (left {:.4}, {:.4} / right {:.4}, {:.4})",
                centers.left_x, centers.left_y, centers.right_x, centers.right_y
            );
        }
        SampleOutcome::Skipped { .. } | SampleOutcome::Ignored => {}
    }
    TickOutcome::Sampled(outcome)
}

/// Runs calibration for one device until it is calibrated or has failed.
///
/// Single-device driver over [`calibration_tick`].  The service interleaves
/// several devices on one ticker and calls [`calibration_tick`] directly; the
/// caller logs the start of calibration.
pub async fn calibrate(
    index: usize,
    source: &mut dyn ReportSource,
    ticker: &mut dyn Ticker,
    state: &mut CalibrationState,
) {
    while state.is_sampling() {
        ticker.tick().await;
        calibration_tick(index, source, state);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::report_source::MockReportSource;
    use padcast_core::REPORT_LEN;

    fn report_with_left_x(x: u8) -> Vec<u8> {
        let mut report = vec![128u8; REPORT_LEN];
        report[1] = x;
        report
    }

    #[test]
    fn test_tick_feeds_one_sample() {
        // Arrange
        let mut source = MockReportSource::new();
        source
            .expect_read_report()
            .times(1)
            .returning(|| Ok(report_with_left_x(128)));
        let mut state = CalibrationState::new(100);

        // Act
        let outcome = calibration_tick(0, &mut source, &mut state);

        // Assert
        assert_eq!(
            outcome,
            TickOutcome::Sampled(SampleOutcome::Accumulated {
                count: 1,
                target: 100
            })
        );
    }

    #[test]
    fn test_read_error_aborts_calibration() {
        // Arrange
        let mut source = MockReportSource::new();
        source
            .expect_read_report()
            .times(1)
            .returning(|| Err(SourceError::Read("unplugged".into())));
        let mut state = CalibrationState::new(100);

        // Act
        let outcome = calibration_tick(2, &mut source, &mut state);

        // Assert
        assert_eq!(
            outcome,
            TickOutcome::ReadFailed(SourceError::Read("unplugged".into()))
        );
        assert!(state.is_failed());
    }

    #[test]
    fn test_tick_on_terminal_state_does_not_read() {
        // Arrange: no read expectation; any call would panic.
        let mut source = MockReportSource::new();
        let mut state = CalibrationState::Failed;

        // Act / Assert
        assert_eq!(
            calibration_tick(0, &mut source, &mut state),
            TickOutcome::Finished
        );
    }

    #[test]
    fn test_short_report_is_skipped_without_failing() {
        let mut source = MockReportSource::new();
        source.expect_read_report().returning(|| Ok(vec![0u8; 10]));
        let mut state = CalibrationState::new(100);

        let outcome = calibration_tick(0, &mut source, &mut state);

        assert_eq!(
            outcome,
            TickOutcome::Sampled(SampleOutcome::Skipped { len: 10 })
        );
        assert!(state.is_sampling());
    }

    #[tokio::test]
    async fn test_calibrate_reads_exactly_target_samples() {
        // Arrange: three samples of left-x = 130.
        let mut source = MockReportSource::new();
        source
            .expect_read_report()
            .times(3)
            .returning(|| Ok(report_with_left_x(130)));
        let mut ticker = ImmediateTicker::new();
        let mut state = CalibrationState::new(3);

        // Act
        calibrate(0, &mut source, &mut ticker, &mut state).await;

        // Assert: (130 - 128) / 128
        let centers = state.centers().expect("calibrated");
        assert!((centers.left_x - 0.015625).abs() < 1e-12);
        assert_eq!(centers.right_x, 0.0);
        assert_eq!(ticker.ticks(), 3);
    }

    #[tokio::test]
    async fn test_calibrate_stops_at_first_read_failure() {
        // Arrange: one good sample, then the device errors.
        let mut source = MockReportSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_read_report()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(report_with_left_x(128)));
        source
            .expect_read_report()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(SourceError::Read("gone".into())));
        let mut ticker = ImmediateTicker::new();
        let mut state = CalibrationState::new(100);

        // Act
        calibrate(1, &mut source, &mut ticker, &mut state).await;

        // Assert
        assert!(state.is_failed());
        assert_eq!(ticker.ticks(), 2);
    }

    #[tokio::test]
    async fn test_calibrate_skips_malformed_reports_and_keeps_going() {
        // Arrange: short, full, short, full.
        let mut source = MockReportSource::new();
        let mut calls = 0u32;
        source.expect_read_report().times(4).returning(move || {
            calls += 1;
            if calls % 2 == 1 {
                Ok(vec![0u8; 32])
            } else {
                Ok(report_with_left_x(128))
            }
        });
        let mut state = CalibrationState::new(2);

        // Act
        calibrate(0, &mut source, &mut ImmediateTicker::new(), &mut state).await;

        // Assert
        assert!(state.is_calibrated());
    }

    #[tokio::test]
    async fn test_calibrate_on_finished_state_does_not_tick() {
        // Arrange: no expectations; any read or describe would panic.
        let mut source = MockReportSource::new();
        let mut ticker = ImmediateTicker::new();
        let mut state = CalibrationState::Failed;

        // Act
        calibrate(0, &mut source, &mut ticker, &mut state).await;

        // Assert
        assert_eq!(ticker.ticks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_keeps_period() {
        let mut ticker = IntervalTicker::new(Duration::from_millis(50));
        assert_eq!(ticker.period(), Duration::from_millis(50));

        let start = tokio::time::Instant::now();
        ticker.tick().await; // first tick is immediate
        ticker.tick().await;
        ticker.tick().await;

        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }
}
