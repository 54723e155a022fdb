//! Deterministic in-memory report sources.
//!
//! [`ScriptedReportSource`] replays a fixed list of reads, then optionally
//! repeats an idle report forever.  It drives the integration tests and the
//! `--demo` mode, where it stands in for a controller resting on a desk.

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use padcast_core::REPORT_LEN;

use super::{DeviceProvider, ReportSource, SourceError};

/// Spacing between idle reports in stream mode.  A USB DualSense reports at
/// roughly 250 Hz; 5 ms keeps the demo close to that.
pub const IDLE_REPORT_INTERVAL: Duration = Duration::from_millis(5);

/// A report with both sticks exactly centred and nothing pressed.
pub fn resting_report() -> Vec<u8> {
    let mut report = vec![0u8; REPORT_LEN];
    report[0] = 0x01;
    report[1..5].copy_from_slice(&[128; 4]);
    // d-pad neutral
    report[8] = 0x08;
    report
}

/// Replays scripted reads in order.
#[derive(Debug, Clone)]
pub struct ScriptedReportSource {
    name: String,
    script: VecDeque<Result<Vec<u8>, SourceError>>,
    idle: Option<Vec<u8>>,
}

impl ScriptedReportSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: VecDeque::new(),
            idle: None,
        }
    }

    /// Appends one successful read.
    pub fn with_report(mut self, report: impl Into<Vec<u8>>) -> Self {
        self.script.push_back(Ok(report.into()));
        self
    }

    /// Appends `count` copies of `report`.
    pub fn with_repeated(mut self, report: &[u8], count: usize) -> Self {
        self.script
            .extend(std::iter::repeat_with(|| Ok(report.to_vec())).take(count));
        self
    }

    /// Appends one failing read.
    pub fn with_error(mut self, error: SourceError) -> Self {
        self.script.push_back(Err(error));
        self
    }

    /// Once the script is exhausted, keep producing `report`.
    pub fn idling_with(mut self, report: impl Into<Vec<u8>>) -> Self {
        self.idle = Some(report.into());
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl ReportSource for ScriptedReportSource {
    /// An exhausted script without an idle report fails the read, the way a
    /// device that stopped answering would.
    fn read_report(&mut self) -> Result<Vec<u8>, SourceError> {
        match self.script.pop_front() {
            Some(step) => step,
            None => self
                .idle
                .clone()
                .ok_or_else(|| SourceError::Read(format!("{}: script exhausted", self.name))),
        }
    }

    fn poll_report(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, SourceError> {
        if let Some(step) = self.script.pop_front() {
            return step.map(Some);
        }
        match &self.idle {
            Some(report) => {
                thread::sleep(IDLE_REPORT_INTERVAL.min(timeout));
                Ok(Some(report.clone()))
            }
            None => {
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn describe(&self) -> String {
        format!("scripted:{}", self.name)
    }
}

/// Hands out clones of pre-built scripted sources.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDeviceProvider {
    devices: Vec<Result<ScriptedReportSource, SourceError>>,
    enumeration_error: Option<SourceError>,
}

impl ScriptedDeviceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// One synthetic controller resting at center.
    pub fn demo() -> Self {
        Self::new().with_device(ScriptedReportSource::new("demo-0").idling_with(resting_report()))
    }

    /// A provider whose discovery step fails.
    pub fn failing(error: SourceError) -> Self {
        Self {
            devices: Vec::new(),
            enumeration_error: Some(error),
        }
    }

    pub fn with_device(mut self, source: ScriptedReportSource) -> Self {
        self.devices.push(Ok(source));
        self
    }

    /// A matched device that cannot be opened.
    pub fn with_unopenable(mut self, error: SourceError) -> Self {
        self.devices.push(Err(error));
        self
    }
}

impl DeviceProvider for ScriptedDeviceProvider {
    fn attach_all(&self) -> Result<Vec<Result<Box<dyn ReportSource>, SourceError>>, SourceError> {
        if let Some(e) = &self.enumeration_error {
            return Err(e.clone());
        }
        Ok(self
            .devices
            .iter()
            .cloned()
            .map(|device| device.map(|source| Box::new(source) as Box<dyn ReportSource>))
            .collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
