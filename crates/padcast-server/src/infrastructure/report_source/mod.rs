//! Controller report sources.
//!
//! A [`ReportSource`] is one attached device.  It is used in two modes over
//! its lifetime:
//!
//! 1. **Pull** while calibrating: the calibration driver calls
//!    [`ReportSource::read_report`] once per tick on the event loop thread.
//! 2. **Stream** once calibrated: the source is moved onto its own reader
//!    thread by [`spawn_report_stream`], which forwards every report to the
//!    event loop as a [`DeviceEvent`] through a bounded channel.
//!
//! A [`DeviceProvider`] discovers and attaches all matching devices at
//! startup.  Enumeration failure is global; attach failure is per device and
//! still occupies a slot.
//!
//! # Implementations
//!
//! | Type                      | Backing                          |
//! |---------------------------|----------------------------------|
//! | `hid::HidReportSource`    | hidapi (feature `hid`)           |
//! | [`ScriptedReportSource`]  | in-memory replay (tests, demo)   |

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[cfg(feature = "hid")]
pub mod hid;
pub mod scripted;

pub use scripted::{ScriptedDeviceProvider, ScriptedReportSource};

/// How long a streaming reader waits for a report before re-checking the
/// shutdown flag.
pub const STREAM_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Device-level failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// A read from an attached device failed.
    #[error("device read failed: {0}")]
    Read(String),

    /// A matching device was found but could not be opened.
    #[error("failed to open device: {0}")]
    Attach(String),

    /// The device list itself could not be obtained.
    #[error("device enumeration failed: {0}")]
    Enumeration(String),
}

/// One attached controller.
#[cfg_attr(test, mockall::automock)]
pub trait ReportSource: Send {
    /// Blocks until the next raw report arrives.
    fn read_report(&mut self) -> Result<Vec<u8>, SourceError>;

    /// Waits at most `timeout` for the next report; `Ok(None)` on timeout.
    fn poll_report(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, SourceError>;

    /// Human-readable identity for log lines (e.g. the HID path).
    fn describe(&self) -> String;
}

/// Discovers and opens every matching controller.
pub trait DeviceProvider: Send {
    /// Attaches all matching devices, in discovery order.
    ///
    /// The outer error means discovery itself failed.  Each inner entry is one
    /// matched device: the opened source or the reason it could not be
    /// opened.  An empty vector means no device matched.
    fn attach_all(&self) -> Result<Vec<Result<Box<dyn ReportSource>, SourceError>>, SourceError>;
}

/// Provider used when the binary is built without HID support.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableDeviceProvider;

impl DeviceProvider for UnavailableDeviceProvider {
    fn attach_all(&self) -> Result<Vec<Result<Box<dyn ReportSource>, SourceError>>, SourceError> {
        Err(SourceError::Enumeration(
            "built without HID support".to_string(),
        ))
    }
}

// ── Streaming ─────────────────────────────────────────────────────────────────

/// What a reader thread tells the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Report { index: usize, bytes: Vec<u8> },
    /// The reader stopped.  `error` is `None` on shutdown.
    StreamEnded {
        index: usize,
        error: Option<SourceError>,
    },
}

/// Moves `source` onto a dedicated reader thread.
///
/// The thread forwards each report as [`DeviceEvent::Report`] in arrival
/// order and exits when `running` is cleared, the receiver is dropped, or a
/// read fails (after sending [`DeviceEvent::StreamEnded`]).
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned.
pub fn spawn_report_stream(
    index: usize,
    mut source: Box<dyn ReportSource>,
    tx: mpsc::Sender<DeviceEvent>,
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("padcast-reader-{index}"))
        .spawn(move || {
            debug!("controller {index}: streaming from {}", source.describe());
            while running.load(Ordering::Relaxed) {
                match source.poll_report(STREAM_POLL_TIMEOUT) {
                    Ok(Some(bytes)) => {
                        if tx.blocking_send(DeviceEvent::Report { index, bytes }).is_err() {
                            debug!("controller {index}: event loop gone; reader exiting");
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("controller {index}: {e}");
                        let _ = tx.blocking_send(DeviceEvent::StreamEnded {
                            index,
                            error: Some(e),
                        });
                        return;
                    }
                }
            }
            let _ = tx.blocking_send(DeviceEvent::StreamEnded { index, error: None });
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
