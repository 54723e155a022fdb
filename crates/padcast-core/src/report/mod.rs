//! Raw controller reports: validation and decoding.
//!
//! A report is accepted only when it is exactly [`layout::REPORT_LEN`] bytes
//! long.  Shorter or longer buffers are rejected up front with
//! [`ReportError::MalformedReport`] so no decoder ever sees a partial report.

pub mod decoder;
pub mod layout;

pub use decoder::{
    decode, decode_buttons, decode_dpad, normalize_axis, normalize_trigger, ReportDecoder,
};

use thiserror::Error;

use layout::REPORT_LEN;

/// Errors produced while validating a raw report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportError {
    /// The buffer length does not match the fixed report length.
    #[error("malformed report: expected {expected} bytes, got {actual}")]
    MalformedReport { expected: usize, actual: usize },
}

/// One validated, immutable input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReport([u8; REPORT_LEN]);

impl RawReport {
    /// Returns the byte at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset >= REPORT_LEN`.  Offsets come from [`layout`], so
    /// this only fires on a programming error.
    pub fn byte(&self, offset: usize) -> u8 {
        self.0[offset]
    }

    /// Returns the full report.
    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for RawReport {
    type Error = ReportError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let fixed: [u8; REPORT_LEN] =
            bytes.try_into().map_err(|_| ReportError::MalformedReport {
                expected: REPORT_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(fixed))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
