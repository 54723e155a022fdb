//! hidapi-backed controller access.
//!
//! Discovery walks the full HID device list once at startup.  Every device is
//! logged at `debug`; those matching the configured vendor/product id are
//! opened in list order.  A USB DualSense sends 64-byte input reports with
//! report id `0x01` in byte 0; reports of any other length (Bluetooth mode,
//! feature reports) pass through and are discarded by the decoder.

use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, info, warn};

use super::{DeviceProvider, ReportSource, SourceError};
use crate::domain::config::DeviceFilter;

/// Larger than any DualSense input report so nothing is truncated.
const READ_BUFFER_LEN: usize = 128;

pub struct HidReportSource {
    device: HidDevice,
    path: String,
    buf: [u8; READ_BUFFER_LEN],
}

impl HidReportSource {
    pub fn new(device: HidDevice, path: String) -> Self {
        Self {
            device,
            path,
            buf: [0; READ_BUFFER_LEN],
        }
    }
}

impl ReportSource for HidReportSource {
    fn read_report(&mut self) -> Result<Vec<u8>, SourceError> {
        let len = self
            .device
            .read(&mut self.buf)
            .map_err(|e| SourceError::Read(format!("{}: {e}", self.path)))?;
        Ok(self.buf[..len].to_vec())
    }

    fn poll_report(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, SourceError> {
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let len = self
            .device
            .read_timeout(&mut self.buf, millis)
            .map_err(|e| SourceError::Read(format!("{}: {e}", self.path)))?;
        if len == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf[..len].to_vec()))
    }

    fn describe(&self) -> String {
        self.path.clone()
    }
}

/// Attaches every HID device matching a [`DeviceFilter`].
#[derive(Debug, Clone, Copy)]
pub struct HidDeviceProvider {
    filter: DeviceFilter,
}

impl HidDeviceProvider {
    pub fn new(filter: DeviceFilter) -> Self {
        Self { filter }
    }
}

impl DeviceProvider for HidDeviceProvider {
    fn attach_all(&self) -> Result<Vec<Result<Box<dyn ReportSource>, SourceError>>, SourceError> {
        let api = HidApi::new().map_err(|e| SourceError::Enumeration(e.to_string()))?;

        let mut attached = Vec::new();
        for info in api.device_list() {
            debug!(
                "HID device {:04x}:{:04x} {:?} at {}",
                info.vendor_id(),
                info.product_id(),
                info.product_string().unwrap_or(""),
                info.path().to_string_lossy()
            );
            if !self.filter.matches(info.vendor_id(), info.product_id()) {
                continue;
            }

            let path = info.path().to_string_lossy().into_owned();
            info!("found controller at {path}");
            match info.open_device(&api) {
                Ok(device) => {
                    info!("opened controller at {path}");
                    attached.push(Ok(
                        Box::new(HidReportSource::new(device, path)) as Box<dyn ReportSource>
                    ));
                }
                Err(e) => {
                    warn!("failed to open controller at {path}: {e}");
                    attached.push(Err(SourceError::Attach(format!("{path}: {e}"))));
                }
            }
        }
        Ok(attached)
    }
}
