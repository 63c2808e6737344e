//! HID backend: the framed protocol carried in fixed-size output reports.

use std::collections::VecDeque;
use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, info};

use super::{Transport, TransportError};

/// Size of one outbound HID report payload. A full streaming frame (8 report
/// bytes + CRC) fits exactly; shorter bursts are zero-padded.
pub const OUTPUT_REPORT_LEN: usize = 9;

/// Report id 0 means "no numbered reports" for this device class.
const REPORT_ID: u8 = 0x00;

/// Generic HID device transport.
///
/// Outbound bytes ride one output report per [`Transport::write_raw`] call;
/// inbound reports are drained into a byte queue so [`Transport::read_byte`]
/// keeps the stream semantics the handshake expects.
pub struct HidTransport {
    device: Option<HidDevice>,
    rx: VecDeque<u8>,
    label: String,
}

impl HidTransport {
    /// Open the first device matching `vendor_id:product_id`.
    pub fn open(vendor_id: u16, product_id: u16) -> Result<Self, TransportError> {
        let label = format!("{vendor_id:04x}:{product_id:04x}");
        let api = HidApi::new()?;
        let device = api
            .open(vendor_id, product_id)
            .map_err(|e| TransportError::Connection(label.clone(), e.to_string()))?;

        info!("Opened HID transport {}", label);
        Ok(Self {
            device: Some(device),
            rx: VecDeque::new(),
            label,
        })
    }
}

impl Transport for HidTransport {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let device = self.device.as_ref().ok_or(TransportError::Closed)?;
        // One zero-padded output report per burst, prefixed with the report id.
        let mut report = vec![0u8; 1 + OUTPUT_REPORT_LEN.max(bytes.len())];
        report[0] = REPORT_ID;
        report[1..1 + bytes.len()].copy_from_slice(bytes);
        device.write(&report)?;
        debug!("TX {:02X?}", bytes);
        Ok(())
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, TransportError> {
        if let Some(byte) = self.rx.pop_front() {
            return Ok(Some(byte));
        }
        let device = self.device.as_ref().ok_or(TransportError::Closed)?;
        let mut buf = [0u8; 64];
        let n = device.read_timeout(&mut buf, timeout.as_millis() as i32)?;
        self.rx.extend(&buf[..n]);
        Ok(self.rx.pop_front())
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            info!("Closed HID transport {}", self.label);
        }
    }
}

impl Drop for HidTransport {
    fn drop(&mut self) {
        self.close();
    }
}
