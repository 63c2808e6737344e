//! Byte transports to the microcontroller.
//!
//! Two interchangeable backends carry the same framed protocol: a buffered
//! serial stream ([`serial::SerialTransport`]) and fixed-size HID reports
//! ([`hid::HidTransport`]). The bridge engine and the sync handshake only
//! ever see the [`Transport`] trait, so neither cares which one is wired up.

pub mod hid;
pub mod serial;
pub mod sync;

use std::time::Duration;

use crate::wire::crc8;

pub use hid::HidTransport;
pub use serial::SerialTransport;

/// Transport errors. Failure to open is fatal for the session; the engine
/// never retries a dead transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to open transport {0}: {1}")]
    Connection(String, String),

    #[error("Transport is closed")]
    Closed,

    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A byte channel to the microcontroller.
pub trait Transport {
    /// Transmit bytes exactly as given, without framing. Only the sync
    /// handshake preamble uses this directly; everything else goes through
    /// [`Transport::write`].
    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Read a single byte, waiting at most `timeout`. Returns `Ok(None)` on
    /// timeout and never blocks past it.
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, TransportError>;

    /// Release the underlying device handle. Idempotent and safe to call
    /// after a prior failure.
    fn close(&mut self);

    /// Transmit `payload || crc8(payload)`. Does not wait for any reply.
    fn write(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.extend_from_slice(payload);
        frame.push(crc8(payload));
        self.write_raw(&frame)
    }
}
