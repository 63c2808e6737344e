//! Stream-oriented serial backend.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use super::{Transport, TransportError};

/// Serial port transport, 8N1 without flow control.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl SerialTransport {
    /// Open `name` at `baud`. Fails with [`TransportError::Connection`] when
    /// the port cannot be opened.
    pub fn open(name: &str, baud: u32) -> Result<Self, TransportError> {
        let port = serialport::new(name, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(50))
            .open()
            .map_err(|e| TransportError::Connection(name.to_string(), e.to_string()))?;

        info!("Opened serial port {} at {} baud", name, baud);
        Ok(Self {
            port: Some(port),
            name: name.to_string(),
        })
    }
}

impl Transport for SerialTransport {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        port.write_all(bytes)?;
        debug!("TX {:02X?}", bytes);
        Ok(())
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        port.set_timeout(timeout)?;
        let mut buf = [0u8; 1];
        match port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => {
                debug!("RX {:02X}", buf[0]);
                Ok(Some(buf[0]))
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Closed serial port {}", self.name);
        }
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}
