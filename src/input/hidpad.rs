//! Secondary gamepad variant: a fixed-layout HID pad read through hidapi.
//!
//! Discovery is vendor/product filtered; the input report is parsed at
//! fixed offsets instead of going through a report descriptor. The external
//! contract is identical to the primary variant.

use hidapi::{HidApi, HidDevice};
use tracing::{debug, info, warn};

use super::{InputError, InputSource};
use crate::wire::HatDirection;

/// Default device filter: HORIPAD S, a common console-compatible pad.
pub const DEFAULT_VENDOR_ID: u16 = 0x0F0D;
pub const DEFAULT_PRODUCT_ID: u16 = 0x00C1;

/// Fixed input-report layout.
const INPUT_REPORT_LEN: usize = 8;
const OFF_BUTTONS: usize = 0; // u16, little endian
const OFF_HAT: usize = 2; // low nibble, wire hat codes
const OFF_LX: usize = 3;
const OFF_LY: usize = 4;
const OFF_RX: usize = 5;
const OFF_RY: usize = 6;

/// Report button bits for each contract index. This pad family already uses
/// the console's bit order, so the table reads like the output layout; it is
/// still the report layout, not the wire contract.
const REPORT_BIT: [u16; super::BUTTON_COUNT] = [
    1 << 1,  // south
    1 << 2,  // east
    1 << 0,  // west
    1 << 3,  // north
    1 << 4,  // left bumper
    1 << 5,  // right bumper
    1 << 8,  // back (minus)
    1 << 9,  // start (plus)
    1 << 12, // guide (home)
    1 << 10, // left stick click
    1 << 11, // right stick click
];

const REPORT_BIT_ZL: u16 = 1 << 6;
const REPORT_BIT_ZR: u16 = 1 << 7;
const REPORT_BIT_CAPTURE: u16 = 1 << 13;

pub struct HidPadSource {
    device: HidDevice,
    name: String,
    report: [u8; INPUT_REPORT_LEN],
    connected: bool,
}

impl HidPadSource {
    /// Open the `index`-th matching device.
    pub fn open(index: usize, vendor_id: u16, product_id: u16) -> Result<Self, InputError> {
        let api = HidApi::new().map_err(|e| InputError::Init(e.to_string()))?;

        let info = api
            .device_list()
            .filter(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
            .nth(index)
            .ok_or_else(|| {
                InputError::NoDevice(format!(
                    "no HID pad {vendor_id:04x}:{product_id:04x} at index {index}"
                ))
            })?;

        let name = info
            .product_string()
            .unwrap_or("unnamed HID pad")
            .to_string();
        let device = info
            .open_device(&api)
            .map_err(|e| InputError::Init(e.to_string()))?;

        info!("Using HID pad [{index}] {name}");
        Ok(Self {
            device,
            name,
            report: neutral_report(),
            connected: true,
        })
    }

    /// Product strings of all matching devices, in enumeration order.
    pub fn enumerate(vendor_id: u16, product_id: u16) -> Result<Vec<String>, InputError> {
        let api = HidApi::new().map_err(|e| InputError::Init(e.to_string()))?;
        Ok(api
            .device_list()
            .filter(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
            .map(|d| d.product_string().unwrap_or("unnamed HID pad").to_string())
            .collect())
    }

    fn report_bits(&self) -> u16 {
        u16::from_le_bytes([self.report[OFF_BUTTONS], self.report[OFF_BUTTONS + 1]])
    }

    fn axis_from_byte(&self, offset: usize, invert: bool) -> f32 {
        let normalized = self.report[offset] as f32 / 127.5 - 1.0;
        let value = if invert { -normalized } else { normalized };
        value.clamp(-1.0, 1.0)
    }
}

impl InputSource for HidPadSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        // Drain everything buffered so the sample reflects the newest report.
        let mut buf = [0u8; 64];
        loop {
            match self.device.read_timeout(&mut buf, 0) {
                Ok(n) if n >= INPUT_REPORT_LEN => {
                    self.report.copy_from_slice(&buf[..INPUT_REPORT_LEN]);
                    debug!("HID pad report {:02X?}", self.report);
                }
                Ok(_) => return true,
                Err(e) => {
                    warn!("HID pad {} read failed: {e}", self.name);
                    self.connected = false;
                    return false;
                }
            }
        }
    }

    fn button(&self, index: usize) -> bool {
        REPORT_BIT
            .get(index)
            .is_some_and(|bit| self.report_bits() & bit != 0)
    }

    fn axis(&self, channel: usize) -> f32 {
        match channel {
            super::AXIS_LX => self.axis_from_byte(OFF_LX, false),
            // Report Y axes grow downward; the contract wants up-positive.
            super::AXIS_LY => self.axis_from_byte(OFF_LY, true),
            super::AXIS_RX => self.axis_from_byte(OFF_RX, false),
            super::AXIS_RY => self.axis_from_byte(OFF_RY, true),
            // No analog trigger travel in this layout; ZL/ZR are plain bits.
            super::AXIS_LT => {
                if self.report_bits() & REPORT_BIT_ZL != 0 {
                    1.0
                } else {
                    0.0
                }
            }
            super::AXIS_RT => {
                if self.report_bits() & REPORT_BIT_ZR != 0 {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    fn hat(&self) -> (i8, i8) {
        match self.report[OFF_HAT] & 0x0F {
            0x00 => HatDirection::Up,
            0x01 => HatDirection::UpRight,
            0x02 => HatDirection::Right,
            0x03 => HatDirection::DownRight,
            0x04 => HatDirection::Down,
            0x05 => HatDirection::DownLeft,
            0x06 => HatDirection::Left,
            0x07 => HatDirection::UpLeft,
            _ => HatDirection::Neutral,
        }
        .vector()
    }

    fn capture(&self) -> bool {
        self.report_bits() & REPORT_BIT_CAPTURE != 0
    }
}

fn neutral_report() -> [u8; INPUT_REPORT_LEN] {
    let mut report = [0u8; INPUT_REPORT_LEN];
    report[OFF_HAT] = HatDirection::Neutral.code();
    report[OFF_LX] = 0x80;
    report[OFF_LY] = 0x80;
    report[OFF_RX] = 0x80;
    report[OFF_RY] = 0x80;
    report
}
