//! Keyboard+mouse virtual pad.
//!
//! Digital keys feed the button table, WASD synthesizes the left stick with
//! -1/0/1 per axis, and relative mouse motion since the last sample drives
//! the right stick. The cursor is recentered after every sample so each
//! reading is a fresh delta. No d-pad emulation in this mode; the hat is
//! always neutral.

use device_query::{DeviceQuery, DeviceState, Keycode};
use enigo::{Coordinate, Enigo, Mouse, Settings};
use tracing::{debug, info};

use super::{InputError, InputSource};

/// Mouse counts per full stick deflection.
pub const MOUSE_DIVISOR: f32 = 300.0;

/// Fixed key table, contract index order: south, east, west, north, LB, RB,
/// back, start, guide, left stick click, right stick click.
const BUTTON_KEYS: [Keycode; super::BUTTON_COUNT] = [
    Keycode::Space,
    Keycode::E,
    Keycode::Q,
    Keycode::R,
    Keycode::LShift,
    Keycode::LControl,
    Keycode::Tab,
    Keycode::Enter,
    Keycode::F1,
    Keycode::F,
    Keycode::G,
];

/// Dedicated CAPTURE key, surfaced through the override hook.
const CAPTURE_KEY: Keycode = Keycode::F2;

/// Owns the ability to warp the pointer back to its anchor. Separate from
/// the source so the stateful side effect inside the sampling contract has
/// an explicit owner, released on teardown.
struct PointerRecenter {
    enigo: Enigo,
    anchor: (i32, i32),
}

impl PointerRecenter {
    fn new(anchor: (i32, i32)) -> Result<Self, InputError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| InputError::Init(format!("pointer control unavailable: {e}")))?;
        Ok(Self { enigo, anchor })
    }

    fn recenter(&mut self) {
        if let Err(e) = self.enigo.move_mouse(self.anchor.0, self.anchor.1, Coordinate::Abs) {
            debug!("Pointer recenter failed: {e}");
        }
    }
}

pub struct KeyMouseSource {
    device: DeviceState,
    recenter: PointerRecenter,
    divisor: f32,
    keys: Vec<Keycode>,
    mouse_buttons: Vec<bool>,
    right_stick: (f32, f32),
}

impl KeyMouseSource {
    /// `divisor` is the mouse travel (in counts) mapped to full deflection.
    pub fn new(divisor: f32) -> Result<Self, InputError> {
        let device = DeviceState::new();
        let anchor = device.get_mouse().coords;
        let recenter = PointerRecenter::new(anchor)?;

        info!("Using keyboard+mouse virtual pad (divisor {divisor})");
        Ok(Self {
            device,
            recenter,
            divisor,
            keys: Vec::new(),
            mouse_buttons: Vec::new(),
            right_stick: (0.0, 0.0),
        })
    }

    fn key_down(&self, key: Keycode) -> bool {
        self.keys.contains(&key)
    }
}

impl InputSource for KeyMouseSource {
    fn name(&self) -> &str {
        "keyboard+mouse"
    }

    fn is_available(&mut self) -> bool {
        // The probe is the sample: read keys and pointer, then recenter so
        // the next reading starts from the anchor again.
        self.keys = self.device.get_keys();
        let mouse = self.device.get_mouse();
        self.mouse_buttons = mouse.button_pressed.clone();

        let dx = (mouse.coords.0 - self.recenter.anchor.0) as f32;
        let dy = (mouse.coords.1 - self.recenter.anchor.1) as f32;
        // Screen y grows downward, stick y grows upward.
        self.right_stick = (
            (dx / self.divisor).clamp(-1.0, 1.0),
            (-dy / self.divisor).clamp(-1.0, 1.0),
        );

        self.recenter.recenter();
        true
    }

    fn button(&self, index: usize) -> bool {
        BUTTON_KEYS.get(index).is_some_and(|&key| self.key_down(key))
    }

    fn axis(&self, channel: usize) -> f32 {
        match channel {
            super::AXIS_LX => {
                (self.key_down(Keycode::D) as i8 - self.key_down(Keycode::A) as i8) as f32
            }
            super::AXIS_LY => {
                (self.key_down(Keycode::W) as i8 - self.key_down(Keycode::S) as i8) as f32
            }
            super::AXIS_RX => self.right_stick.0,
            super::AXIS_RY => self.right_stick.1,
            // Mouse buttons stand in for trigger travel.
            super::AXIS_LT => {
                if self.mouse_buttons.get(1).copied().unwrap_or(false) {
                    1.0
                } else {
                    0.0
                }
            }
            super::AXIS_RT => {
                if self.mouse_buttons.get(2).copied().unwrap_or(false) {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    fn hat(&self) -> (i8, i8) {
        (0, 0)
    }

    fn capture(&self) -> bool {
        self.key_down(CAPTURE_KEY)
    }
}
