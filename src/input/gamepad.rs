//! Primary gamepad variant, backed by gilrs.

use gilrs::{Axis, Button, GamepadId, Gilrs};
use tracing::{debug, info, warn};

use super::{InputError, InputSource};

/// A system gamepad. Owns its `Gilrs` context so no driver state leaks into
/// globals; dropping the source releases the whole backend.
pub struct GamepadSource {
    gilrs: Gilrs,
    id: GamepadId,
    name: String,
}

impl GamepadSource {
    /// Open the gamepad at `index` in enumeration order.
    pub fn open(index: usize) -> Result<Self, InputError> {
        let gilrs = Gilrs::new().map_err(|e| InputError::Init(e.to_string()))?;

        let (id, name) = gilrs
            .gamepads()
            .nth(index)
            .map(|(id, pad)| (id, pad.name().to_string()))
            .ok_or_else(|| InputError::NoDevice(format!("no gamepad at index {index}")))?;

        info!("Using gamepad [{index}] {name}");
        Ok(Self { gilrs, id, name })
    }

    /// Names of all currently connected gamepads, in enumeration order.
    pub fn enumerate() -> Result<Vec<String>, InputError> {
        let gilrs = Gilrs::new().map_err(|e| InputError::Init(e.to_string()))?;
        Ok(gilrs
            .gamepads()
            .map(|(_, pad)| pad.name().to_string())
            .collect())
    }

    fn is_pressed(&self, button: Button) -> bool {
        self.gilrs.gamepad(self.id).is_pressed(button)
    }
}

impl InputSource for GamepadSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&mut self) -> bool {
        // Draining the event queue is what refreshes the cached pad state;
        // the liveness probe and the sample share this one read.
        while let Some(event) = self.gilrs.next_event() {
            debug!("Gamepad event: {:?}", event.event);
        }
        let connected = self.gilrs.connected_gamepad(self.id).is_some();
        if !connected {
            warn!("Gamepad {} disconnected", self.name);
        }
        connected
    }

    fn button(&self, index: usize) -> bool {
        let button = match index {
            super::BTN_SOUTH => Button::South,
            super::BTN_EAST => Button::East,
            super::BTN_WEST => Button::West,
            super::BTN_NORTH => Button::North,
            super::BTN_LB => Button::LeftTrigger,
            super::BTN_RB => Button::RightTrigger,
            super::BTN_BACK => Button::Select,
            super::BTN_START => Button::Start,
            super::BTN_GUIDE => Button::Mode,
            super::BTN_LSTICK => Button::LeftThumb,
            super::BTN_RSTICK => Button::RightThumb,
            _ => return false,
        };
        self.is_pressed(button)
    }

    fn axis(&self, channel: usize) -> f32 {
        let pad = self.gilrs.gamepad(self.id);
        let value = match channel {
            super::AXIS_LX => pad.value(Axis::LeftStickX),
            super::AXIS_LY => pad.value(Axis::LeftStickY),
            super::AXIS_LT => pad.value(Axis::LeftZ),
            super::AXIS_RX => pad.value(Axis::RightStickX),
            super::AXIS_RY => pad.value(Axis::RightStickY),
            super::AXIS_RT => pad.value(Axis::RightZ),
            _ => 0.0,
        };
        value.clamp(-1.0, 1.0)
    }

    fn hat(&self) -> (i8, i8) {
        let x = self.is_pressed(Button::DPadRight) as i8 - self.is_pressed(Button::DPadLeft) as i8;
        let y = self.is_pressed(Button::DPadUp) as i8 - self.is_pressed(Button::DPadDown) as i8;
        (x, y)
    }
}
