//! Input sources and the remap table that turns them into wire reports.
//!
//! Three physically different backends sit behind one capability contract:
//! an event-driven gamepad ([`gamepad::GamepadSource`]), a fixed-layout HID
//! pad ([`hidpad::HidPadSource`]) and a keyboard+mouse virtual pad
//! ([`keymouse::KeyMouseSource`]). [`build_report`] is the single funnel all
//! of them go through; the remap table in there, not the per-variant
//! indices, defines the output bit contract.

pub mod gamepad;
pub mod hidpad;
pub mod keymouse;

use crate::wire::report::buttons;
use crate::wire::{HatDirection, PadState};

/// Input-side errors. `Unavailable` is transient and recovered by the
/// bridge engine; the other variants surface to the operator.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to initialize input backend: {0}")]
    Init(String),

    #[error("No input device found: {0}")]
    NoDevice(String),

    #[error("Input device unavailable: {0}")]
    Unavailable(String),
}

/// Physical/virtual button indices of the capability contract.
pub const BTN_SOUTH: usize = 0;
pub const BTN_EAST: usize = 1;
pub const BTN_WEST: usize = 2;
pub const BTN_NORTH: usize = 3;
pub const BTN_LB: usize = 4;
pub const BTN_RB: usize = 5;
pub const BTN_BACK: usize = 6;
pub const BTN_START: usize = 7;
pub const BTN_GUIDE: usize = 8;
pub const BTN_LSTICK: usize = 9;
pub const BTN_RSTICK: usize = 10;

/// Number of digital buttons every variant exposes.
pub const BUTTON_COUNT: usize = 11;

/// Axis channels of the capability contract.
pub const AXIS_LX: usize = 0;
pub const AXIS_LY: usize = 1;
pub const AXIS_LT: usize = 2;
pub const AXIS_RX: usize = 3;
pub const AXIS_RY: usize = 4;
pub const AXIS_RT: usize = 5;

/// Trigger travel past this point counts as a digital ZL/ZR press. Shared by
/// all variants rather than re-derived per device.
pub const TRIGGER_THRESHOLD: f32 = 0.5;

/// Fixed remap: contract button index to output bit. The A/B and X/Y swaps
/// are deliberate; the console's layout mirrors the physical one.
const OUTPUT_BIT: [u16; BUTTON_COUNT] = [
    buttons::A,      // south
    buttons::B,      // east
    buttons::Y,      // west
    buttons::X,      // north
    buttons::L,      // left bumper
    buttons::R,      // right bumper
    buttons::MINUS,  // back
    buttons::PLUS,   // start
    buttons::HOME,   // guide
    buttons::LCLICK, // left stick click
    buttons::RCLICK, // right stick click
];

/// Anything that can be sampled into a controller state.
pub trait InputSource {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Liveness probe. Polling backends refresh their sampled state here;
    /// the probe and the sample share one underlying read. Never panics on
    /// a disconnected device, it returns `false` instead.
    fn is_available(&mut self) -> bool;

    /// Digital button state for a contract index (`BTN_*`).
    fn button(&self, index: usize) -> bool;

    /// Normalized axis value in [-1, 1] for a contract channel (`AXIS_*`).
    fn axis(&self, channel: usize) -> f32;

    /// Directional hat as a `(-1/0/1, -1/0/1)` vector, y pointing up.
    fn hat(&self) -> (i8, i8);

    /// Override hook for variants with a dedicated HOME input.
    fn home(&self) -> bool {
        false
    }

    /// Override hook for variants with a dedicated CAPTURE input.
    fn capture(&self) -> bool {
        false
    }
}

/// Re-acquires input sources for the bridge engine. Reconnect semantics
/// require a fresh instance each time; stale sources are never resumed.
pub trait InputSelector {
    fn acquire(&mut self) -> Result<Box<dyn InputSource>, InputError>;
}

/// Sample `source` into a [`PadState`] through the fixed remap table.
///
/// On top of the per-index bits: BACK+START together chord into HOME, the
/// trigger axes past [`TRIGGER_THRESHOLD`] become digital ZL/ZR, and the
/// variant override hooks may set HOME/CAPTURE directly.
pub fn build_report(source: &dyn InputSource) -> PadState {
    let mut bits: u16 = 0;
    for (index, &bit) in OUTPUT_BIT.iter().enumerate() {
        if source.button(index) {
            bits |= bit;
        }
    }

    if source.button(BTN_BACK) && source.button(BTN_START) {
        bits |= buttons::HOME;
    }
    if source.axis(AXIS_LT) > TRIGGER_THRESHOLD {
        bits |= buttons::ZL;
    }
    if source.axis(AXIS_RT) > TRIGGER_THRESHOLD {
        bits |= buttons::ZR;
    }
    if source.home() {
        bits |= buttons::HOME;
    }
    if source.capture() {
        bits |= buttons::CAPTURE;
    }

    let (hat_x, hat_y) = source.hat();
    PadState {
        buttons: bits,
        hat: HatDirection::from_vector(hat_x, hat_y),
        left: (source.axis(AXIS_LX), source.axis(AXIS_LY)),
        right: (source.axis(AXIS_RX), source.axis(AXIS_RY)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakePad {
        pressed: Vec<usize>,
        axes: [f32; 6],
        hat: (i8, i8),
        capture: bool,
    }

    impl InputSource for FakePad {
        fn name(&self) -> &str {
            "fake pad"
        }
        fn is_available(&mut self) -> bool {
            true
        }
        fn button(&self, index: usize) -> bool {
            self.pressed.contains(&index)
        }
        fn axis(&self, channel: usize) -> f32 {
            self.axes[channel]
        }
        fn hat(&self) -> (i8, i8) {
            self.hat
        }
        fn capture(&self) -> bool {
            self.capture
        }
    }

    #[test]
    fn south_button_maps_to_bit_one() {
        let pad = FakePad {
            pressed: vec![BTN_SOUTH],
            hat: (0, 1),
            ..Default::default()
        };
        let state = build_report(&pad);
        assert_eq!(
            state.encode(),
            [0x00, 0x02, 0x00, 0x80, 0x80, 0x80, 0x80, 0x00]
        );
    }

    #[test]
    fn back_start_chord_adds_home() {
        let pad = FakePad {
            pressed: vec![BTN_BACK, BTN_START],
            ..Default::default()
        };
        let state = build_report(&pad);
        assert_eq!(
            state.buttons,
            buttons::MINUS | buttons::PLUS | buttons::HOME
        );
    }

    #[test]
    fn triggers_past_threshold_become_digital() {
        let mut pad = FakePad::default();
        pad.axes[AXIS_LT] = 0.6;
        pad.axes[AXIS_RT] = 0.4;
        let state = build_report(&pad);
        assert_eq!(state.buttons, buttons::ZL);

        pad.axes[AXIS_RT] = 0.51;
        let state = build_report(&pad);
        assert_eq!(state.buttons, buttons::ZL | buttons::ZR);
    }

    #[test]
    fn trigger_at_threshold_stays_analog() {
        let mut pad = FakePad::default();
        pad.axes[AXIS_LT] = TRIGGER_THRESHOLD;
        assert_eq!(build_report(&pad).buttons, 0);
    }

    #[test]
    fn capture_hook_sets_bit_thirteen() {
        let pad = FakePad {
            capture: true,
            ..Default::default()
        };
        assert_eq!(build_report(&pad).buttons, buttons::CAPTURE);
    }

    #[test]
    fn remap_covers_every_contract_index() {
        for index in 0..BUTTON_COUNT {
            let pad = FakePad {
                pressed: vec![index],
                ..Default::default()
            };
            assert_ne!(build_report(&pad).buttons, 0, "index {index} lost");
        }
    }

    #[test]
    fn sticks_pass_through_to_axis_bytes() {
        let mut pad = FakePad::default();
        pad.axes[AXIS_LX] = -1.0;
        pad.axes[AXIS_LY] = 1.0;
        pad.axes[AXIS_RX] = 0.0;
        pad.axes[AXIS_RY] = 1.0;
        let frame = build_report(&pad).encode();
        assert_eq!(&frame[3..7], &[0x00, 0xFF, 0x80, 0xFF]);
    }
}
