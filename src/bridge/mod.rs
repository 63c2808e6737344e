//! Runtime bridge between an input source and the microcontroller.

pub mod engine;
pub mod focus;

use std::time::Duration;

use crate::input::InputError;
use crate::transport::{sync, TransportError};

pub use engine::{BridgeEngine, Phase};
pub use focus::{probe_for, FocusProbe};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// The microcontroller stayed silent through the whole sync budget.
    /// Signals a wiring or power problem upstream of software, so it is
    /// never retried automatically.
    #[error("Microcontroller handshake timed out")]
    HandshakeTimeout,
}

/// Timing knobs for the engine's polling cadences.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Streaming tick, ~100 reports per second.
    pub tick_interval: Duration,
    /// Focus poll while paused.
    pub pause_poll: Duration,
    /// Input-source poll while recovering.
    pub recover_poll: Duration,
    /// Wall-clock budget for the sync handshake.
    pub handshake_budget: Duration,
    /// Per-byte read timeout during the handshake.
    pub read_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(10),
            pause_poll: Duration::from_millis(100),
            recover_poll: Duration::from_millis(500),
            handshake_budget: sync::HANDSHAKE_BUDGET,
            read_timeout: Duration::from_millis(50),
        }
    }
}

/// Connection flags owned and mutated by the engine alone.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub transport_connected: bool,
    pub input_connected: bool,
    pub window_focused: bool,
    pub synchronized: bool,
}

impl SessionState {
    /// Fresh session: nothing connected yet, focus optimistically assumed.
    pub fn new() -> Self {
        Self {
            transport_connected: false,
            input_connected: false,
            window_focused: true,
            synchronized: false,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
