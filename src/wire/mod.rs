//! Wire-level building blocks for the microcontroller protocol.
//!
//! Every frame that leaves the bridge is `payload || crc8(payload)`. The
//! payload for streaming frames is the fixed 8-byte controller report
//! produced by [`report::PadState::encode`].

pub mod crc;
pub mod report;

pub use crc::crc8;
pub use report::{HatDirection, PadState};
