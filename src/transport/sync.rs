//! Handshake that puts the microcontroller into report-streaming mode.
//!
//! Low-entropy, mutually confirming byte exchange. It lets the firmware tell
//! a genuine bridge peer apart from line noise or a stray process opening
//! the port, and lets the bridge detect a microcontroller that is wired up
//! but not yet booted.
//!
//! ```text
//! Idle ──preamble──► SentPreamble ──0xFF──► GotAck1 ──0xCC──► GotAck2 ──0x33──► success
//!                         │                    │                 │
//!                         └────────────────────┴─────────────────┴── budget elapsed ──► failure
//! ```
//!
//! The 1 s budget spans the whole exchange, not each step, and partial
//! progress earns no credit: a failed attempt restarts from `Idle`.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{Transport, TransportError};

/// Wake-up byte, sent unframed 9 times to flush the firmware's frame buffer.
pub const PREAMBLE_BYTE: u8 = 0xFF;
pub const PREAMBLE_LEN: usize = 9;

/// First framed command, answered by [`RESP_ACK`].
pub const CMD_SYNC_1: u8 = 0x33;
/// Second framed command, answered by [`RESP_OK`].
pub const CMD_SYNC_2: u8 = 0xCC;

/// Firmware is awake and saw the preamble.
pub const RESP_READY: u8 = 0xFF;
/// Firmware acknowledged [`CMD_SYNC_1`].
pub const RESP_ACK: u8 = 0xCC;
/// Firmware acknowledged [`CMD_SYNC_2`]; the report stream may begin.
pub const RESP_OK: u8 = 0x33;

/// Wall-clock budget for the complete exchange.
pub const HANDSHAKE_BUDGET: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncStage {
    SentPreamble,
    GotAck1,
    GotAck2,
}

/// Run the handshake once, from `Idle`. Returns `Ok(false)` when the budget
/// elapses before the full chain completes; transport failures bubble up.
///
/// Must be re-run after every transport re-open.
pub fn handshake(
    transport: &mut dyn Transport,
    budget: Duration,
    read_timeout: Duration,
) -> Result<bool, TransportError> {
    let started = Instant::now();

    transport.write_raw(&[PREAMBLE_BYTE; PREAMBLE_LEN])?;
    let mut stage = SyncStage::SentPreamble;
    debug!("Sync preamble sent, waiting for microcontroller");

    while started.elapsed() < budget {
        let Some(byte) = transport.read_byte(read_timeout)? else {
            continue;
        };

        stage = match (stage, byte) {
            (SyncStage::SentPreamble, RESP_READY) => {
                transport.write(&[CMD_SYNC_1])?;
                SyncStage::GotAck1
            }
            (SyncStage::GotAck1, RESP_ACK) => {
                transport.write(&[CMD_SYNC_2])?;
                SyncStage::GotAck2
            }
            (SyncStage::GotAck2, RESP_OK) => {
                info!("Microcontroller synchronized in {:?}", started.elapsed());
                return Ok(true);
            }
            (stage, other) => {
                // Stray byte, likely line noise. Hold the current stage.
                debug!("Ignoring unexpected byte {:02X} in {:?}", other, stage);
                stage
            }
        };
    }

    warn!("Sync failed at {:?} after {:?}", stage, started.elapsed());
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedTransport;

    const TEST_READ_TIMEOUT: Duration = Duration::from_millis(50);

    #[test]
    fn completes_against_well_behaved_peer() {
        let mut peer = ScriptedTransport::replying(&[RESP_READY, RESP_ACK, RESP_OK]);
        let started = Instant::now();
        let synced = handshake(&mut peer, HANDSHAKE_BUDGET, TEST_READ_TIMEOUT).unwrap();

        assert!(synced);
        assert!(started.elapsed() < HANDSHAKE_BUDGET);
        // Unframed preamble burst, then both commands framed with their CRC.
        assert_eq!(
            peer.log.borrow().writes,
            vec![
                vec![PREAMBLE_BYTE; PREAMBLE_LEN],
                vec![CMD_SYNC_1, 0x99],
                vec![CMD_SYNC_2, 0x6A],
            ]
        );
    }

    #[test]
    fn silent_peer_times_out_at_budget() {
        let mut peer = ScriptedTransport::silent();
        let started = Instant::now();
        let synced = handshake(&mut peer, HANDSHAKE_BUDGET, TEST_READ_TIMEOUT).unwrap();

        assert!(!synced);
        let elapsed = started.elapsed();
        assert!(elapsed >= HANDSHAKE_BUDGET, "gave up early: {elapsed:?}");
        assert!(
            elapsed < HANDSHAKE_BUDGET + Duration::from_millis(200),
            "overran the budget: {elapsed:?}"
        );
    }

    #[test]
    fn partial_progress_still_fails() {
        // Peer wakes up but never acknowledges the first command.
        let mut peer = ScriptedTransport::replying(&[RESP_READY]);
        let synced = handshake(
            &mut peer,
            Duration::from_millis(100),
            Duration::from_millis(10),
        )
        .unwrap();

        assert!(!synced);
        assert_eq!(peer.log.borrow().writes.len(), 2); // preamble + CMD_SYNC_1 only
    }

    #[test]
    fn noise_before_ready_byte_is_ignored() {
        let mut peer = ScriptedTransport::replying(&[0x00, 0x42, RESP_READY, RESP_ACK, RESP_OK]);
        let synced = handshake(&mut peer, HANDSHAKE_BUDGET, TEST_READ_TIMEOUT).unwrap();
        assert!(synced);
    }
}
