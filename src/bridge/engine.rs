//! Bridge engine with statum state machine for the report stream.
//!
//! Drives the whole session: handshake once, then sample, encode and
//! transmit at a fixed cadence, gating on window focus and recovering from
//! input loss without touching the transport session.
//!
//! # State Machine
//!
//! ```text
//! Connecting ──► Syncing ──► Streaming ──► (shutdown)
//!                   │            │
//!                (timeout)   ┌───┴────┐
//!                  fatal     ▼        ▼
//!                          Paused  Recovering
//!                          (focus)  (input)
//! ```
//!
//! Paused and Recovering are phases of the Streaming state, not typestates:
//! the engine bounces between them for the lifetime of the session, while
//! Connecting → Syncing → Streaming is walked exactly once per transport.

use statum::{machine, state};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::{BridgeError, EngineSettings, SessionState};
use crate::bridge::focus::FocusProbe;
use crate::input::{build_report, InputSelector, InputSource};
use crate::transport::{sync, Transport};
use crate::wire::PadState;

/// Engine lifecycle states.
#[state]
#[derive(Debug, Clone)]
pub enum BridgeState {
    Connecting, // transport and input source resolved, session not started
    Syncing,    // running the microcontroller handshake
    Streaming,  // report loop active
}

/// Runtime phase within the Streaming state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Streaming,
    Paused,
    Recovering,
}

#[machine]
pub struct BridgeEngine<S: BridgeState> {
    transport: Box<dyn Transport>,
    input: Option<Box<dyn InputSource>>,
    selector: Box<dyn InputSelector>,
    focus: Box<dyn FocusProbe>,
    settings: EngineSettings,
    session: SessionState,
    phase: Phase,
}

impl BridgeEngine<Connecting> {
    /// Both handles are owned exclusively by the engine from here on;
    /// reconnect discards and re-acquires rather than mutating in place.
    pub fn create(
        transport: Box<dyn Transport>,
        input: Box<dyn InputSource>,
        selector: Box<dyn InputSelector>,
        focus: Box<dyn FocusProbe>,
        settings: EngineSettings,
    ) -> Self {
        Self::new(
            transport,
            Some(input),
            selector,
            focus,
            settings,
            SessionState::new(),
            Phase::Streaming,
        )
    }

    pub fn connect(mut self) -> BridgeEngine<Syncing> {
        self.session.transport_connected = true;
        self.session.input_connected = true;
        info!("Transport and input source resolved, starting sync");
        self.transition()
    }
}

impl BridgeEngine<Syncing> {
    /// Run the handshake. A timeout here is fatal for the session; it is
    /// reported and never retried automatically.
    pub fn synchronize(mut self) -> Result<BridgeEngine<Streaming>, BridgeError> {
        let synced = sync::handshake(
            self.transport.as_mut(),
            self.settings.handshake_budget,
            self.settings.read_timeout,
        )?;

        if !synced {
            error!("Handshake failed, check wiring and microcontroller power");
            self.transport.close();
            return Err(BridgeError::HandshakeTimeout);
        }

        self.session.synchronized = true;
        Ok(self.transition())
    }
}

impl BridgeEngine<Streaming> {
    /// One cycle of the current phase. Split out from the loop so the
    /// transition logic is testable without a runtime.
    pub fn tick(&mut self) -> Result<Phase, BridgeError> {
        match self.phase {
            Phase::Streaming => self.tick_streaming()?,
            Phase::Paused => self.tick_paused(),
            Phase::Recovering => self.tick_recovering(),
        }
        Ok(self.phase)
    }

    fn tick_streaming(&mut self) -> Result<(), BridgeError> {
        let pad_alive = match self.input.as_deref_mut() {
            Some(source) => source.is_available(),
            None => false,
        };
        if !pad_alive {
            warn!("Input source lost, sending neutral report");
            self.send_neutral()?;
            // Drop the stale source; recovery acquires a fresh instance.
            self.input = None;
            self.session.input_connected = false;
            self.phase = Phase::Recovering;
            return Ok(());
        }

        if !self.focus.focused() {
            info!("Target window lost focus, pausing stream");
            self.send_neutral()?;
            self.session.window_focused = false;
            self.phase = Phase::Paused;
            return Ok(());
        }

        if let Some(source) = self.input.as_deref() {
            let frame = build_report(source).encode();
            debug!("TX report {:02X?}", frame);
            self.transport.write(&frame)?;
        }
        Ok(())
    }

    fn tick_paused(&mut self) {
        if self.focus.focused() {
            // Nothing extra is transmitted on the rising edge.
            info!("Target window focused again, resuming stream");
            self.session.window_focused = true;
            self.phase = Phase::Streaming;
        }
    }

    fn tick_recovering(&mut self) {
        match self.selector.acquire() {
            Ok(source) => {
                info!("Input source recovered: {}", source.name());
                self.input = Some(source);
                self.session.input_connected = true;
                // The transport session survived; no new handshake.
                self.phase = Phase::Streaming;
            }
            Err(e) => debug!("Input source still unavailable: {e}"),
        }
    }

    fn send_neutral(&mut self) -> Result<(), BridgeError> {
        self.transport.write(&PadState::NEUTRAL.encode())?;
        Ok(())
    }

    /// Stream until `shutdown` fires. The transport is released on every
    /// exit path, error paths included.
    pub async fn run_until_shutdown(
        mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), BridgeError> {
        info!("Streaming reports to the microcontroller");
        let result = self.stream_loop(&mut shutdown).await;
        self.transport.close();
        result
    }

    async fn stream_loop(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), BridgeError> {
        loop {
            let delay = match self.phase {
                Phase::Streaming => self.settings.tick_interval,
                Phase::Paused => self.settings.pause_poll,
                Phase::Recovering => self.settings.recover_poll,
            };

            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Shutdown requested, leaving stream loop");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {
                    self.tick()?;
                }
            }
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EngineSettings;
    use crate::input::InputError;
    use crate::transport::testing::{ScriptedTransport, TransportLog};
    use crate::transport::TransportError;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    const NEUTRAL_FRAME: [u8; 8] = [0x00, 0x00, 0x08, 0x80, 0x80, 0x80, 0x80, 0x00];

    /// Pad whose availability follows a script; the last entry repeats.
    struct ScriptedPad {
        availability: Vec<bool>,
        probes: usize,
        south: bool,
    }

    impl ScriptedPad {
        fn always(south: bool) -> Self {
            Self {
                availability: vec![true],
                probes: 0,
                south,
            }
        }

        fn lost_after(ticks: usize) -> Self {
            let mut availability = vec![true; ticks];
            availability.push(false);
            Self {
                availability,
                probes: 0,
                south: false,
            }
        }
    }

    impl InputSource for ScriptedPad {
        fn name(&self) -> &str {
            "scripted pad"
        }
        fn is_available(&mut self) -> bool {
            let idx = self.probes.min(self.availability.len() - 1);
            self.probes += 1;
            self.availability[idx]
        }
        fn button(&self, index: usize) -> bool {
            index == crate::input::BTN_SOUTH && self.south
        }
        fn axis(&self, _channel: usize) -> f32 {
            0.0
        }
        fn hat(&self) -> (i8, i8) {
            (0, 0)
        }
    }

    /// Selector handing out pre-built sources from the back of the queue;
    /// an empty slot or an empty queue means "still unavailable".
    struct QueueSelector {
        queue: Vec<Option<Box<dyn InputSource>>>,
    }

    impl InputSelector for QueueSelector {
        fn acquire(&mut self) -> Result<Box<dyn InputSource>, InputError> {
            match self.queue.pop() {
                Some(Some(source)) => Ok(source),
                _ => Err(InputError::Unavailable("still gone".into())),
            }
        }
    }

    fn empty_selector() -> Box<dyn InputSelector> {
        Box::new(QueueSelector { queue: Vec::new() })
    }

    struct ScriptedFocus {
        script: Vec<bool>,
        polls: usize,
    }

    impl FocusProbe for ScriptedFocus {
        fn focused(&mut self) -> bool {
            let idx = self.polls.min(self.script.len() - 1);
            self.polls += 1;
            self.script[idx]
        }
    }

    fn focus(script: &[bool]) -> Box<dyn FocusProbe> {
        Box::new(ScriptedFocus {
            script: script.to_vec(),
            polls: 0,
        })
    }

    fn fast_settings() -> EngineSettings {
        EngineSettings {
            handshake_budget: Duration::from_millis(100),
            read_timeout: Duration::from_millis(5),
            ..EngineSettings::default()
        }
    }

    fn handshake_peer() -> ScriptedTransport {
        ScriptedTransport::replying(&[sync::RESP_READY, sync::RESP_ACK, sync::RESP_OK])
    }

    /// Handshake against the scripted peer and hand back the log view.
    fn synced_engine(
        transport: ScriptedTransport,
        input: Box<dyn InputSource>,
        selector: Box<dyn InputSelector>,
        focus: Box<dyn FocusProbe>,
    ) -> (BridgeEngine<Streaming>, Rc<RefCell<TransportLog>>) {
        let log = transport.log();
        let engine =
            BridgeEngine::create(Box::new(transport), input, selector, focus, fast_settings())
                .connect()
                .synchronize()
                .expect("handshake should succeed against scripted peer");
        (engine, log)
    }

    /// Streamed report payloads (8-byte frames, CRC stripped).
    fn streamed(log: &Rc<RefCell<TransportLog>>) -> Vec<Vec<u8>> {
        log.borrow()
            .framed_payloads()
            .into_iter()
            .filter(|payload| payload.len() == 8)
            .collect()
    }

    #[test]
    fn handshake_failure_is_fatal_and_closes_transport() {
        let transport = ScriptedTransport::silent();
        let log = transport.log();
        let engine = BridgeEngine::create(
            Box::new(transport),
            Box::new(ScriptedPad::always(false)),
            empty_selector(),
            focus(&[true]),
            fast_settings(),
        )
        .connect();

        match engine.synchronize() {
            Err(BridgeError::HandshakeTimeout) => {}
            other => panic!("expected HandshakeTimeout, got {:?}", other.err()),
        }
        assert!(log.borrow().closed, "transport released on the error path");
    }

    #[test]
    fn session_flags_track_lifecycle() {
        let (engine, _log) = synced_engine(
            handshake_peer(),
            Box::new(ScriptedPad::always(false)),
            empty_selector(),
            focus(&[true]),
        );
        let session = engine.session();
        assert!(session.transport_connected);
        assert!(session.input_connected);
        assert!(session.window_focused);
        assert!(session.synchronized);
    }

    #[test]
    fn streaming_tick_transmits_sampled_report() {
        let (mut engine, log) = synced_engine(
            handshake_peer(),
            Box::new(ScriptedPad::always(true)),
            empty_selector(),
            focus(&[true]),
        );

        assert_eq!(engine.tick().unwrap(), Phase::Streaming);
        assert_eq!(engine.tick().unwrap(), Phase::Streaming);

        let frames = streamed(&log);
        assert_eq!(frames.len(), 2);
        // South maps to output bit 1.
        assert_eq!(frames[0], [0x00, 0x02, 0x08, 0x80, 0x80, 0x80, 0x80, 0x00]);
    }

    #[test]
    fn focus_loss_sends_one_neutral_then_pauses() {
        // One focused tick, three unfocused polls, then focus returns.
        let (mut engine, log) = synced_engine(
            handshake_peer(),
            Box::new(ScriptedPad::always(true)),
            empty_selector(),
            focus(&[true, false, false, false, true, true]),
        );

        assert_eq!(engine.tick().unwrap(), Phase::Streaming); // sampled frame
        assert_eq!(engine.tick().unwrap(), Phase::Paused); // falling edge
        assert_eq!(engine.tick().unwrap(), Phase::Paused); // silent
        assert_eq!(engine.tick().unwrap(), Phase::Paused); // silent
        assert_eq!(engine.tick().unwrap(), Phase::Streaming); // rising edge, silent
        assert_eq!(engine.tick().unwrap(), Phase::Streaming); // sampled frame

        assert!(engine.session().window_focused);
        let frames = streamed(&log);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1], NEUTRAL_FRAME);
        let neutrals = frames.iter().filter(|f| f[..] == NEUTRAL_FRAME).count();
        assert_eq!(neutrals, 1, "exactly one neutral frame on the edge");
    }

    #[test]
    fn pad_loss_recovers_with_fresh_source_without_resync() {
        let replacement: Box<dyn InputSource> = Box::new(ScriptedPad::always(true));
        let selector = Box::new(QueueSelector {
            // One failed attempt before the replacement shows up.
            queue: vec![Some(replacement), None],
        });
        let (mut engine, log) = synced_engine(
            handshake_peer(),
            Box::new(ScriptedPad::lost_after(1)),
            selector,
            focus(&[true]),
        );

        assert_eq!(engine.tick().unwrap(), Phase::Streaming); // sampled frame
        assert_eq!(engine.tick().unwrap(), Phase::Recovering); // loss edge
        assert!(!engine.session().input_connected);
        assert_eq!(engine.tick().unwrap(), Phase::Recovering); // acquire fails
        assert_eq!(engine.tick().unwrap(), Phase::Streaming); // fresh source
        assert!(engine.session().input_connected);
        assert_eq!(engine.tick().unwrap(), Phase::Streaming); // sampled frame

        let frames = streamed(&log);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1], NEUTRAL_FRAME);
        // The replacement pad holds south, so streaming resumed from it.
        assert_eq!(frames[2][1], 0x02);
        assert_eq!(
            log.borrow().preamble_count(),
            1,
            "transport session persists across input loss"
        );
    }

    #[test]
    fn write_failure_surfaces_as_transport_error() {
        // Peer completes the handshake (3 writes), then the line dies.
        let mut transport = handshake_peer();
        transport.fail_writes_after = Some(3);
        let log = transport.log();
        let mut engine = BridgeEngine::create(
            Box::new(transport),
            Box::new(ScriptedPad::always(false)),
            empty_selector(),
            focus(&[true]),
            fast_settings(),
        )
        .connect()
        .synchronize()
        .expect("handshake succeeds before the failure point");

        assert!(matches!(
            engine.tick(),
            Err(BridgeError::Transport(TransportError::Closed))
        ));
        assert_eq!(log.borrow().writes.len(), 3, "only the handshake went out");
    }
}
