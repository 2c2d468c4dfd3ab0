//! Non-blocking REQA / anticollision state machine.

use std::fmt;

use doorward_core::CardUid;
use doorward_core::constants::{
    CARD_ABSENCE_RESET_MS, CARD_SCAN_INTERVAL_MS, CARD_STEP_TIMEOUT_MS, CARD_UID_LEN,
};
use doorward_hardware::mfrc522::*;
use doorward_hardware::{Clock, HardwareError, RegisterBus, elapsed_ms};
use tracing::{debug, info, trace, warn};

use crate::error::{CardError, Result};

/// Reset line hold time during initialisation.
const RESET_PULSE_MS: u32 = 2;

/// Oscillator start-up time after a hard or soft reset.
const OSCILLATOR_STARTUP_MS: u32 = 50;

/// Protocol step the engine is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardEngineState {
    /// Waiting for the next scan interval.
    Idle,
    /// REQA transmitted, waiting for an ATQA.
    RequestSent,
    /// Anticollision transmitted, waiting for the UID.
    AnticollisionSent,
    /// HLTA transmitted. Returns to `Idle` on the next tick.
    Halted,
}

impl fmt::Display for CardEngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardEngineState::Idle => "Idle",
            CardEngineState::RequestSent => "RequestSent",
            CardEngineState::AnticollisionSent => "AnticollisionSent",
            CardEngineState::Halted => "Halted",
        };
        write!(f, "{}", name)
    }
}

/// Timing parameters of the card engine.
///
/// # Examples
///
/// ```
/// use doorward_rfid::CardEngineConfig;
///
/// let config = CardEngineConfig::default().with_scan_interval(50);
/// assert_eq!(config.scan_interval_ms, 50);
/// assert_eq!(config.step_timeout_ms, 25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardEngineConfig {
    /// Minimum time between two REQA attempts.
    pub scan_interval_ms: u32,
    /// Maximum wait for a handshake step to complete.
    pub step_timeout_ms: u32,
    /// Absence after which the latched UID is forgotten.
    pub absence_reset_ms: u32,
}

impl Default for CardEngineConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: CARD_SCAN_INTERVAL_MS,
            step_timeout_ms: CARD_STEP_TIMEOUT_MS,
            absence_reset_ms: CARD_ABSENCE_RESET_MS,
        }
    }
}

impl CardEngineConfig {
    pub fn with_scan_interval(mut self, ms: u32) -> Self {
        self.scan_interval_ms = ms;
        self
    }

    pub fn with_step_timeout(mut self, ms: u32) -> Self {
        self.step_timeout_ms = ms;
        self
    }

    pub fn with_absence_reset(mut self, ms: u32) -> Self {
        self.absence_reset_ms = ms;
        self
    }
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardEngineStats {
    /// REQA frames issued.
    pub requests: u32,
    /// Steps abandoned for lack of a completion interrupt.
    pub timeouts: u32,
    /// Steps abandoned because the reader flagged an error.
    pub device_errors: u32,
    /// UIDs discarded for a bad check byte or a short frame.
    pub checksum_failures: u32,
    /// Failed register transfers.
    pub bus_errors: u32,
    /// New-card events raised.
    pub cards_detected: u32,
}

/// Card protocol engine over a register bus.
///
/// Single owner, main loop only. [`tick`](Self::tick) must be called at a
/// cadence well below the step timeout for the timeouts to be meaningful.
#[derive(Debug)]
pub struct CardEngine<B: RegisterBus> {
    bus: B,
    config: CardEngineConfig,
    state: CardEngineState,
    /// When the pending step was issued.
    step_started: u32,
    /// When the last REQA went out. `None` until the first attempt.
    last_attempt: Option<u32>,
    latched: Option<[u8; CARD_UID_LEN]>,
    last_seen: u32,
    new_card: bool,
    stats: CardEngineStats,
}

impl<B: RegisterBus> CardEngine<B> {
    /// Create an engine with the default timing.
    pub fn new(bus: B) -> Self {
        Self::with_config(bus, CardEngineConfig::default())
    }

    pub fn with_config(bus: B, config: CardEngineConfig) -> Self {
        Self {
            bus,
            config,
            state: CardEngineState::Idle,
            step_started: 0,
            last_attempt: None,
            latched: None,
            last_seen: 0,
            new_card: false,
            stats: CardEngineStats::default(),
        }
    }

    /// Reset and configure the reader.
    ///
    /// Pulses the reset line, issues a soft reset, programs the timer,
    /// modulation, CRC preset and receiver gain, and switches the antenna
    /// drivers on if they are off. The waits go through `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::Bus`] if any register transfer fails. The engine
    /// stays usable; ticks simply keep failing until the reader answers.
    pub fn init<C: Clock + ?Sized>(&mut self, clock: &C) -> Result<()> {
        self.bus.set_reset(true)?;
        clock.delay_ms(RESET_PULSE_MS);
        self.bus.set_reset(false)?;
        clock.delay_ms(OSCILLATOR_STARTUP_MS);

        self.bus.write_register(COMMAND_REG, PCD_RESET_PHASE)?;
        clock.delay_ms(OSCILLATOR_STARTUP_MS);

        let [reload_high, reload_low] = T_RELOAD_INIT.to_be_bytes();
        self.bus.write_register(T_MODE_REG, T_MODE_INIT)?;
        self.bus.write_register(T_PRESCALER_REG, T_PRESCALER_INIT)?;
        self.bus.write_register(T_RELOAD_REG_H, reload_high)?;
        self.bus.write_register(T_RELOAD_REG_L, reload_low)?;
        self.bus.write_register(TX_ASK_REG, TX_ASK_INIT)?;
        self.bus.write_register(MODE_REG, MODE_INIT)?;
        self.bus.write_register(RF_CFG_REG, RF_CFG_INIT)?;

        let tx_control = self.bus.read_register(TX_CONTROL_REG)?;
        if tx_control & ANTENNA_ON != ANTENNA_ON {
            self.bus
                .write_register(TX_CONTROL_REG, tx_control | ANTENNA_ON)?;
        }

        self.state = CardEngineState::Idle;
        self.last_attempt = None;
        info!("Card reader initialised");
        Ok(())
    }

    /// Advance the handshake by at most one step.
    ///
    /// Never waits on the card. Failures are logged and counted, and the
    /// engine falls back to `Idle`.
    pub fn tick<C: Clock + ?Sized>(&mut self, clock: &C) {
        let now = clock.now_millis();
        self.expire_absent_card(now);

        if let Err(err) = self.step(now) {
            self.record_failure(&err);
            self.state = CardEngineState::Idle;
        }
    }

    /// Return and clear the one-shot new-card flag.
    pub fn consume_scan_result(&mut self) -> bool {
        std::mem::take(&mut self.new_card)
    }

    /// Latched UID packed big-endian, or 0 when no card is latched.
    pub fn last_identifier(&self) -> u32 {
        self.latched.map_or(0, u32::from_be_bytes)
    }

    /// Latched UID, if any.
    pub fn last_uid(&self) -> Option<CardUid> {
        self.latched.and_then(CardUid::from_bytes)
    }

    pub fn state(&self) -> CardEngineState {
        self.state
    }

    pub fn stats(&self) -> CardEngineStats {
        self.stats
    }

    pub fn config(&self) -> &CardEngineConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn step(&mut self, now: u32) -> Result<()> {
        match self.state {
            CardEngineState::Halted => {
                self.enter(CardEngineState::Idle, now);
                self.poll_idle(now)
            }
            CardEngineState::Idle => self.poll_idle(now),
            CardEngineState::RequestSent => self.poll_request(now),
            CardEngineState::AnticollisionSent => self.poll_anticollision(now),
        }
    }

    fn poll_idle(&mut self, now: u32) -> Result<()> {
        if let Some(last) = self.last_attempt
            && elapsed_ms(now, last) < self.config.scan_interval_ms
        {
            return Ok(());
        }

        self.last_attempt = Some(now);
        self.stats.requests += 1;
        self.start_transceive(&[PICC_REQ_IDLE], SHORT_FRAME_BITS)?;
        self.enter(CardEngineState::RequestSent, now);
        Ok(())
    }

    fn poll_request(&mut self, now: u32) -> Result<()> {
        if !self.step_completed(now)? {
            return Ok(());
        }

        self.start_transceive(&[PICC_ANTICOLL, PICC_ANTICOLL_NVB], 0)?;
        self.enter(CardEngineState::AnticollisionSent, now);
        Ok(())
    }

    fn poll_anticollision(&mut self, now: u32) -> Result<()> {
        if !self.step_completed(now)? {
            return Ok(());
        }

        let level = self.bus.read_register(FIFO_LEVEL_REG)?;
        if usize::from(level) < ANTICOLL_RESPONSE_LEN {
            return Err(CardError::IncompleteFrame { received: level });
        }

        let mut frame = [0u8; ANTICOLL_RESPONSE_LEN];
        for byte in frame.iter_mut() {
            *byte = self.bus.read_register(FIFO_DATA_REG)?;
        }

        let uid = [frame[0], frame[1], frame[2], frame[3]];
        let expected = uid_check_byte(&uid);
        if expected != frame[4] {
            return Err(CardError::Checksum {
                expected,
                received: frame[4],
            });
        }

        self.latch(uid, now);

        // Fire and forget: the card never answers HLTA.
        if let Err(err) = self.start_transceive(&[PICC_HALT, 0x00], 0) {
            trace!(error = %err, "Halt not sent");
        }
        self.enter(CardEngineState::Halted, now);
        Ok(())
    }

    /// Whether the pending transceive completed cleanly.
    ///
    /// `Ok(false)` while still waiting inside the step timeout. The
    /// deadline is checked first: a completion that arrives late is
    /// discarded with the step.
    fn step_completed(&mut self, now: u32) -> Result<bool> {
        if elapsed_ms(now, self.step_started) >= self.config.step_timeout_ms {
            return Err(CardError::Timeout {
                step: self.state,
                timeout_ms: self.config.step_timeout_ms,
            });
        }

        let irq = self.bus.read_register(COM_IRQ_REG)?;
        if irq & IRQ_DONE_MASK == 0 {
            return Ok(false);
        }

        let flags = self.bus.read_register(ERROR_REG)? & ERROR_MASK;
        if flags != 0 {
            return Err(CardError::Protocol { flags });
        }
        Ok(true)
    }

    fn start_transceive(
        &mut self,
        frame: &[u8],
        framing: u8,
    ) -> std::result::Result<(), HardwareError> {
        self.bus.write_register(COMMAND_REG, PCD_IDLE)?;
        self.bus.write_register(COM_IRQ_REG, IRQ_CLEAR_ALL)?;
        self.bus.write_register(FIFO_LEVEL_REG, FIFO_FLUSH)?;
        for &byte in frame {
            self.bus.write_register(FIFO_DATA_REG, byte)?;
        }
        self.bus.write_register(COMMAND_REG, PCD_TRANSCEIVE)?;
        self.bus
            .write_register(BIT_FRAMING_REG, framing | START_SEND)
    }

    fn latch(&mut self, uid: [u8; CARD_UID_LEN], now: u32) {
        self.last_seen = now;
        if self.latched == Some(uid) {
            return;
        }

        self.latched = Some(uid);
        self.new_card = true;
        self.stats.cards_detected += 1;
        info!(uid = %format_uid(uid), "Card presented");
    }

    fn expire_absent_card(&mut self, now: u32) {
        if self.latched.is_some() && elapsed_ms(now, self.last_seen) >= self.config.absence_reset_ms
        {
            debug!("Card absent, clearing latched UID");
            self.latched = None;
            self.new_card = false;
        }
    }

    fn enter(&mut self, next: CardEngineState, now: u32) {
        trace!(from = %self.state, to = %next, "Card engine step");
        self.state = next;
        self.step_started = now;
    }

    fn record_failure(&mut self, err: &CardError) {
        match err {
            CardError::Timeout { .. } => {
                // No card in the field looks exactly like this.
                self.stats.timeouts += 1;
                trace!(error = %err, "Card step timed out");
            }
            CardError::Protocol { .. } => {
                self.stats.device_errors += 1;
                debug!(error = %err, "Card step aborted");
            }
            CardError::IncompleteFrame { .. } | CardError::Checksum { .. } => {
                self.stats.checksum_failures += 1;
                debug!(error = %err, "UID discarded");
            }
            CardError::Bus(_) => {
                self.stats.bus_errors += 1;
                warn!(error = %err, "Card reader bus failure");
            }
        }
    }
}

fn format_uid(uid: [u8; CARD_UID_LEN]) -> String {
    format!("{:08X}", u32::from_be_bytes(uid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorward_hardware::mock::{MockClock, MockMfrc522, MockMfrc522Handle};
    use rstest::rstest;

    fn setup() -> (CardEngine<MockMfrc522>, MockMfrc522Handle, MockClock) {
        let clock = MockClock::new(0);
        let (bus, handle) = MockMfrc522::new();
        let mut engine = CardEngine::new(bus);
        engine.init(&clock).unwrap();
        (engine, handle, clock)
    }

    fn run(engine: &mut CardEngine<MockMfrc522>, clock: &MockClock, ms: u32) {
        for _ in 0..ms {
            engine.tick(clock);
            clock.advance(1);
        }
    }

    #[test]
    fn test_init_programs_reader() {
        let (engine, handle, _clock) = setup();

        assert_eq!(handle.reset_pulses(), 1);
        assert_eq!(handle.soft_resets(), 1);
        assert_eq!(handle.register(T_MODE_REG), T_MODE_INIT);
        assert_eq!(handle.register(T_PRESCALER_REG), T_PRESCALER_INIT);
        assert_eq!(handle.register(T_RELOAD_REG_H), 0);
        assert_eq!(handle.register(T_RELOAD_REG_L), 30);
        assert_eq!(handle.register(TX_ASK_REG), TX_ASK_INIT);
        assert_eq!(handle.register(MODE_REG), MODE_INIT);
        assert_eq!(handle.register(RF_CFG_REG), RF_CFG_INIT);
        assert_eq!(handle.register(TX_CONTROL_REG) & ANTENNA_ON, ANTENNA_ON);
        assert_eq!(engine.state(), CardEngineState::Idle);
    }

    #[test]
    fn test_init_waits_on_clock() {
        let (_engine, _handle, clock) = setup();
        assert_eq!(
            clock.now_millis(),
            RESET_PULSE_MS + 2 * OSCILLATOR_STARTUP_MS
        );
    }

    #[test]
    fn test_init_reports_bus_failure() {
        let clock = MockClock::new(0);
        let (bus, handle) = MockMfrc522::new();
        handle.set_bus_failure(true);
        let mut engine = CardEngine::new(bus);

        assert!(matches!(engine.init(&clock), Err(CardError::Bus(_))));
    }

    #[test]
    fn test_step_times_out_without_card() {
        let (mut engine, _handle, clock) = setup();

        engine.tick(&clock);
        assert_eq!(engine.state(), CardEngineState::RequestSent);

        clock.advance(CARD_STEP_TIMEOUT_MS - 1);
        engine.tick(&clock);
        assert_eq!(engine.state(), CardEngineState::RequestSent);

        clock.advance(1);
        engine.tick(&clock);
        assert_eq!(engine.state(), CardEngineState::Idle);
        assert_eq!(engine.stats().timeouts, 1);
    }

    #[test]
    fn test_late_completion_counts_as_timeout() {
        let (mut engine, handle, clock) = setup();
        handle.present_uid(0x1234_5678);

        engine.tick(&clock);
        assert_eq!(engine.state(), CardEngineState::RequestSent);

        clock.advance(CARD_STEP_TIMEOUT_MS);
        engine.tick(&clock);

        assert_eq!(engine.state(), CardEngineState::Idle);
        assert_eq!(engine.stats().timeouts, 1);
        assert_eq!(handle.anticollision_count(), 0);
        assert!(!engine.consume_scan_result());
    }

    #[test]
    fn test_requests_respect_scan_interval() {
        let (mut engine, handle, clock) = setup();

        run(&mut engine, &clock, 1000);

        assert_eq!(handle.request_count(), 10);
        assert_eq!(engine.stats().requests, 10);
        assert_eq!(engine.stats().timeouts, 10);
    }

    #[test]
    fn test_card_detected_within_three_ticks() {
        let (mut engine, handle, clock) = setup();
        handle.present_card([0x12, 0x34, 0x56, 0x78]);

        run(&mut engine, &clock, 3);

        assert!(engine.consume_scan_result());
        assert_eq!(engine.last_identifier(), 0x1234_5678);
        assert_eq!(engine.last_uid().map(|u| u.value()), Some(0x1234_5678));
        assert_eq!(handle.halt_count(), 1);
        assert_eq!(engine.state(), CardEngineState::Halted);
    }

    #[test]
    fn test_halted_folds_back_to_idle() {
        let (mut engine, handle, clock) = setup();
        handle.present_uid(0x0102_0304);
        run(&mut engine, &clock, 3);

        engine.tick(&clock);
        assert_eq!(engine.state(), CardEngineState::Idle);
    }

    #[test]
    fn test_card_left_in_place_fires_once() {
        let (mut engine, handle, clock) = setup();
        handle.present_uid(0xCAFE_F00D);

        let mut events = 0;
        for _ in 0..3000 {
            engine.tick(&clock);
            if engine.consume_scan_result() {
                events += 1;
            }
            clock.advance(1);
        }

        assert_eq!(events, 1);
        assert_eq!(engine.stats().cards_detected, 1);
        assert!(handle.halt_count() > 1);
    }

    #[test]
    fn test_short_absence_keeps_latch() {
        let (mut engine, handle, clock) = setup();
        handle.present_uid(0xCAFE_F00D);
        run(&mut engine, &clock, 2000);
        assert!(engine.consume_scan_result());

        handle.remove_card();
        run(&mut engine, &clock, 300);
        handle.present_uid(0xCAFE_F00D);
        run(&mut engine, &clock, 300);

        assert!(!engine.consume_scan_result());
        assert_eq!(engine.last_identifier(), 0xCAFE_F00D);
    }

    #[test]
    fn test_represent_after_absence_fires_again() {
        let (mut engine, handle, clock) = setup();
        handle.present_uid(0xCAFE_F00D);
        run(&mut engine, &clock, 2000);
        assert!(engine.consume_scan_result());

        handle.remove_card();
        run(&mut engine, &clock, 700);
        assert_eq!(engine.last_identifier(), 0);
        assert!(engine.last_uid().is_none());

        handle.present_uid(0xCAFE_F00D);
        run(&mut engine, &clock, 200);
        assert!(engine.consume_scan_result());
        assert_eq!(engine.stats().cards_detected, 2);
    }

    #[test]
    fn test_different_card_replaces_latch() {
        let (mut engine, handle, clock) = setup();
        handle.present_uid(0x1111_1111);
        run(&mut engine, &clock, 50);
        assert!(engine.consume_scan_result());

        handle.present_uid(0x2222_2222);
        run(&mut engine, &clock, 150);
        assert!(engine.consume_scan_result());
        assert_eq!(engine.last_identifier(), 0x2222_2222);
    }

    #[test]
    fn test_corrupt_check_byte_discarded() {
        let (mut engine, handle, clock) = setup();
        handle.present_uid(0x1234_5678);
        handle.set_corrupt_checksum(true);

        run(&mut engine, &clock, 500);

        assert!(!engine.consume_scan_result());
        assert_eq!(engine.last_identifier(), 0);
        assert_eq!(engine.stats().checksum_failures, 5);
        assert_eq!(handle.halt_count(), 0);
    }

    #[rstest]
    #[case(0x01, true)]
    #[case(0x02, true)]
    #[case(0x08, true)]
    #[case(0x10, true)]
    #[case(0x04, false)]
    #[case(0x20, false)]
    fn test_error_flags(#[case] flags: u8, #[case] aborts: bool) {
        let (mut engine, handle, clock) = setup();
        handle.present_uid(0x1234_5678);
        handle.set_error_flags(flags);

        run(&mut engine, &clock, 10);

        assert_eq!(engine.consume_scan_result(), !aborts);
        assert_eq!(engine.stats().device_errors > 0, aborts);
    }

    #[test]
    fn test_unresponsive_reader_times_out() {
        let (mut engine, handle, clock) = setup();
        handle.present_uid(0x1234_5678);
        handle.set_unresponsive(true);

        run(&mut engine, &clock, 200);

        assert!(!engine.consume_scan_result());
        assert_eq!(engine.stats().timeouts, 2);
    }

    #[test]
    fn test_bus_failure_returns_to_idle() {
        let (mut engine, handle, clock) = setup();
        handle.set_bus_failure(true);

        run(&mut engine, &clock, 250);

        assert_eq!(engine.state(), CardEngineState::Idle);
        assert_eq!(engine.stats().bus_errors, 3);

        handle.set_bus_failure(false);
        handle.present_uid(0xABCD_0123);
        run(&mut engine, &clock, 100);
        assert!(engine.consume_scan_result());
    }

    #[test]
    fn test_detection_across_clock_wraparound() {
        let clock = MockClock::new(u32::MAX - 150);
        let (bus, handle) = MockMfrc522::new();
        let mut engine = CardEngine::new(bus);
        engine.init(&clock).unwrap();
        handle.present_uid(0x0BAD_CAFE);

        let mut events = 0;
        for _ in 0..1500 {
            engine.tick(&clock);
            if engine.consume_scan_result() {
                events += 1;
            }
            clock.advance(1);
        }
        assert_eq!(events, 1);
    }

    #[test]
    fn test_custom_config() {
        let clock = MockClock::new(0);
        let (bus, handle) = MockMfrc522::new();
        let config = CardEngineConfig::default().with_scan_interval(10);
        let mut engine = CardEngine::with_config(bus, config);

        run(&mut engine, &clock, 100);

        assert_eq!(handle.request_count(), 4);
        assert_eq!(engine.config().scan_interval_ms, 10);
    }
}
