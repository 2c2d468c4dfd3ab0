//! Authentication arbiter.

use doorward_hardware::{AlarmOutput, Clock, FlashRegion, RegisterBus};
use doorward_keypad::{KeypadScanner, PinEntry, PinOutcome};
use doorward_rfid::CardEngine;
use doorward_storage::ConfigStore;
use tracing::{info, warn};

/// Verdict for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthResult {
    Valid,
    Invalid,
    #[default]
    None,
}

impl AuthResult {
    /// Merge two sources. `Valid` wins over `Invalid`, which wins over
    /// `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorward_security::AuthResult;
    ///
    /// assert_eq!(AuthResult::Invalid.combine(AuthResult::Valid), AuthResult::Valid);
    /// assert_eq!(AuthResult::None.combine(AuthResult::Invalid), AuthResult::Invalid);
    /// ```
    #[must_use]
    pub fn combine(self, other: AuthResult) -> AuthResult {
        match (self, other) {
            (AuthResult::Valid, _) | (_, AuthResult::Valid) => AuthResult::Valid,
            (AuthResult::Invalid, _) | (_, AuthResult::Invalid) => AuthResult::Invalid,
            _ => AuthResult::None,
        }
    }
}

/// Everything the orchestrator learns from one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthPoll {
    pub result: AuthResult,
    /// The abort key was pressed, which also requests the entry delay.
    pub entry_requested: bool,
}

impl AuthPoll {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_result(result: AuthResult) -> Self {
        Self {
            result,
            entry_requested: false,
        }
    }
}

/// Source of credentials for the orchestrator.
///
/// Implemented by [`Arbiter`] on the appliance and by scripted fakes in
/// tests.
pub trait CredentialSource {
    /// Consume pending input and report a verdict.
    ///
    /// `feedback` receives the per-key chirp.
    fn poll<C, A>(&mut self, clock: &C, feedback: &mut A) -> AuthPoll
    where
        C: Clock + ?Sized,
        A: AlarmOutput + ?Sized;

    /// Throw away pending input without evaluating it.
    fn drain(&mut self);
}

/// Per-cycle view over both input engines and the store.
///
/// Holds no state of its own; build one each cycle from borrowed parts.
pub struct Arbiter<'a, B: RegisterBus, F: FlashRegion> {
    scanner: &'a KeypadScanner,
    pin_entry: &'a mut PinEntry,
    card: &'a mut CardEngine<B>,
    store: &'a ConfigStore<F>,
}

impl<'a, B: RegisterBus, F: FlashRegion> Arbiter<'a, B, F> {
    pub fn new(
        scanner: &'a KeypadScanner,
        pin_entry: &'a mut PinEntry,
        card: &'a mut CardEngine<B>,
        store: &'a ConfigStore<F>,
    ) -> Self {
        Self {
            scanner,
            pin_entry,
            card,
            store,
        }
    }

    fn poll_card(&mut self) -> AuthResult {
        if !self.card.consume_scan_result() {
            return AuthResult::None;
        }

        match self.card.last_uid() {
            Some(uid) if self.store.is_authorized(uid.value()) => {
                info!(uid = %uid, "Card authorized");
                AuthResult::Valid
            }
            Some(uid) => {
                warn!(uid = %uid, "Card denied");
                AuthResult::Invalid
            }
            None => {
                warn!("Card with zero identifier denied");
                AuthResult::Invalid
            }
        }
    }
}

impl<B: RegisterBus, F: FlashRegion> CredentialSource for Arbiter<'_, B, F> {
    fn poll<C, A>(&mut self, clock: &C, feedback: &mut A) -> AuthPoll
    where
        C: Clock + ?Sized,
        A: AlarmOutput + ?Sized,
    {
        let outcome =
            self.pin_entry
                .check_password(self.scanner, self.store.door_pin(), clock, feedback);
        let keypad = match outcome {
            PinOutcome::Match => {
                info!("Keypad PIN accepted");
                AuthResult::Valid
            }
            PinOutcome::Mismatch => {
                warn!("Keypad PIN rejected");
                AuthResult::Invalid
            }
            PinOutcome::Idle | PinOutcome::InProgress | PinOutcome::Abort => AuthResult::None,
        };

        AuthPoll {
            result: keypad.combine(self.poll_card()),
            entry_requested: outcome == PinOutcome::Abort,
        }
    }

    fn drain(&mut self) {
        self.pin_entry.clear();
        self.scanner.take_key();
        self.card.consume_scan_result();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorward_core::CardUid;
    use doorward_hardware::mock::{
        MockAlarm, MockClock, MockFlash, MockKeypadMatrix, MockKeypadMatrixHandle, MockMfrc522,
        MockMfrc522Handle,
    };
    use rstest::rstest;

    struct Rig {
        clock: MockClock,
        scanner: KeypadScanner,
        matrix: MockKeypadMatrix,
        keys: MockKeypadMatrixHandle,
        pin_entry: PinEntry,
        card: CardEngine<MockMfrc522>,
        reader: MockMfrc522Handle,
        store: ConfigStore<MockFlash>,
        alarm: MockAlarm,
    }

    impl Rig {
        fn new() -> Self {
            let clock = MockClock::new(0);
            let (matrix, keys) = MockKeypadMatrix::new();
            let (bus, reader) = MockMfrc522::new();
            let mut card = CardEngine::new(bus);
            card.init(&clock).unwrap();
            let mut store = ConfigStore::open(MockFlash::new());
            store.add_identifier(CardUid::new(0xCAFE_F00D).unwrap()).unwrap();
            let (alarm, _) = MockAlarm::new();
            Self {
                clock,
                scanner: KeypadScanner::new(),
                matrix,
                keys,
                pin_entry: PinEntry::new(),
                card,
                reader,
                store,
                alarm,
            }
        }

        fn type_key(&mut self, key: char) {
            self.keys.press(key);
            for _ in 0..100 {
                self.scanner.scan_tick(&mut self.matrix);
            }
            self.keys.release_all();
            for _ in 0..8 {
                self.scanner.scan_tick(&mut self.matrix);
            }
        }

        fn read_card(&mut self, uid: u32) {
            self.reader.present_uid(uid);
            self.clock.advance(200);
            for _ in 0..4 {
                self.card.tick(&self.clock);
                self.clock.advance(1);
            }
        }

        fn poll(&mut self) -> AuthPoll {
            let mut arbiter =
                Arbiter::new(&self.scanner, &mut self.pin_entry, &mut self.card, &self.store);
            arbiter.poll(&self.clock, &mut self.alarm)
        }

        fn type_pin(&mut self, pin: &str) -> AuthPoll {
            let mut last = AuthPoll::none();
            for key in pin.chars() {
                self.type_key(key);
                last = self.poll();
            }
            last
        }
    }

    #[test]
    fn test_no_input() {
        let mut rig = Rig::new();
        assert_eq!(rig.poll(), AuthPoll::none());
    }

    #[rstest]
    #[case("1234", AuthResult::Valid)]
    #[case("1235", AuthResult::Invalid)]
    #[case("123", AuthResult::None)]
    fn test_keypad(#[case] typed: &str, #[case] expected: AuthResult) {
        let mut rig = Rig::new();
        assert_eq!(rig.type_pin(typed).result, expected);
    }

    #[test]
    fn test_abort_key_requests_entry() {
        let mut rig = Rig::new();
        rig.type_key('#');
        let poll = rig.poll();
        assert!(poll.entry_requested);
        assert_eq!(poll.result, AuthResult::None);
    }

    #[rstest]
    #[case(0xCAFE_F00D, AuthResult::Valid)]
    #[case(0x1234_5678, AuthResult::Invalid)]
    fn test_card(#[case] uid: u32, #[case] expected: AuthResult) {
        let mut rig = Rig::new();
        rig.read_card(uid);
        assert_eq!(rig.poll().result, expected);
        assert_eq!(rig.poll().result, AuthResult::None);
    }

    #[test]
    fn test_valid_card_beats_wrong_pin() {
        let mut rig = Rig::new();
        rig.type_pin("999");
        rig.type_key('9');
        rig.read_card(0xCAFE_F00D);
        assert_eq!(rig.poll().result, AuthResult::Valid);
    }

    #[test]
    fn test_drain_discards_everything() {
        let mut rig = Rig::new();
        rig.type_pin("12");
        rig.type_key('3');
        rig.read_card(0xCAFE_F00D);

        Arbiter::new(&rig.scanner, &mut rig.pin_entry, &mut rig.card, &rig.store).drain();

        assert_eq!(rig.pin_entry.buffered_len(), 0);
        assert!(!rig.scanner.has_pending());
        assert_eq!(rig.poll(), AuthPoll::none());
    }

    #[rstest]
    #[case(AuthResult::None, AuthResult::None, AuthResult::None)]
    #[case(AuthResult::Valid, AuthResult::None, AuthResult::Valid)]
    #[case(AuthResult::None, AuthResult::Invalid, AuthResult::Invalid)]
    #[case(AuthResult::Valid, AuthResult::Invalid, AuthResult::Valid)]
    #[case(AuthResult::Invalid, AuthResult::Invalid, AuthResult::Invalid)]
    fn test_combine(#[case] a: AuthResult, #[case] b: AuthResult, #[case] expected: AuthResult) {
        assert_eq!(a.combine(b), expected);
        assert_eq!(b.combine(a), expected);
    }
}
