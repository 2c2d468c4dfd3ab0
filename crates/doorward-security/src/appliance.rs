//! Wiring of the two execution contexts.
//!
//! [`InterruptContext::tick`] belongs in the 1 ms periodic interrupt;
//! [`Appliance::run_once`] is one iteration of the cooperative main loop.
//! They share only the [`KeypadScanner`] and the buzzer chirp countdown,
//! both of which are atomic.

use std::sync::Arc;

use doorward_admin::AdminLink;
use doorward_core::TimingConfig;
use doorward_hardware::{
    AlarmOutput, BuzzerMute, Clock, FlashRegion, KeypadMatrix, LockActuator, MotionSensor,
    RegisterBus, SerialTransport, StatusIndicator, ToneGenerator, Watchdog,
};
use doorward_keypad::{KeypadScanner, PinEntry};
use doorward_rfid::{CardEngine, CardEngineConfig};
use doorward_storage::ConfigStore;
use tracing::{error, info};

use crate::auth::Arbiter;
use crate::manager::{DoorDevices, SecurityManager};

/// Concrete collaborator types for one board.
pub trait Board {
    type Clock: Clock;
    type Lock: LockActuator;
    type Alarm: AlarmOutput;
    type Indicator: StatusIndicator;
    type Motion: MotionSensor;
    type CardBus: RegisterBus;
    type Flash: FlashRegion;
    type AdminPort: SerialTransport;
    type Watchdog: Watchdog;
}

/// Main-context collaborators handed to [`Appliance::start`].
pub struct Peripherals<B: Board> {
    pub clock: B::Clock,
    pub lock: B::Lock,
    pub alarm: B::Alarm,
    pub indicator: B::Indicator,
    pub motion: B::Motion,
    pub card_bus: B::CardBus,
    pub flash: B::Flash,
    pub admin_port: B::AdminPort,
    pub watchdog: B::Watchdog,
    /// Shared with the [`InterruptContext`].
    pub scanner: Arc<KeypadScanner>,
}

/// The main loop's state.
pub struct Appliance<B: Board> {
    clock: B::Clock,
    watchdog: B::Watchdog,
    scanner: Arc<KeypadScanner>,
    pin_entry: PinEntry,
    card: CardEngine<B::CardBus>,
    store: ConfigStore<B::Flash>,
    manager: SecurityManager<B::Lock, B::Alarm, B::Indicator, B::Motion>,
    admin: AdminLink<B::AdminPort>,
}

impl<B: Board> Appliance<B> {
    /// Bring the appliance up with default card engine settings.
    pub fn start(peripherals: Peripherals<B>, timing: TimingConfig) -> Self {
        Self::start_with(peripherals, timing, CardEngineConfig::default())
    }

    /// Load the configuration, initialise the card reader and arm.
    ///
    /// A reader that fails to initialise is logged and left to the card
    /// engine's timeouts; the keypad keeps working.
    pub fn start_with(
        peripherals: Peripherals<B>,
        timing: TimingConfig,
        card_config: CardEngineConfig,
    ) -> Self {
        let Peripherals {
            clock,
            lock,
            alarm,
            indicator,
            motion,
            card_bus,
            flash,
            admin_port,
            watchdog,
            scanner,
        } = peripherals;

        let booted_at = clock.now_millis();
        let store = ConfigStore::open(flash);

        let mut card = CardEngine::with_config(card_bus, card_config);
        if let Err(err) = card.init(&clock) {
            error!(error = %err, "Card reader initialisation failed");
        }

        let mut pin_entry = PinEntry::new();
        let devices = DoorDevices {
            lock,
            alarm,
            indicator,
            motion,
        };
        let manager = {
            let mut creds = Arbiter::new(&scanner, &mut pin_entry, &mut card, &store);
            SecurityManager::with_boot_time(timing, devices, booted_at, &clock, &mut creds)
        };

        info!(
            identifiers = store.identifier_count(),
            storage_synced = store.is_in_sync(),
            "Appliance started"
        );

        Self {
            clock,
            watchdog,
            scanner,
            pin_entry,
            card,
            store,
            manager,
            admin: AdminLink::new(admin_port),
        }
    }

    /// One main-loop iteration.
    pub fn run_once(&mut self) {
        self.watchdog.feed();

        self.card.tick(&self.clock);

        let mut creds = Arbiter::new(
            &self.scanner,
            &mut self.pin_entry,
            &mut self.card,
            &self.store,
        );
        self.manager.update(&self.clock, &mut creds);

        let manager = &self.manager;
        self.admin.service(&mut self.store, || manager.system_status());
    }

    pub fn manager(&self) -> &SecurityManager<B::Lock, B::Alarm, B::Indicator, B::Motion> {
        &self.manager
    }

    pub fn store(&self) -> &ConfigStore<B::Flash> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConfigStore<B::Flash> {
        &mut self.store
    }

    pub fn card(&self) -> &CardEngine<B::CardBus> {
        &self.card
    }

    pub fn admin(&self) -> &AdminLink<B::AdminPort> {
        &self.admin
    }

    pub fn clock(&self) -> &B::Clock {
        &self.clock
    }

    pub fn scanner(&self) -> &Arc<KeypadScanner> {
        &self.scanner
    }
}

/// Work done by the 1 ms periodic interrupt.
///
/// Never blocks: the scanner and the chirp countdown are atomics.
pub struct InterruptContext<K, T: ToneGenerator> {
    scanner: Arc<KeypadScanner>,
    matrix: K,
    mute: BuzzerMute<T>,
}

impl<K: KeypadMatrix, T: ToneGenerator> InterruptContext<K, T> {
    pub fn new(scanner: Arc<KeypadScanner>, matrix: K, mute: BuzzerMute<T>) -> Self {
        Self {
            scanner,
            matrix,
            mute,
        }
    }

    /// Scan one keypad row and count down the buzzer chirp.
    pub fn tick(&mut self) {
        self.scanner.scan_tick(&mut self.matrix);
        self.mute.tick();
    }

    pub fn scanner(&self) -> &Arc<KeypadScanner> {
        &self.scanner
    }
}
