//! Security orchestrator.
//!
//! [`SecurityManager::update`] runs once per main-loop iteration. Every
//! window is a timestamp compared against the clock; entering a state
//! overwrites the timestamp, so a window that has not fired is simply
//! superseded.

use std::collections::VecDeque;

use doorward_admin::SystemStatus;
use doorward_core::constants::{
    DENIED_BUZZ_MS, LOCKOUT_TONE_HZ, SIREN_TONE_HIGH_HZ, SIREN_TONE_LOW_HZ, SUCCESS_CHIRP_MS,
    TRIGGERED_TONE_HIGH_HZ, TRIGGERED_TONE_LOW_HZ,
};
use doorward_core::{AlarmVolume, TimingConfig};
use doorward_hardware::{
    AlarmOutput, Clock, LockActuator, MotionSensor, StatusIndicator, elapsed_ms,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{AuthResult, CredentialSource};
use crate::lockout::BruteForceGuard;
use crate::state::{MAX_HISTORY_SIZE, SecurityState, StateTransition};

/// Actuators and sensors owned by the orchestrator.
#[derive(Debug)]
pub struct DoorDevices<L, A, S, M> {
    pub lock: L,
    pub alarm: A,
    pub indicator: S,
    pub motion: M,
}

/// Point-in-time view of the orchestrator for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySnapshot {
    pub state: SecurityState,
    pub failed_attempts: u8,
    pub alarm_volume: AlarmVolume,
    pub time_in_state_ms: u32,
    pub settled: bool,
}

/// The central state machine.
///
/// # Examples
///
/// ```
/// use doorward_core::TimingConfig;
/// use doorward_hardware::mock::{MockAlarm, MockClock, MockIndicator, MockLock, MockMotion};
/// use doorward_hardware::{AlarmOutput, Clock};
/// use doorward_security::{
///     AuthPoll, CredentialSource, DoorDevices, SecurityManager, SecurityState,
/// };
///
/// struct NoCredentials;
///
/// impl CredentialSource for NoCredentials {
///     fn poll<C, A>(&mut self, _: &C, _: &mut A) -> AuthPoll
///     where
///         C: Clock + ?Sized,
///         A: AlarmOutput + ?Sized,
///     {
///         AuthPoll::none()
///     }
///
///     fn drain(&mut self) {}
/// }
///
/// let clock = MockClock::new(0);
/// let (lock, _) = MockLock::new();
/// let (alarm, _) = MockAlarm::new();
/// let (indicator, _) = MockIndicator::new();
/// let (motion, pir) = MockMotion::new();
/// let devices = DoorDevices { lock, alarm, indicator, motion };
///
/// let mut creds = NoCredentials;
/// let mut manager = SecurityManager::new(TimingConfig::default(), devices, &clock, &mut creds);
///
/// clock.advance(2_000);
/// pir.trigger();
/// manager.update(&clock, &mut creds);
/// assert_eq!(manager.state(), SecurityState::EntryDelay);
/// ```
pub struct SecurityManager<L, A, S, M> {
    config: TimingConfig,
    devices: DoorDevices<L, A, S, M>,
    state: SecurityState,
    entered_at: u32,
    booted_at: u32,
    settled: bool,
    volume: AlarmVolume,
    guard: BruteForceGuard,
    /// Last alarm, siren or blink alternation.
    toggled_at: u32,
    toggle_high: bool,
    unlocked: bool,
    auto_locking: bool,
    history: VecDeque<StateTransition>,
}

impl<L, A, S, M> SecurityManager<L, A, S, M>
where
    L: LockActuator,
    A: AlarmOutput,
    S: StatusIndicator,
    M: MotionSensor,
{
    /// Build the orchestrator in [`SecurityState::Armed`].
    ///
    /// Stale motion, key and card events are discarded and the lock is
    /// closed. Input evaluation starts once the startup settle window has
    /// passed.
    pub fn new<C, R>(
        config: TimingConfig,
        devices: DoorDevices<L, A, S, M>,
        clock: &C,
        creds: &mut R,
    ) -> Self
    where
        C: Clock + ?Sized,
        R: CredentialSource,
    {
        let now = clock.now_millis();
        Self::with_boot_time(config, devices, now, clock, creds)
    }

    /// Like [`new`](Self::new), but the settle window runs from `booted_at`
    /// instead of from construction.
    pub fn with_boot_time<C, R>(
        config: TimingConfig,
        mut devices: DoorDevices<L, A, S, M>,
        booted_at: u32,
        clock: &C,
        creds: &mut R,
    ) -> Self
    where
        C: Clock + ?Sized,
        R: CredentialSource,
    {
        devices.motion.consume_trigger_edge();
        creds.drain();
        devices.lock.close();

        let now = clock.now_millis();
        info!(state = %SecurityState::Armed, "Security manager initialized");
        Self {
            guard: BruteForceGuard::new(config.brute_force_limit),
            config,
            devices,
            state: SecurityState::Armed,
            entered_at: now,
            booted_at,
            settled: false,
            volume: AlarmVolume::BASE,
            toggled_at: now,
            toggle_high: false,
            unlocked: false,
            auto_locking: false,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    /// Run one cycle.
    pub fn update<C, R>(&mut self, clock: &C, creds: &mut R)
    where
        C: Clock + ?Sized,
        R: CredentialSource,
    {
        let now = clock.now_millis();
        if !self.settled {
            if elapsed_ms(now, self.booted_at) < self.config.startup_settle_ms {
                return;
            }
            self.settled = true;
            debug!("Startup settle window elapsed");
        }

        match self.state {
            SecurityState::Armed => self.armed(now, clock, creds),
            SecurityState::EntryDelay => self.entry_delay(now, clock, creds),
            SecurityState::Triggered => self.triggered(now, clock, creds),
            SecurityState::Locked => self.locked(now, creds),
            SecurityState::Disarmed => self.disarmed(now),
            SecurityState::ExitDelay => self.exit_delay(now, creds),
        }
    }

    fn armed<C, R>(&mut self, now: u32, clock: &C, creds: &mut R)
    where
        C: Clock + ?Sized,
        R: CredentialSource,
    {
        let poll = creds.poll(clock, &mut self.devices.alarm);
        match poll.result {
            AuthResult::Valid => {
                info!("Access granted, unlocking door");
                self.devices.alarm.chirp(SUCCESS_CHIRP_MS);
                self.enter_disarmed(now);
            }
            AuthResult::Invalid => self.reject(now),
            AuthResult::None => {
                let motion = self.devices.motion.consume_trigger_edge();
                if motion || poll.entry_requested {
                    info!(motion, "Entry delay started");
                    self.devices.lock.close();
                    self.transition(SecurityState::EntryDelay, now);
                }
            }
        }
    }

    fn entry_delay<C, R>(&mut self, now: u32, clock: &C, creds: &mut R)
    where
        C: Clock + ?Sized,
        R: CredentialSource,
    {
        match creds.poll(clock, &mut self.devices.alarm).result {
            AuthResult::Valid => {
                info!("Access granted");
                self.devices.alarm.chirp(SUCCESS_CHIRP_MS);
                self.enter_disarmed(now);
                return;
            }
            AuthResult::Invalid => {
                self.devices.alarm.chirp(DENIED_BUZZ_MS);
                self.reject(now);
            }
            AuthResult::None => {}
        }

        if self.state == SecurityState::EntryDelay
            && elapsed_ms(now, self.entered_at) >= self.config.entry_delay_ms
        {
            warn!("Entry delay expired, alarm triggered");
            self.volume = AlarmVolume::BASE;
            self.enter_triggered(now);
        }
    }

    fn triggered<C, R>(&mut self, now: u32, clock: &C, creds: &mut R)
    where
        C: Clock + ?Sized,
        R: CredentialSource,
    {
        if elapsed_ms(now, self.toggled_at) >= self.config.alarm_toggle_ms {
            self.toggled_at = now;
            self.toggle_high = !self.toggle_high;
            self.sound_alarm();
        }

        match creds.poll(clock, &mut self.devices.alarm).result {
            AuthResult::Valid => {
                info!("Access granted, silencing alarm");
                self.devices.alarm.off();
                self.devices.indicator.off();
                self.devices.alarm.chirp(SUCCESS_CHIRP_MS);
                self.enter_disarmed(now);
            }
            AuthResult::Invalid => {
                self.volume = self.volume.raised();
                warn!(volume = %self.volume, "Credential denied, alarm volume raised");
                self.reject(now);
            }
            AuthResult::None => {}
        }
    }

    fn locked<R: CredentialSource>(&mut self, now: u32, creds: &mut R) {
        if elapsed_ms(now, self.toggled_at) >= self.config.siren_toggle_ms {
            self.toggled_at = now;
            self.toggle_high = !self.toggle_high;
            if self.toggle_high {
                self.devices.indicator.on();
                self.devices.alarm.on(SIREN_TONE_HIGH_HZ, self.volume);
            } else {
                self.devices.indicator.off();
                self.devices.alarm.on(SIREN_TONE_LOW_HZ, self.volume);
            }
        }

        creds.drain();

        if elapsed_ms(now, self.entered_at) >= self.config.lockout_penalty_ms {
            warn!("Lockout expired, authentication required");
            self.guard.reset();
            creds.drain();
            self.enter_triggered(now);
        }
    }

    fn disarmed(&mut self, now: u32) {
        if !self.auto_locking {
            if elapsed_ms(now, self.entered_at) < self.config.unlock_window_ms {
                if !self.unlocked {
                    self.devices.lock.open();
                    self.unlocked = true;
                    info!(window_ms = self.config.unlock_window_ms, "Door unlocked");
                }
                return;
            }

            info!("Auto-locking door");
            self.devices.lock.close();
            self.entered_at = now;
            self.auto_locking = true;
        }

        if elapsed_ms(now, self.entered_at) >= self.config.auto_lock_settle_ms {
            self.auto_locking = false;
            info!(grace_ms = self.config.exit_delay_ms, "Exit delay started");
            self.toggled_at = now;
            self.transition(SecurityState::ExitDelay, now);
        }
    }

    fn exit_delay<R: CredentialSource>(&mut self, now: u32, creds: &mut R) {
        if elapsed_ms(now, self.toggled_at) >= self.config.exit_blink_ms {
            self.toggled_at = now;
            self.devices.indicator.toggle();
        }

        if elapsed_ms(now, self.entered_at) >= self.config.exit_delay_ms {
            self.devices.indicator.off();
            self.devices.motion.consume_trigger_edge();
            creds.drain();
            info!("System armed");
            self.transition(SecurityState::Armed, now);
        }
    }

    fn enter_disarmed(&mut self, now: u32) {
        self.guard.reset();
        self.unlocked = false;
        self.auto_locking = false;
        self.transition(SecurityState::Disarmed, now);
        self.disarmed(now);
    }

    fn enter_triggered(&mut self, now: u32) {
        self.toggled_at = now;
        self.toggle_high = true;
        self.sound_alarm();
        self.transition(SecurityState::Triggered, now);
    }

    fn enter_locked(&mut self, now: u32) {
        warn!(
            attempts = self.guard.failed_attempts(),
            penalty_ms = self.config.lockout_penalty_ms,
            "Brute force detected, system locked"
        );
        self.volume = AlarmVolume::MAX;
        self.devices.alarm.on(LOCKOUT_TONE_HZ, self.volume);
        self.devices.indicator.on();
        self.toggled_at = now;
        self.toggle_high = false;
        self.transition(SecurityState::Locked, now);
    }

    /// Count a rejected credential and lock out at the limit.
    fn reject(&mut self, now: u32) {
        if self.guard.record_failure() {
            self.enter_locked(now);
        }
    }

    fn sound_alarm(&mut self) {
        if self.toggle_high {
            self.devices.alarm.on(TRIGGERED_TONE_HIGH_HZ, self.volume);
            self.devices.indicator.on();
        } else {
            self.devices.alarm.on(TRIGGERED_TONE_LOW_HZ, self.volume);
            self.devices.indicator.off();
        }
    }

    fn transition(&mut self, to: SecurityState, now: u32) {
        let transition = StateTransition::new(self.state, to, now);
        info!(from = %transition.from, to = %transition.to, "State transition");

        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(transition);

        self.state = to;
        self.entered_at = now;
    }

    pub fn state(&self) -> SecurityState {
        self.state
    }

    pub fn failed_attempts(&self) -> u8 {
        self.guard.failed_attempts()
    }

    pub fn alarm_volume(&self) -> AlarmVolume {
        self.volume
    }

    /// Whether the startup settle window has passed.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// The last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).copied().collect()
    }

    pub fn snapshot(&self, now: u32) -> SecuritySnapshot {
        SecuritySnapshot {
            state: self.state,
            failed_attempts: self.guard.failed_attempts(),
            alarm_volume: self.volume,
            time_in_state_ms: elapsed_ms(now, self.entered_at),
            settled: self.settled,
        }
    }

    /// Status line contents for the admin link.
    pub fn system_status(&self) -> SystemStatus {
        SystemStatus {
            state: self.state.to_string(),
            failed_attempts: self.guard.failed_attempts(),
            alarm_volume: self.volume,
        }
    }

    pub fn devices(&self) -> &DoorDevices<L, A, S, M> {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut DoorDevices<L, A, S, M> {
        &mut self.devices
    }
}
