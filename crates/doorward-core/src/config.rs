//! Timing configuration for the security orchestrator.

use crate::constants::{
    ALARM_TOGGLE_MS, AUTO_LOCK_SETTLE_MS, BRUTE_FORCE_LIMIT, ENTRY_DELAY_MS, EXIT_BLINK_MS,
    EXIT_DELAY_MS, LOCKOUT_PENALTY_MS, SIREN_TOGGLE_MS, STARTUP_SETTLE_MS, UNLOCK_WINDOW_MS,
};

/// Delay windows used by the orchestrator.
///
/// Defaults come from [`constants`](crate::constants); the builder methods
/// exist so host simulations and tests can shorten individual windows.
///
/// # Example
///
/// ```
/// use doorward_core::TimingConfig;
///
/// let timing = TimingConfig::default().with_entry_delay(3_000);
/// assert_eq!(timing.entry_delay_ms, 3_000);
/// assert_eq!(timing.exit_delay_ms, 10_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    pub startup_settle_ms: u32,
    pub entry_delay_ms: u32,
    pub unlock_window_ms: u32,
    pub auto_lock_settle_ms: u32,
    pub exit_delay_ms: u32,
    pub lockout_penalty_ms: u32,
    pub alarm_toggle_ms: u32,
    pub siren_toggle_ms: u32,
    pub exit_blink_ms: u32,
    /// Consecutive failures that trigger a lockout.
    pub brute_force_limit: u8,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            startup_settle_ms: STARTUP_SETTLE_MS,
            entry_delay_ms: ENTRY_DELAY_MS,
            unlock_window_ms: UNLOCK_WINDOW_MS,
            auto_lock_settle_ms: AUTO_LOCK_SETTLE_MS,
            exit_delay_ms: EXIT_DELAY_MS,
            lockout_penalty_ms: LOCKOUT_PENALTY_MS,
            alarm_toggle_ms: ALARM_TOGGLE_MS,
            siren_toggle_ms: SIREN_TOGGLE_MS,
            exit_blink_ms: EXIT_BLINK_MS,
            brute_force_limit: BRUTE_FORCE_LIMIT,
        }
    }
}

impl TimingConfig {
    pub fn with_startup_settle(mut self, ms: u32) -> Self {
        self.startup_settle_ms = ms;
        self
    }

    pub fn with_entry_delay(mut self, ms: u32) -> Self {
        self.entry_delay_ms = ms;
        self
    }

    pub fn with_unlock_window(mut self, ms: u32) -> Self {
        self.unlock_window_ms = ms;
        self
    }

    pub fn with_exit_delay(mut self, ms: u32) -> Self {
        self.exit_delay_ms = ms;
        self
    }

    pub fn with_lockout_penalty(mut self, ms: u32) -> Self {
        self.lockout_penalty_ms = ms;
        self
    }

    /// Set the failure limit. Values below one are raised to one.
    pub fn with_brute_force_limit(mut self, limit: u8) -> Self {
        self.brute_force_limit = limit.max(1);
        self
    }
}
