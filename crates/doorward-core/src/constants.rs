//! Core constants for the door controller.
//!
//! Every timing window, tone, capacity and storage parameter the appliance
//! relies on is defined here so the engines and the orchestrator agree on a
//! single set of values. All durations are in milliseconds and are compared
//! with wraparound-safe arithmetic against a 32-bit millisecond counter.
//!
//! # Usage
//!
//! ```
//! use doorward_core::constants::*;
//!
//! assert_eq!(PIN_LENGTH, 4);
//! assert!(BASE_ALARM_VOLUME < MAX_ALARM_VOLUME);
//! assert_eq!(MAX_STORED_IDS, 50);
//! ```

// ============================================================================
// Security Orchestrator Timing
// ============================================================================

/// Settle window after boot during which the orchestrator ignores all input.
///
/// Lets the motion sensor and card reader stabilise before evaluation begins.
pub const STARTUP_SETTLE_MS: u32 = 2_000;

/// Grace period after motion to present a credential before the alarm fires.
pub const ENTRY_DELAY_MS: u32 = 5_000;

/// How long the lock is held open after a successful authentication.
pub const UNLOCK_WINDOW_MS: u32 = 5_000;

/// Settle delay between closing the lock and starting the exit delay.
pub const AUTO_LOCK_SETTLE_MS: u32 = 1_000;

/// Grace period to leave the premises before the system re-arms.
pub const EXIT_DELAY_MS: u32 = 10_000;

/// Duration of the brute-force lockout penalty.
pub const LOCKOUT_PENALTY_MS: u32 = 10_000;

/// Alarm tone/indicator alternation period while triggered.
pub const ALARM_TOGGLE_MS: u32 = 500;

/// Two-tone siren alternation period while locked out.
pub const SIREN_TOGGLE_MS: u32 = 100;

/// Status indicator blink period during the exit delay.
pub const EXIT_BLINK_MS: u32 = 1_000;

// ============================================================================
// Brute-Force Policy
// ============================================================================

/// Consecutive invalid attempts that force a lockout.
pub const BRUTE_FORCE_LIMIT: u8 = 3;

// ============================================================================
// Alarm Output
// ============================================================================

/// Alarm volume (duty cycle percent) when the alarm first triggers.
pub const BASE_ALARM_VOLUME: u8 = 10;

/// Upper bound for the alarm volume.
pub const MAX_ALARM_VOLUME: u8 = 50;

/// Volume increase applied for every rejected credential while triggered.
pub const ALARM_VOLUME_STEP: u8 = 10;

/// Triggered alarm, high half of the alternation.
pub const TRIGGERED_TONE_HIGH_HZ: u16 = 1_000;

/// Triggered alarm, low half of the alternation.
pub const TRIGGERED_TONE_LOW_HZ: u16 = 500;

/// Lockout siren, high pitch.
pub const SIREN_TONE_HIGH_HZ: u16 = 2_500;

/// Lockout siren, low pitch.
pub const SIREN_TONE_LOW_HZ: u16 = 1_500;

/// Continuous tone started the moment a lockout begins.
pub const LOCKOUT_TONE_HZ: u16 = 2_000;

/// Tone used for chirps (key feedback, success and denial buzzes).
pub const CHIRP_TONE_HZ: u16 = 1_000;

/// Duty cycle used for chirps.
pub const CHIRP_VOLUME: u8 = 50;

/// Success chirp after an accepted credential.
pub const SUCCESS_CHIRP_MS: u32 = 200;

/// Error buzz after a rejected credential during the entry delay.
pub const DENIED_BUZZ_MS: u32 = 800;

/// Tactile feedback for every consumed key press.
pub const KEY_CHIRP_MS: u32 = 30;

// ============================================================================
// Card Protocol Engine
// ============================================================================

/// Minimum spacing between two wake requests.
pub const CARD_SCAN_INTERVAL_MS: u32 = 100;

/// Deadline for each handshake step (request, anticollision).
pub const CARD_STEP_TIMEOUT_MS: u32 = 25;

/// Absence window after which the latched identifier is forgotten.
///
/// Re-presenting the same card after this window raises a new event.
pub const CARD_ABSENCE_RESET_MS: u32 = 500;

/// Length of a single-size ISO 14443A identifier.
pub const CARD_UID_LEN: usize = 4;

// ============================================================================
// Keypad Input Engine
// ============================================================================

/// Number of matrix rows.
pub const KEYPAD_ROWS: usize = 4;

/// Number of matrix columns.
pub const KEYPAD_COLS: usize = 4;

/// Character layout of the 4x4 matrix, indexed `[row][column]`.
pub const KEYPAD_LAYOUT: [[u8; KEYPAD_COLS]; KEYPAD_ROWS] = [
    *b"123A",
    *b"456B",
    *b"789C",
    *b"*0#D",
];

/// Full sweeps a key must read identically before it counts as pressed.
///
/// A press latches once the stability counter exceeds this value.
pub const KEY_STABLE_SWEEPS: u8 = 20;

/// Key that aborts PIN entry and requests the entry delay.
pub const ABORT_KEY: u8 = b'#';

/// Number of characters in a door PIN.
pub const PIN_LENGTH: usize = 4;

/// Inactivity after which a partially entered PIN is discarded.
pub const PIN_ENTRY_TIMEOUT_MS: u32 = 5_000;

// ============================================================================
// Persistent Configuration Store
// ============================================================================

/// Capacity of the authorized-card table.
pub const MAX_STORED_IDS: usize = 50;

/// Integrity marker identifying an initialised record.
pub const STORAGE_MAGIC: u32 = 0xA5A5_A5A7;

/// Size of the erase unit holding the record.
pub const STORAGE_SECTOR_SIZE: usize = 1_024;

/// Maximum admin password length.
pub const ADMIN_PASSWORD_MAX_LEN: usize = 9;

/// PIN installed on first boot and after a factory reset.
pub const DEFAULT_DOOR_PIN: &str = "1234";

/// Admin password installed on first boot and after a factory reset.
pub const DEFAULT_ADMIN_PASSWORD: &str = "123456";

// ============================================================================
// Admin Link
// ============================================================================

/// Maximum buffered characters for one admin command line.
pub const ADMIN_LINE_CAPACITY: usize = 63;

// ============================================================================
// Watchdog
// ============================================================================

/// Window within which the main loop must service the watchdog.
pub const WATCHDOG_TIMEOUT_MS: u32 = 1_024;
