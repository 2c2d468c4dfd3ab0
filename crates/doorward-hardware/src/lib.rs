//! Hardware abstraction layer for the doorward access controller.
//!
//! The controller core never touches pins or registers directly. Every
//! external collaborator is reached through a capability trait defined in
//! [`traits`], so the engines and the orchestrator can run against real
//! drivers on the target and against the fakes in [`mock`] on a host.
//!
//! # Execution contexts
//!
//! Two contexts exist on the target:
//!
//! - a 1 ms periodic interrupt, which scans the keypad matrix and counts
//!   down the buzzer chirp, and
//! - a cooperative main loop, which advances the card reader protocol,
//!   runs the security state machine and services the watchdog.
//!
//! Traits used from the interrupt context take `&self` and require
//! `Send + Sync` ([`ToneGenerator`]). Everything else takes `&mut self`
//! and is owned by the main loop.
//!
//! # Collaborators
//!
//! | Trait | Collaborator |
//! |-------|--------------|
//! | [`Clock`] | wrapping millisecond counter |
//! | [`LockActuator`] | door lock servo |
//! | [`AlarmOutput`] | buzzer (tone, silence, chirp) |
//! | [`StatusIndicator`] | alarm LED |
//! | [`MotionSensor`] | PIR edge latch |
//! | [`RegisterBus`] | MFRC522 card reader over SPI |
//! | [`KeypadMatrix`] | 4x4 key matrix rows and columns |
//! | [`FlashRegion`] | one erase-unit of non-volatile storage |
//! | [`SerialTransport`] | admin link UART |
//! | [`Watchdog`] | independent reset timer |
//!
//! # Example
//!
//! ```
//! use doorward_hardware::mock::MockClock;
//! use doorward_hardware::Clock;
//!
//! let clock = MockClock::new(u32::MAX - 10);
//! let start = clock.now_millis();
//! clock.advance(25);
//! // Elapsed time is computed modulo 2^32.
//! assert!(clock.timed_out(start, 20));
//! ```

pub mod chirp;
pub mod error;
pub mod mfrc522;
pub mod mock;
pub mod traits;

// Re-export commonly used types for convenience
pub use chirp::{BuzzerAlarm, BuzzerMute, ChirpCountdown};
pub use error::{HardwareError, Result};
pub use traits::{
    AlarmOutput, Clock, FlashRegion, KeypadMatrix, LockActuator, MotionSensor, RegisterBus,
    SerialTransport, StatusIndicator, ToneGenerator, Watchdog, elapsed_ms,
};
