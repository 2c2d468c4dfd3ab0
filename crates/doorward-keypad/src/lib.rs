//! Keypad input engine.
//!
//! Two halves, one per execution context:
//!
//! - [`KeypadScanner`] runs in the 1 ms interrupt. It scans one matrix row
//!   per tick, debounces across full sweeps and latches one key event per
//!   physical press. All of its state is atomic so the main loop can consume
//!   events through a shared reference without locking.
//! - [`PinEntry`] runs in the main loop. It consumes key events, buffers a
//!   PIN and compares it against the configured one.

pub mod pin_entry;
pub mod scanner;

pub use pin_entry::{PinEntry, PinOutcome};
pub use scanner::KeypadScanner;
