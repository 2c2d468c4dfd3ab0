//! Contactless card protocol engine.
//!
//! [`CardEngine`] drives an MFRC522 reader through the ISO 14443A wake
//! (REQA) and cascade level 1 anticollision handshake without ever blocking
//! on the card. Each [`CardEngine::tick`] performs at most one protocol
//! step, so the main loop can call it every iteration alongside everything
//! else.
//!
//! ```text
//!            interval elapsed            IRQ, no errors
//!   Idle ───────────────────▶ RequestSent ─────────────▶ AnticollisionSent
//!    ▲  ▲                         │                           │
//!    │  └─── timeout / error ─────┘                           │ UID read
//!    │                                                        ▼
//!    └──────────────────────────────────────────────────── Halted
//! ```
//!
//! # Example
//!
//! ```
//! use doorward_hardware::mock::{MockClock, MockMfrc522};
//! use doorward_rfid::CardEngine;
//!
//! let clock = MockClock::new(0);
//! let (bus, reader) = MockMfrc522::new();
//! let mut engine = CardEngine::new(bus);
//! engine.init(&clock).unwrap();
//!
//! reader.present_uid(0xDEAD_BEEF);
//! for _ in 0..5 {
//!     engine.tick(&clock);
//!     clock.advance(1);
//! }
//!
//! assert!(engine.consume_scan_result());
//! assert_eq!(engine.last_identifier(), 0xDEAD_BEEF);
//! assert!(!engine.consume_scan_result());
//! ```

pub mod engine;
pub mod error;

pub use engine::{CardEngine, CardEngineConfig, CardEngineState, CardEngineStats};
pub use error::{CardError, Result};
