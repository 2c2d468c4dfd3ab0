//! Security orchestration for the door controller.
//!
//! - [`Arbiter`] combines the keypad and card engines into one
//!   [`AuthResult`] per cycle.
//! - [`BruteForceGuard`] counts consecutive rejections.
//! - [`SecurityManager`] is the central state machine. It owns the lock,
//!   alarm, indicator and motion sensor.
//! - [`Appliance`] and [`InterruptContext`] wire everything into the two
//!   execution contexts: the cooperative main loop and the 1 ms interrupt.
//!
//! # States
//!
//! ```text
//!            motion / abort key          5 s, no credential
//!   Armed ──────────────────▶ EntryDelay ─────────────────▶ Triggered
//!     │  ▲                        │                            │
//!     │  │ 10 s                   │ valid                      │ valid
//!     │  └──── ExitDelay ◀─ 1 s ─ Disarmed ◀───────────────────┘
//!     │ valid                    ▲
//!     └──────────────────────────┘
//!
//!   3rd rejection from any evaluating state ──▶ Locked ── 10 s ──▶ Triggered
//! ```

pub mod appliance;
pub mod auth;
pub mod lockout;
pub mod manager;
pub mod state;

pub use appliance::{Appliance, Board, InterruptContext, Peripherals};
pub use auth::{Arbiter, AuthPoll, AuthResult, CredentialSource};
pub use lockout::BruteForceGuard;
pub use manager::{DoorDevices, SecurityManager, SecuritySnapshot};
pub use state::{SecurityState, StateTransition};
