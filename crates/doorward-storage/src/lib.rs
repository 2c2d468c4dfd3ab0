//! Persistent configuration store for the doorward controller.
//!
//! The whole configuration (door PIN, admin password and the authorized
//! card table) lives in one fixed-layout record inside a single flash erase
//! unit. The record is never updated in place: every mutation erases the
//! unit and programs the full record again.
//!
//! # Architecture
//!
//! - [`SecurityConfig`] - the record and its byte codec
//! - [`ConfigStore`] - write-through cache over a [`FlashRegion`]
//!
//! # Write atomicity
//!
//! Erase and program run back to back inside one
//! [`critical_section::with`] block, so neither the 1 ms tick nor anything
//! else runs while the sector is blank. Hosts must link a critical-section
//! implementation (the `std` feature of the `critical-section` crate).
//!
//! # Examples
//!
//! ```
//! use doorward_core::CardUid;
//! use doorward_hardware::mock::MockFlash;
//! use doorward_storage::ConfigStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Blank flash gets the factory defaults on open.
//! let mut store = ConfigStore::open(MockFlash::new());
//! assert!(store.verify_admin_password("123456"));
//!
//! let card = CardUid::parse_hex("DEADBEEF")?;
//! store.add_identifier(card)?;
//! assert!(store.is_authorized(0xDEAD_BEEF));
//! # Ok(())
//! # }
//! ```
//!
//! [`FlashRegion`]: doorward_hardware::FlashRegion

pub mod error;
pub mod record;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use record::{DecodedRecord, RECORD_SIZE, RecordField, SecurityConfig};
pub use store::{ConfigStore, LoadOutcome};
