//! Write-through configuration cache over one flash sector.

use doorward_core::constants::MAX_STORED_IDS;
use doorward_core::{AdminPassword, CardUid, DoorPin, Error as ValidationError};
use doorward_hardware::{FlashRegion, HardwareError};
use tracing::{debug, error, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::record::{RECORD_SIZE, SecurityConfig};

/// What [`ConfigStore::load`] found on flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A valid record was read.
    Restored,
    /// The marker matched but some fields were reset to defaults; the
    /// identifier table was kept and the repaired record written back.
    Repaired,
    /// No valid record; factory defaults were written.
    Initialized,
}

/// Configuration store.
///
/// Every mutating operation validates its input, updates the cache and then
/// rewrites the whole record. The cache is updated first and is not rolled
/// back if the flash write fails; [`is_in_sync`](Self::is_in_sync) reports
/// whether the cache and flash agree.
#[derive(Debug)]
pub struct ConfigStore<F: FlashRegion> {
    flash: F,
    cache: SecurityConfig,
    in_sync: bool,
}

impl<F: FlashRegion> ConfigStore<F> {
    /// Open the store and load the record.
    ///
    /// Never fails: if flash cannot be read or written the store runs on
    /// factory defaults and reports itself out of sync.
    pub fn open(flash: F) -> Self {
        let mut store = Self {
            flash,
            cache: SecurityConfig::default(),
            in_sync: false,
        };
        if let Err(err) = store.load() {
            error!(error = %err, "Configuration load failed, running on defaults");
        }
        store
    }

    /// Read the record from flash into the cache.
    ///
    /// If the record is missing or its marker is wrong the factory defaults
    /// are cached and immediately saved. A record with a valid marker keeps
    /// its identifier table; only undecodable fields revert to defaults.
    /// Either way flash holds a valid record afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Flash`] if reading fails, or if writing the
    /// defaults fails.
    pub fn load(&mut self) -> StorageResult<LoadOutcome> {
        let mut bytes = [0u8; RECORD_SIZE];
        if let Err(err) = self.flash.read(0, &mut bytes) {
            self.cache = SecurityConfig::default();
            self.in_sync = false;
            return Err(err.into());
        }

        match SecurityConfig::decode(&bytes) {
            Ok(decoded) if decoded.repaired.is_empty() => {
                self.cache = decoded.config;
                self.in_sync = true;
                info!(
                    identifiers = self.identifier_count(),
                    "Configuration restored"
                );
                Ok(LoadOutcome::Restored)
            }
            Ok(decoded) => {
                for field in &decoded.repaired {
                    warn!(%field, "Stored field invalid, reset to default");
                }
                self.persist(decoded.config)?;
                info!(
                    identifiers = self.identifier_count(),
                    "Configuration repaired"
                );
                Ok(LoadOutcome::Repaired)
            }
            Err(err) => {
                warn!(error = %err, "No valid configuration, writing factory defaults");
                self.persist(SecurityConfig::default())?;
                Ok(LoadOutcome::Initialized)
            }
        }
    }

    /// Rewrite the cached record to flash.
    ///
    /// Erase and program run inside one critical section, with interrupts
    /// suspended on the target.
    pub fn save(&mut self) -> StorageResult<()> {
        let bytes = self.cache.to_bytes();
        let flash = &mut self.flash;

        let result = critical_section::with(|_cs| -> Result<(), HardwareError> {
            flash.erase()?;
            flash.program(0, &bytes)
        });

        self.in_sync = result.is_ok();
        match result {
            Ok(()) => {
                debug!("Configuration saved");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Configuration save failed, cache and flash diverge");
                Err(err.into())
            }
        }
    }

    /// Replace the door PIN.
    ///
    /// # Errors
    ///
    /// [`StorageError::Validation`] unless `pin` is exactly four keypad
    /// characters. The abort key `#` is refused as well, since a PIN
    /// containing it could never be typed.
    pub fn update_pin(&mut self, pin: &str) -> StorageResult<()> {
        let pin = DoorPin::new(pin)?;
        if pin.contains_abort_key() {
            return Err(ValidationError::InvalidPin(
                "PIN cannot contain the abort key '#'".to_string(),
            )
            .into());
        }

        let mut next = self.cache;
        next.set_door_pin(pin);
        self.persist(next)?;
        info!("Door PIN updated");
        Ok(())
    }

    /// Replace the admin password (1-9 printable characters).
    pub fn update_admin_password(&mut self, password: &str) -> StorageResult<()> {
        let password = AdminPassword::new(password)?;

        let mut next = self.cache;
        next.set_admin_password(password);
        self.persist(next)?;
        info!("Admin password updated");
        Ok(())
    }

    /// Store a card identifier in the first empty slot.
    ///
    /// # Errors
    ///
    /// [`StorageError::DuplicateIdentifier`] if it is already stored,
    /// [`StorageError::CapacityExhausted`] if no slot is empty.
    pub fn add_identifier(&mut self, uid: CardUid) -> StorageResult<()> {
        if self.cache.contains(uid.value()) {
            return Err(StorageError::DuplicateIdentifier(uid));
        }

        let mut next = self.cache;
        let slot = next
            .slots_mut()
            .iter_mut()
            .find(|slot| **slot == 0)
            .ok_or(StorageError::CapacityExhausted {
                capacity: MAX_STORED_IDS,
            })?;
        *slot = uid.value();

        self.persist(next)?;
        info!(uid = %uid, "Identifier added");
        Ok(())
    }

    /// Clear every slot holding `uid`. Returns the number of slots cleared.
    ///
    /// # Errors
    ///
    /// [`StorageError::IdentifierNotFound`] if no slot matched.
    pub fn remove_identifier(&mut self, uid: CardUid) -> StorageResult<usize> {
        let mut next = self.cache;
        let mut removed = 0;
        for slot in next.slots_mut().iter_mut().filter(|slot| **slot == uid.value()) {
            *slot = 0;
            removed += 1;
        }
        if removed == 0 {
            return Err(StorageError::IdentifierNotFound(uid));
        }

        self.persist(next)?;
        info!(uid = %uid, removed, "Identifier removed");
        Ok(removed)
    }

    /// Overwrite everything with the factory defaults.
    pub fn factory_reset(&mut self) -> StorageResult<()> {
        self.persist(SecurityConfig::default())?;
        warn!("Configuration reset to factory defaults");
        Ok(())
    }

    /// Stored identifiers in slot order.
    pub fn list_identifiers(&self) -> Vec<CardUid> {
        self.cache.identifiers().collect()
    }

    pub fn identifier_count(&self) -> usize {
        self.cache.identifiers().count()
    }

    /// Linear scan of the identifier table. Zero is never authorized.
    pub fn is_authorized(&self, raw: u32) -> bool {
        self.cache.contains(raw)
    }

    /// Constant-time admin password check.
    pub fn verify_admin_password(&self, candidate: &str) -> bool {
        self.cache.admin_password().verify(candidate)
    }

    pub fn door_pin(&self) -> &DoorPin {
        self.cache.door_pin()
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.cache
    }

    /// Whether the last write reached flash.
    pub fn is_in_sync(&self) -> bool {
        self.in_sync
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn into_flash(self) -> F {
        self.flash
    }

    /// Cache first, then flash.
    fn persist(&mut self, next: SecurityConfig) -> StorageResult<()> {
        self.cache = next;
        self.save()
    }
}
