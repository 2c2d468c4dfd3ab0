//! Fixed-layout configuration record.
//!
//! ```text
//! offset  size  field
//! 0x00       5  door PIN, 4 chars + NUL
//! 0x05      10  admin password, 1-9 chars + NUL padding
//! 0x0F       1  reserved (0)
//! 0x10     200  50 x u32 LE card identifiers, 0 = empty slot
//! 0xD8       4  integrity marker, u32 LE
//! ```

use std::fmt;

use doorward_core::constants::{
    ADMIN_PASSWORD_MAX_LEN, MAX_STORED_IDS, PIN_LENGTH, STORAGE_MAGIC,
};
use doorward_core::{AdminPassword, CardUid, DoorPin};

use crate::error::{StorageError, StorageResult};

const PIN_OFFSET: usize = 0x00;
const PIN_FIELD_LEN: usize = PIN_LENGTH + 1;
const PASSWORD_OFFSET: usize = PIN_OFFSET + PIN_FIELD_LEN;
const PASSWORD_FIELD_LEN: usize = ADMIN_PASSWORD_MAX_LEN + 1;
const IDS_OFFSET: usize = 0x10;
const ID_SIZE: usize = 4;
const MAGIC_OFFSET: usize = IDS_OFFSET + MAX_STORED_IDS * ID_SIZE;

/// Size of the serialized record in bytes.
pub const RECORD_SIZE: usize = MAGIC_OFFSET + 4;

/// Byte offset of the integrity marker.
pub const MAGIC_FIELD_OFFSET: usize = MAGIC_OFFSET;

/// Persistent controller configuration.
///
/// Identifier slots are kept exactly as stored, empty slots included, so
/// the table keeps its fixed size and storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityConfig {
    door_pin: DoorPin,
    admin_password: AdminPassword,
    identifiers: [u32; MAX_STORED_IDS],
}

impl Default for SecurityConfig {
    /// Factory defaults: PIN "1234", password "123456", empty table.
    fn default() -> Self {
        Self {
            door_pin: DoorPin::default(),
            admin_password: AdminPassword::default(),
            identifiers: [0; MAX_STORED_IDS],
        }
    }
}

impl SecurityConfig {
    pub fn door_pin(&self) -> &DoorPin {
        &self.door_pin
    }

    pub fn admin_password(&self) -> &AdminPassword {
        &self.admin_password
    }

    /// Raw identifier slots, zero meaning empty.
    pub fn slots(&self) -> &[u32; MAX_STORED_IDS] {
        &self.identifiers
    }

    /// Stored identifiers in slot order.
    pub fn identifiers(&self) -> impl Iterator<Item = CardUid> + '_ {
        self.identifiers
            .iter()
            .filter_map(|&raw| CardUid::new(raw).ok())
    }

    /// Whether `raw` is a stored identifier. Zero never matches.
    pub fn contains(&self, raw: u32) -> bool {
        raw != 0 && self.identifiers.contains(&raw)
    }

    pub(crate) fn set_door_pin(&mut self, pin: DoorPin) {
        self.door_pin = pin;
    }

    pub(crate) fn set_admin_password(&mut self, password: AdminPassword) {
        self.admin_password = password;
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [u32; MAX_STORED_IDS] {
        &mut self.identifiers
    }

    /// Serialize to the on-flash layout.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];

        // PIN (0x00, 4 bytes + NUL)
        bytes[PIN_OFFSET..PIN_OFFSET + PIN_LENGTH].copy_from_slice(self.door_pin.as_bytes());

        // Password (0x05, up to 9 bytes, NUL padded)
        let password = self.admin_password.as_bytes();
        bytes[PASSWORD_OFFSET..PASSWORD_OFFSET + password.len()].copy_from_slice(password);

        // Identifier table (0x10, 50 x 4 bytes)
        for (slot, raw) in bytes[IDS_OFFSET..MAGIC_OFFSET]
            .chunks_exact_mut(ID_SIZE)
            .zip(self.identifiers)
        {
            slot.copy_from_slice(&raw.to_le_bytes());
        }

        // Integrity marker (0xD8, 4 bytes)
        bytes[MAGIC_OFFSET..RECORD_SIZE].copy_from_slice(&STORAGE_MAGIC.to_le_bytes());

        bytes
    }

    /// Deserialize from the on-flash layout.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidRecord`] if the integrity marker does
    /// not match or a field does not decode to a valid value.
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> StorageResult<Self> {
        check_marker(bytes)?;
        Ok(Self {
            door_pin: decode_pin(bytes)?,
            admin_password: decode_password(bytes)?,
            identifiers: decode_identifiers(bytes),
        })
    }

    /// Deserialize a record, replacing undecodable fields with their
    /// factory values.
    ///
    /// The identifier table is always taken as stored. Only a marker
    /// mismatch makes the record unusable.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidRecord`] if the integrity marker does
    /// not match.
    pub fn decode(bytes: &[u8; RECORD_SIZE]) -> StorageResult<DecodedRecord> {
        check_marker(bytes)?;

        let mut repaired = Vec::new();
        let door_pin = decode_pin(bytes).unwrap_or_else(|_| {
            repaired.push(RecordField::DoorPin);
            DoorPin::default()
        });
        let admin_password = decode_password(bytes).unwrap_or_else(|_| {
            repaired.push(RecordField::AdminPassword);
            AdminPassword::default()
        });

        Ok(DecodedRecord {
            config: Self {
                door_pin,
                admin_password,
                identifiers: decode_identifiers(bytes),
            },
            repaired,
        })
    }
}

/// Field of the record that can be repaired on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    DoorPin,
    AdminPassword,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordField::DoorPin => f.write_str("door PIN"),
            RecordField::AdminPassword => f.write_str("admin password"),
        }
    }
}

/// A record with a matching marker, and the fields reset to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub config: SecurityConfig,
    pub repaired: Vec<RecordField>,
}

fn check_marker(bytes: &[u8; RECORD_SIZE]) -> StorageResult<()> {
    let magic = read_u32(bytes, MAGIC_OFFSET);
    if magic != STORAGE_MAGIC {
        return Err(StorageError::invalid_record(format!(
            "integrity marker 0x{magic:08X}"
        )));
    }
    Ok(())
}

fn decode_pin(bytes: &[u8; RECORD_SIZE]) -> StorageResult<DoorPin> {
    let field = &bytes[PIN_OFFSET..PIN_OFFSET + PIN_FIELD_LEN];
    if field[PIN_LENGTH] != 0 {
        return Err(StorageError::invalid_record("PIN not terminated"));
    }
    std::str::from_utf8(&field[..PIN_LENGTH])
        .ok()
        .and_then(|text| DoorPin::new(text).ok())
        .ok_or_else(|| StorageError::invalid_record("PIN field"))
}

fn decode_password(bytes: &[u8; RECORD_SIZE]) -> StorageResult<AdminPassword> {
    let field = &bytes[PASSWORD_OFFSET..PASSWORD_OFFSET + PASSWORD_FIELD_LEN];
    let len = field
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| StorageError::invalid_record("password not terminated"))?;
    std::str::from_utf8(&field[..len])
        .ok()
        .and_then(|text| AdminPassword::new(text).ok())
        .ok_or_else(|| StorageError::invalid_record("password field"))
}

fn decode_identifiers(bytes: &[u8; RECORD_SIZE]) -> [u32; MAX_STORED_IDS] {
    let mut identifiers = [0u32; MAX_STORED_IDS];
    for (i, raw) in identifiers.iter_mut().enumerate() {
        *raw = read_u32(bytes, IDS_OFFSET + i * ID_SIZE);
    }
    identifiers
}

fn read_u32(bytes: &[u8; RECORD_SIZE], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}
