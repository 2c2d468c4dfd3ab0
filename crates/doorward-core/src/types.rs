use crate::{
    Result,
    constants::{
        ABORT_KEY, ADMIN_PASSWORD_MAX_LEN, ALARM_VOLUME_STEP, BASE_ALARM_VOLUME, CARD_UID_LEN,
        DEFAULT_ADMIN_PASSWORD, DEFAULT_DOOR_PIN, KEYPAD_LAYOUT, MAX_ALARM_VOLUME, PIN_LENGTH,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use subtle::ConstantTimeEq;

/// A character produced by the 4x4 keypad (`0-9`, `A-D`, `*`, `#`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyChar(u8);

impl KeyChar {
    /// Create a key from its character.
    ///
    /// # Errors
    /// Returns `Error::InvalidKey` for characters not printed on the keypad.
    pub fn new(c: char) -> Result<Self> {
        if !c.is_ascii() || !Self::is_keypad_byte(c as u8) {
            return Err(Error::InvalidKey(c));
        }
        Ok(KeyChar(c as u8))
    }

    /// Build a key from a raw byte, returning `None` for the null byte or
    /// anything that is not on the keypad.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::is_keypad_byte(byte).then_some(KeyChar(byte))
    }

    fn is_keypad_byte(byte: u8) -> bool {
        KEYPAD_LAYOUT.iter().flatten().any(|&k| k == byte)
    }

    #[must_use]
    pub fn as_byte(&self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn as_char(&self) -> char {
        self.0 as char
    }

    /// Whether this is the abort/trigger key.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        self.0 == ABORT_KEY
    }
}

impl fmt::Display for KeyChar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Door PIN: exactly four keypad characters.
///
/// # Security
/// Comparison is constant-time and `Debug` never prints the digits.
#[derive(Clone, Copy, Eq)]
pub struct DoorPin([u8; PIN_LENGTH]);

impl DoorPin {
    /// Parse a PIN from text.
    ///
    /// # Errors
    /// Returns `Error::InvalidPin` if the PIN is not exactly four characters
    /// from `0-9`, `A-D`, `*`, `#`.
    pub fn new(pin: &str) -> Result<Self> {
        let bytes = pin.as_bytes();
        if bytes.len() != PIN_LENGTH {
            return Err(Error::InvalidPin(format!(
                "PIN must be exactly {PIN_LENGTH} characters, got {}",
                pin.chars().count()
            )));
        }
        if let Some(&bad) = bytes.iter().find(|&&b| KeyChar::from_byte(b).is_none()) {
            return Err(Error::InvalidPin(format!(
                "character {:?} is not on the keypad (use 0-9, A-D, *, #)",
                bad as char
            )));
        }
        let mut digits = [0u8; PIN_LENGTH];
        digits.copy_from_slice(bytes);
        Ok(DoorPin(digits))
    }

    /// Whether the PIN contains the abort key and so cannot be typed in.
    #[must_use]
    pub fn contains_abort_key(&self) -> bool {
        self.0.contains(&ABORT_KEY)
    }

    /// Constant-time comparison against an entered sequence.
    #[must_use]
    pub fn matches(&self, entered: &[u8]) -> bool {
        entered.len() == PIN_LENGTH && bool::from(self.0.ct_eq(entered))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PIN_LENGTH] {
        &self.0
    }
}

impl PartialEq for DoorPin {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Default for DoorPin {
    /// The factory PIN.
    fn default() -> Self {
        let mut digits = [0u8; PIN_LENGTH];
        digits.copy_from_slice(&DEFAULT_DOOR_PIN.as_bytes()[..PIN_LENGTH]);
        DoorPin(digits)
    }
}

impl fmt::Debug for DoorPin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("DoorPin(****)")
    }
}

impl std::str::FromStr for DoorPin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DoorPin::new(s)
    }
}

/// Remote admin password (1-9 printable ASCII characters).
#[derive(Clone, Copy, Eq)]
pub struct AdminPassword {
    bytes: [u8; ADMIN_PASSWORD_MAX_LEN],
    len: u8,
}

impl AdminPassword {
    /// Parse an admin password.
    ///
    /// # Errors
    /// Returns `Error::InvalidPassword` if the length is outside 1-9 or the
    /// password contains whitespace, control or non-ASCII characters.
    pub fn new(password: &str) -> Result<Self> {
        let bytes = password.as_bytes();
        if bytes.is_empty() || bytes.len() > ADMIN_PASSWORD_MAX_LEN {
            return Err(Error::InvalidPassword(format!(
                "password must be 1-{ADMIN_PASSWORD_MAX_LEN} characters, got {}",
                password.chars().count()
            )));
        }
        if !bytes.iter().all(u8::is_ascii_graphic) {
            return Err(Error::InvalidPassword(
                "password must be printable ASCII without spaces".to_string(),
            ));
        }
        let mut stored = [0u8; ADMIN_PASSWORD_MAX_LEN];
        stored[..bytes.len()].copy_from_slice(bytes);
        Ok(AdminPassword {
            bytes: stored,
            len: bytes.len() as u8,
        })
    }

    /// Constant-time check of a login attempt.
    #[must_use]
    pub fn verify(&self, candidate: &str) -> bool {
        let candidate = candidate.as_bytes();
        candidate.len() == self.as_bytes().len() && bool::from(self.as_bytes().ct_eq(candidate))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl PartialEq for AdminPassword {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && bool::from(self.as_bytes().ct_eq(other.as_bytes()))
    }
}

impl Default for AdminPassword {
    /// The factory password.
    fn default() -> Self {
        let default = DEFAULT_ADMIN_PASSWORD.as_bytes();
        let len = default.len().min(ADMIN_PASSWORD_MAX_LEN);
        let mut bytes = [0u8; ADMIN_PASSWORD_MAX_LEN];
        bytes[..len].copy_from_slice(&default[..len]);
        AdminPassword {
            bytes,
            len: len as u8,
        }
    }
}

impl fmt::Debug for AdminPassword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("AdminPassword(****)")
    }
}

/// Card identifier: the 4-byte UID packed big-endian. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardUid(NonZeroU32);

impl CardUid {
    /// Create an identifier from its packed value.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardId` for zero, which marks an empty slot.
    pub fn new(value: u32) -> Result<Self> {
        NonZeroU32::new(value)
            .map(CardUid)
            .ok_or_else(|| Error::InvalidCardId("identifier must be non-zero".to_string()))
    }

    /// Pack UID bytes big-endian (`[0x11, 0x22, 0x33, 0x44]` is `0x11223344`).
    #[must_use]
    pub fn from_bytes(bytes: [u8; CARD_UID_LEN]) -> Option<Self> {
        NonZeroU32::new(u32::from_be_bytes(bytes)).map(CardUid)
    }

    /// Parse a hexadecimal identifier as typed on the admin link.
    ///
    /// All whitespace is stripped first and an optional `0x` prefix is
    /// accepted, so `"DE AD BE EF"` and `"0xdeadbeef"` are equivalent.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardId` if the text is empty, not hexadecimal,
    /// wider than 32 bits, or zero.
    pub fn parse_hex(text: &str) -> Result<Self> {
        let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let digits = cleaned
            .strip_prefix("0x")
            .or_else(|| cleaned.strip_prefix("0X"))
            .unwrap_or(&cleaned);
        if digits.is_empty() {
            return Err(Error::InvalidCardId("missing hex digits".to_string()));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidCardId(format!("{text:?} is not hexadecimal")));
        }
        let value = u32::from_str_radix(digits, 16)
            .map_err(|e| Error::InvalidCardId(format!("{text:?} is not a 32-bit hex value: {e}")))?;
        Self::new(value)
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0.get()
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; CARD_UID_LEN] {
        self.0.get().to_be_bytes()
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:08X}", self.0.get())
    }
}

impl std::str::FromStr for CardUid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardUid::parse_hex(s)
    }
}

/// Alarm volume (buzzer duty cycle percent), always within 10-50.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AlarmVolume(u8);

impl AlarmVolume {
    pub const BASE: AlarmVolume = AlarmVolume(BASE_ALARM_VOLUME);
    pub const MAX: AlarmVolume = AlarmVolume(MAX_ALARM_VOLUME);

    /// Clamp an arbitrary percentage into the allowed range.
    #[must_use]
    pub fn clamped(percent: u8) -> Self {
        AlarmVolume(percent.clamp(BASE_ALARM_VOLUME, MAX_ALARM_VOLUME))
    }

    /// One step louder, capped at the maximum.
    #[must_use]
    pub fn raised(self) -> Self {
        Self::clamped(self.0.saturating_add(ALARM_VOLUME_STEP))
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for AlarmVolume {
    type Error = Error;

    fn try_from(percent: u8) -> Result<Self> {
        if (BASE_ALARM_VOLUME..=MAX_ALARM_VOLUME).contains(&percent) {
            Ok(AlarmVolume(percent))
        } else {
            Err(Error::InvalidVolume(percent))
        }
    }
}

impl From<AlarmVolume> for u8 {
    fn from(volume: AlarmVolume) -> u8 {
        volume.0
    }
}

impl Default for AlarmVolume {
    fn default() -> Self {
        Self::BASE
    }
}

impl fmt::Display for AlarmVolume {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_factory_credentials() {
        assert_eq!(DoorPin::default(), DoorPin::new(DEFAULT_DOOR_PIN).unwrap());
        assert!(AdminPassword::default().verify(DEFAULT_ADMIN_PASSWORD));
    }

    #[rstest]
    #[case('0')]
    #[case('9')]
    #[case('A')]
    #[case('D')]
    #[case('*')]
    #[case('#')]
    fn test_key_char_accepts_keypad_characters(#[case] c: char) {
        let key = KeyChar::new(c).unwrap();
        assert_eq!(key.as_char(), c);
    }

    #[rstest]
    #[case('E')]
    #[case('a')]
    #[case(' ')]
    #[case('\0')]
    #[case('é')]
    fn test_key_char_rejects_other_characters(#[case] c: char) {
        assert_eq!(KeyChar::new(c), Err(Error::InvalidKey(c)));
    }

    #[test]
    fn test_only_hash_is_abort() {
        assert!(KeyChar::new('#').unwrap().is_abort());
        assert!(!KeyChar::new('*').unwrap().is_abort());
        assert_eq!(KeyChar::from_byte(0), None);
    }

    #[rstest]
    #[case("1234")]
    #[case("AB*D")]
    #[case("0#0#")]
    fn test_door_pin_valid(#[case] pin: &str) {
        let parsed = DoorPin::new(pin).unwrap();
        assert!(parsed.matches(pin.as_bytes()));
    }

    #[rstest]
    #[case("")]
    #[case("123")]
    #[case("12345")]
    #[case("12E4")]
    #[case("12 4")]
    #[case("abcd")]
    fn test_door_pin_invalid(#[case] pin: &str) {
        assert!(matches!(DoorPin::new(pin), Err(Error::InvalidPin(_))));
    }

    #[test]
    fn test_door_pin_matches_only_exact_sequence() {
        let pin = DoorPin::new("1234").unwrap();
        assert!(pin.matches(b"1234"));
        assert!(!pin.matches(b"1235"));
        assert!(!pin.matches(b"123"));
        assert!(!pin.matches(b"12345"));
    }

    #[test]
    fn test_door_pin_debug_is_masked() {
        let pin = DoorPin::new("9876").unwrap();
        assert_eq!(format!("{pin:?}"), "DoorPin(****)");
    }

    #[test]
    fn test_door_pin_abort_key_detection() {
        assert!(DoorPin::new("12#4").unwrap().contains_abort_key());
        assert!(!DoorPin::new("12*4").unwrap().contains_abort_key());
    }

    #[rstest]
    #[case("1")]
    #[case("123456")]
    #[case("Secret!99")]
    fn test_admin_password_valid(#[case] pw: &str) {
        let parsed = AdminPassword::new(pw).unwrap();
        assert!(parsed.verify(pw));
        assert_eq!(parsed.as_bytes(), pw.as_bytes());
    }

    #[rstest]
    #[case("")]
    #[case("0123456789")]
    #[case("has space")]
    #[case("tab\there")]
    fn test_admin_password_invalid(#[case] pw: &str) {
        assert!(matches!(AdminPassword::new(pw), Err(Error::InvalidPassword(_))));
    }

    #[test]
    fn test_admin_password_verify_rejects_prefix_and_extension() {
        let pw = AdminPassword::new("123456").unwrap();
        assert!(!pw.verify("12345"));
        assert!(!pw.verify("1234567"));
        assert!(!pw.verify(""));
    }

    #[test]
    fn test_card_uid_packs_big_endian() {
        let uid = CardUid::from_bytes([0x11, 0x22, 0x33, 0x44]).unwrap();
        assert_eq!(uid.value(), 0x1122_3344);
        assert_eq!(uid.to_bytes(), [0x11, 0x22, 0x33, 0x44]);
        assert_eq!(uid.to_string(), "11223344");
        assert_eq!(CardUid::from_bytes([0; 4]), None);
    }

    #[rstest]
    #[case("DEADBEEF", 0xDEAD_BEEF)]
    #[case("deadbeef", 0xDEAD_BEEF)]
    #[case("0xDEADBEEF", 0xDEAD_BEEF)]
    #[case(" DE AD\tBE EF ", 0xDEAD_BEEF)]
    #[case("1", 1)]
    fn test_card_uid_parse_hex(#[case] text: &str, #[case] expected: u32) {
        assert_eq!(CardUid::parse_hex(text).unwrap().value(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("0")]
    #[case("00000000")]
    #[case("XYZ")]
    #[case("1FFFFFFFF")]
    #[case("+1")]
    #[case("-1")]
    #[case("0x+1")]
    fn test_card_uid_parse_hex_rejects(#[case] text: &str) {
        assert!(matches!(CardUid::parse_hex(text), Err(Error::InvalidCardId(_))));
    }

    #[test]
    fn test_alarm_volume_bounds() {
        assert_eq!(AlarmVolume::default(), AlarmVolume::BASE);
        assert_eq!(AlarmVolume::clamped(0), AlarmVolume::BASE);
        assert_eq!(AlarmVolume::clamped(200), AlarmVolume::MAX);
        assert_eq!(AlarmVolume::BASE.raised().percent(), 20);
        assert_eq!(AlarmVolume::MAX.raised(), AlarmVolume::MAX);
        assert_eq!(AlarmVolume::clamped(45).raised(), AlarmVolume::MAX);
    }

    #[test]
    fn test_alarm_volume_serialization() {
        let json = serde_json::to_string(&AlarmVolume::MAX).unwrap();
        let back: AlarmVolume = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AlarmVolume::MAX);
        assert_eq!(json, "50");
    }

    #[rstest]
    #[case("0")]
    #[case("9")]
    #[case("51")]
    #[case("255")]
    fn test_alarm_volume_out_of_range_not_deserialized(#[case] json: &str) {
        assert!(serde_json::from_str::<AlarmVolume>(json).is_err());
        let percent: u8 = json.parse().unwrap();
        assert_eq!(
            AlarmVolume::try_from(percent),
            Err(Error::InvalidVolume(percent))
        );
    }
}
