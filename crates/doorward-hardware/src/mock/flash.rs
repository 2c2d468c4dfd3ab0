//! In-memory flash sector with NOR programming semantics.

use crate::error::{HardwareError, Result};
use crate::traits::FlashRegion;
use doorward_core::constants::STORAGE_SECTOR_SIZE;

/// Erased flash reads as all ones.
pub const ERASED_BYTE: u8 = 0xFF;

/// One erase unit held in memory.
///
/// Programming can only clear bits (`old & new`), exactly like NOR flash,
/// so a write without a preceding erase produces a corrupted record rather
/// than silently succeeding.
///
/// # Examples
///
/// ```
/// use doorward_hardware::FlashRegion;
/// use doorward_hardware::mock::MockFlash;
///
/// let mut flash = MockFlash::new();
/// flash.program(0, &[0x12, 0x34]).unwrap();
///
/// let mut buf = [0u8; 2];
/// flash.read(0, &mut buf).unwrap();
/// assert_eq!(buf, [0x12, 0x34]);
/// ```
#[derive(Debug, Clone)]
pub struct MockFlash {
    data: Vec<u8>,
    fail_erase: bool,
    fail_program: bool,
    erase_count: u32,
    program_count: u32,
}

impl MockFlash {
    /// Create an erased sector of the default size.
    pub fn new() -> Self {
        Self::with_capacity(STORAGE_SECTOR_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_bytes(vec![ERASED_BYTE; capacity])
    }

    /// Create a sector holding an existing image.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            fail_erase: false,
            fail_program: false,
            erase_count: 0,
            program_count: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Overwrite raw contents, bypassing erase semantics. For corrupting
    /// records in tests.
    pub fn poke(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let range = self.range(offset, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Make subsequent erase cycles fail.
    pub fn set_fail_erase(&mut self, fail: bool) {
        self.fail_erase = fail;
    }

    /// Make subsequent program cycles fail.
    pub fn set_fail_program(&mut self, fail: bool) {
        self.fail_program = fail;
    }

    pub fn erase_count(&self) -> u32 {
        self.erase_count
    }

    pub fn program_count(&self) -> u32 {
        self.program_count
    }

    fn range(&self, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
        let capacity = self.data.len();
        match offset.checked_add(len) {
            Some(end) if end <= capacity => Ok(offset..end),
            _ => Err(HardwareError::OutOfBounds {
                offset,
                len,
                capacity,
            }),
        }
    }
}

impl Default for MockFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashRegion for MockFlash {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn erase(&mut self) -> Result<()> {
        if self.fail_erase {
            return Err(HardwareError::flash_erase("simulated erase failure"));
        }
        self.data.fill(ERASED_BYTE);
        self.erase_count += 1;
        Ok(())
    }

    fn program(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        if self.fail_program {
            return Err(HardwareError::flash_program("simulated program failure"));
        }
        let range = self.range(offset, data.len())?;
        for (cell, byte) in self.data[range].iter_mut().zip(data) {
            *cell &= *byte;
        }
        self.program_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sector_is_erased() {
        let flash = MockFlash::new();
        assert_eq!(flash.capacity(), STORAGE_SECTOR_SIZE);
        assert!(flash.as_bytes().iter().all(|&b| b == ERASED_BYTE));
    }

    #[test]
    fn test_program_without_erase_only_clears_bits() {
        let mut flash = MockFlash::new();
        flash.program(0, &[0b1010_1010]).unwrap();
        flash.program(0, &[0b0101_0101]).unwrap();

        let mut buf = [0xAA];
        flash.read(0, &mut buf).unwrap();
        assert_eq!(buf, [0]);

        flash.erase().unwrap();
        flash.program(0, &[0b0101_0101]).unwrap();
        flash.read(0, &mut buf).unwrap();
        assert_eq!(buf, [0b0101_0101]);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut flash = MockFlash::with_capacity(8);
        let err = flash.program(6, &[0, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            HardwareError::OutOfBounds {
                offset: 6,
                len: 3,
                capacity: 8
            }
        );
    }

    #[test]
    fn test_failure_injection() {
        let mut flash = MockFlash::new();
        flash.set_fail_erase(true);
        assert!(matches!(flash.erase(), Err(HardwareError::FlashErase { .. })));
        assert_eq!(flash.erase_count(), 0);

        flash.set_fail_program(true);
        assert!(matches!(
            flash.program(0, &[1]),
            Err(HardwareError::FlashProgram { .. })
        ));
    }
}
