//! Register-level MFRC522 simulator.
//!
//! The simulator reacts to the same register writes the real reader does:
//! frames written to the FIFO are "transmitted" when `StartSend` is set
//! while the transceive command is active, and a present card answers by
//! filling the FIFO and raising the completion interrupt bits. With no card
//! in the field nothing completes, so the engine sees a step timeout.

use crate::error::{HardwareError, Result};
use crate::mfrc522::*;
use crate::traits::RegisterBus;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Answer-to-request of a MIFARE Classic 1K.
const ATQA: [u8; 2] = [0x04, 0x00];

#[derive(Debug)]
struct ReaderState {
    registers: [u8; 64],
    fifo: VecDeque<u8>,
    com_irq: u8,
    card: Option<[u8; 4]>,
    corrupt_checksum: bool,
    error_flags: u8,
    unresponsive: bool,
    bus_failure: bool,
    in_reset: bool,
    reset_pulses: u32,
    soft_resets: u32,
    requests: u32,
    anticollisions: u32,
    halts: u32,
}

impl Default for ReaderState {
    fn default() -> Self {
        Self {
            registers: [0; 64],
            fifo: VecDeque::new(),
            com_irq: 0,
            card: None,
            corrupt_checksum: false,
            error_flags: 0,
            unresponsive: false,
            bus_failure: false,
            in_reset: false,
            reset_pulses: 0,
            soft_resets: 0,
            requests: 0,
            anticollisions: 0,
            halts: 0,
        }
    }
}

impl ReaderState {
    fn transceive(&mut self) {
        let frame: Vec<u8> = self.fifo.drain(..).collect();
        match frame.as_slice() {
            [PICC_REQ_IDLE, ..] => {
                self.requests += 1;
                if self.card.is_some() && !self.unresponsive {
                    self.fifo.extend(ATQA);
                    self.com_irq |= IRQ_DONE_MASK;
                }
            }
            [PICC_ANTICOLL, PICC_ANTICOLL_NVB, ..] => {
                self.anticollisions += 1;
                if let Some(uid) = self.card.filter(|_| !self.unresponsive) {
                    let mut check = uid_check_byte(&uid);
                    if self.corrupt_checksum {
                        check ^= 0xFF;
                    }
                    self.fifo.extend(uid);
                    self.fifo.push_back(check);
                    self.com_irq |= IRQ_DONE_MASK;
                }
            }
            [PICC_HALT, ..] => {
                // A halted card never acknowledges.
                self.halts += 1;
            }
            _ => {}
        }
    }

    fn write(&mut self, reg: u8, value: u8) {
        match reg {
            COMMAND_REG if value & 0x0F == PCD_RESET_PHASE => {
                // Soft reset clears the chip, not the field or the counters.
                *self = Self {
                    card: self.card,
                    corrupt_checksum: self.corrupt_checksum,
                    error_flags: self.error_flags,
                    unresponsive: self.unresponsive,
                    reset_pulses: self.reset_pulses,
                    soft_resets: self.soft_resets + 1,
                    requests: self.requests,
                    anticollisions: self.anticollisions,
                    halts: self.halts,
                    ..Self::default()
                };
            }
            COM_IRQ_REG => {
                // Bit 7 (Set1) clear means "clear the marked bits".
                if value & 0x80 == 0 {
                    self.com_irq &= !(value & 0x7F);
                } else {
                    self.com_irq |= value & 0x7F;
                }
            }
            FIFO_LEVEL_REG => {
                if value & FIFO_FLUSH != 0 {
                    self.fifo.clear();
                }
            }
            FIFO_DATA_REG => self.fifo.push_back(value),
            BIT_FRAMING_REG => {
                self.registers[usize::from(reg)] = value & !START_SEND;
                if value & START_SEND != 0
                    && self.registers[usize::from(COMMAND_REG)] & 0x0F == PCD_TRANSCEIVE
                {
                    self.transceive();
                }
            }
            _ => self.registers[usize::from(reg & 0x3F)] = value,
        }
    }

    fn read(&mut self, reg: u8) -> u8 {
        match reg {
            COM_IRQ_REG => self.com_irq,
            ERROR_REG => {
                if self.com_irq & IRQ_DONE_MASK != 0 {
                    self.error_flags
                } else {
                    0
                }
            }
            FIFO_LEVEL_REG => u8::try_from(self.fifo.len()).unwrap_or(u8::MAX),
            FIFO_DATA_REG => self.fifo.pop_front().unwrap_or(0),
            _ => self.registers[usize::from(reg & 0x3F)],
        }
    }
}

/// Simulated MFRC522 behind a [`RegisterBus`].
///
/// # Examples
///
/// ```
/// use doorward_hardware::RegisterBus;
/// use doorward_hardware::mfrc522::*;
/// use doorward_hardware::mock::MockMfrc522;
///
/// let (mut bus, handle) = MockMfrc522::new();
/// handle.present_card([0xDE, 0xAD, 0xBE, 0xEF]);
///
/// bus.write_register(COMMAND_REG, PCD_TRANSCEIVE).unwrap();
/// bus.write_register(FIFO_DATA_REG, PICC_REQ_IDLE).unwrap();
/// bus.write_register(BIT_FRAMING_REG, SHORT_FRAME_BITS | START_SEND).unwrap();
///
/// assert_eq!(bus.read_register(COM_IRQ_REG).unwrap() & IRQ_DONE_MASK, IRQ_DONE_MASK);
/// ```
#[derive(Debug)]
pub struct MockMfrc522 {
    state: Arc<Mutex<ReaderState>>,
}

impl MockMfrc522 {
    /// Create an empty reader (no card in the field) and its handle.
    pub fn new() -> (Self, MockMfrc522Handle) {
        let state = Arc::new(Mutex::new(ReaderState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockMfrc522Handle { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, ReaderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RegisterBus for MockMfrc522 {
    fn write_register(&mut self, reg: u8, value: u8) -> Result<()> {
        let mut state = self.state();
        if state.bus_failure {
            return Err(HardwareError::bus("simulated SPI failure"));
        }
        if state.in_reset {
            return Err(HardwareError::disconnected("MFRC522 held in reset"));
        }
        state.write(reg, value);
        Ok(())
    }

    fn read_register(&mut self, reg: u8) -> Result<u8> {
        let mut state = self.state();
        if state.bus_failure {
            return Err(HardwareError::bus("simulated SPI failure"));
        }
        if state.in_reset {
            return Err(HardwareError::disconnected("MFRC522 held in reset"));
        }
        Ok(state.read(reg))
    }

    fn set_reset(&mut self, asserted: bool) -> Result<()> {
        let mut state = self.state();
        if state.in_reset && !asserted {
            state.reset_pulses += 1;
        }
        state.in_reset = asserted;
        Ok(())
    }
}

/// Handle for placing cards in the field of a [`MockMfrc522`] and
/// injecting faults.
#[derive(Debug, Clone)]
pub struct MockMfrc522Handle {
    state: Arc<Mutex<ReaderState>>,
}

impl MockMfrc522Handle {
    fn state(&self) -> MutexGuard<'_, ReaderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Place a card with the given UID in the field.
    pub fn present_card(&self, uid: [u8; 4]) {
        self.state().card = Some(uid);
    }

    /// Place a card whose UID packs big-endian to `uid`.
    pub fn present_uid(&self, uid: u32) {
        self.present_card(uid.to_be_bytes());
    }

    /// Take the card out of the field.
    pub fn remove_card(&self) {
        self.state().card = None;
    }

    pub fn card(&self) -> Option<[u8; 4]> {
        self.state().card
    }

    /// Send a wrong block check character with the UID.
    pub fn set_corrupt_checksum(&self, corrupt: bool) {
        self.state().corrupt_checksum = corrupt;
    }

    /// Value `ErrorReg` reports after a completed transceive.
    pub fn set_error_flags(&self, flags: u8) {
        self.state().error_flags = flags;
    }

    /// Never complete a transceive, even with a card present.
    pub fn set_unresponsive(&self, unresponsive: bool) {
        self.state().unresponsive = unresponsive;
    }

    /// Fail every bus transfer.
    pub fn set_bus_failure(&self, failing: bool) {
        self.state().bus_failure = failing;
    }

    /// Current value of a plain configuration register.
    pub fn register(&self, reg: u8) -> u8 {
        self.state().registers[usize::from(reg & 0x3F)]
    }

    pub fn reset_pulses(&self) -> u32 {
        self.state().reset_pulses
    }

    pub fn soft_resets(&self) -> u32 {
        self.state().soft_resets
    }

    /// Number of REQA frames transmitted.
    pub fn request_count(&self) -> u32 {
        self.state().requests
    }

    pub fn anticollision_count(&self) -> u32 {
        self.state().anticollisions
    }

    pub fn halt_count(&self) -> u32 {
        self.state().halts
    }
}
