//! MFRC522 register map and command codes.
//!
//! Only the subset used by the card engine is listed. Register addresses
//! are the raw 6-bit addresses; the bus implementation is responsible for
//! the SPI address framing.

// ============================================================================
// Registers
// ============================================================================

pub const COMMAND_REG: u8 = 0x01;
pub const COM_IRQ_REG: u8 = 0x04;
pub const ERROR_REG: u8 = 0x06;
pub const FIFO_DATA_REG: u8 = 0x09;
pub const FIFO_LEVEL_REG: u8 = 0x0A;
pub const BIT_FRAMING_REG: u8 = 0x0D;
pub const MODE_REG: u8 = 0x11;
pub const TX_CONTROL_REG: u8 = 0x14;
pub const TX_ASK_REG: u8 = 0x15;
pub const RF_CFG_REG: u8 = 0x26;
pub const T_MODE_REG: u8 = 0x2A;
pub const T_PRESCALER_REG: u8 = 0x2B;
pub const T_RELOAD_REG_H: u8 = 0x2C;
pub const T_RELOAD_REG_L: u8 = 0x2D;

// ============================================================================
// Reader (PCD) commands
// ============================================================================

pub const PCD_IDLE: u8 = 0x00;
pub const PCD_TRANSCEIVE: u8 = 0x0C;
pub const PCD_RESET_PHASE: u8 = 0x0F;

// ============================================================================
// Card (PICC) commands
// ============================================================================

/// Request idle cards (REQA). Sent as a 7-bit short frame.
pub const PICC_REQ_IDLE: u8 = 0x26;
/// Cascade level 1 anticollision, followed by NVB `0x20`.
pub const PICC_ANTICOLL: u8 = 0x93;
pub const PICC_ANTICOLL_NVB: u8 = 0x20;
pub const PICC_HALT: u8 = 0x50;

// ============================================================================
// Bit fields
// ============================================================================

/// `ComIrqReg`: RxIRq | IdleIRq, set when a transceive has completed.
pub const IRQ_DONE_MASK: u8 = 0x30;
/// `ComIrqReg`: writing this clears every interrupt request bit.
pub const IRQ_CLEAR_ALL: u8 = 0x7F;
/// `ErrorReg`: BufferOvfl | CollErr | ParityErr | ProtocolErr.
pub const ERROR_MASK: u8 = 0x1B;
/// `FIFOLevelReg`: FlushBuffer.
pub const FIFO_FLUSH: u8 = 0x80;
/// `BitFramingReg`: StartSend.
pub const START_SEND: u8 = 0x80;
/// `BitFramingReg`: 7 valid bits in the last transmitted byte (short frame).
pub const SHORT_FRAME_BITS: u8 = 0x07;
/// `TxControlReg`: Tx1RFEn | Tx2RFEn.
pub const ANTENNA_ON: u8 = 0x03;

// ============================================================================
// Initialisation values
// ============================================================================

pub const T_MODE_INIT: u8 = 0x8D;
pub const T_PRESCALER_INIT: u8 = 0x3E;
pub const T_RELOAD_INIT: u16 = 30;
/// Force 100% ASK modulation.
pub const TX_ASK_INIT: u8 = 0x40;
/// CRC preset 0x6363.
pub const MODE_INIT: u8 = 0x3D;
/// Maximum receiver gain (48 dB).
pub const RF_CFG_INIT: u8 = 0x70;

/// Length of the anticollision response: four UID bytes and the BCC.
pub const ANTICOLL_RESPONSE_LEN: usize = 5;

/// Block check character of a cascade level 1 UID.
///
/// # Examples
///
/// ```
/// use doorward_hardware::mfrc522::uid_check_byte;
///
/// assert_eq!(uid_check_byte(&[0x12, 0x34, 0x56, 0x78]), 0x08);
/// ```
#[must_use]
pub fn uid_check_byte(uid: &[u8; 4]) -> u8 {
    uid.iter().fold(0, |acc, b| acc ^ b)
}
