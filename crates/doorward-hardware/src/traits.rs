//! Capability traits for the controller's external collaborators.
//!
//! These traits establish the contract between the controller core and the
//! board: actuators, sensors, the card reader bus, the keypad matrix, the
//! flash sector, the admin transport, the clock and the watchdog. Each has
//! a fake in [`mock`](crate::mock).
//!
//! All methods are synchronous and bounded. Nothing here may block beyond a
//! single bus transaction, with the single exception of
//! [`FlashRegion::erase`]/[`FlashRegion::program`], which the configuration
//! store runs inside its critical section.

use crate::error::Result;
use doorward_core::AlarmVolume;

/// Milliseconds elapsed from `start` to `now` on a wrapping 32-bit counter.
///
/// # Examples
///
/// ```
/// use doorward_hardware::elapsed_ms;
///
/// assert_eq!(elapsed_ms(150, 100), 50);
/// assert_eq!(elapsed_ms(4, u32::MAX - 5), 10);
/// ```
#[inline]
#[must_use]
pub fn elapsed_ms(now: u32, start: u32) -> u32 {
    now.wrapping_sub(start)
}

/// Monotonic millisecond clock.
///
/// The counter is 32 bits wide and wraps roughly every 49.7 days, so all
/// comparisons go through [`elapsed_ms`] and never compare raw timestamps.
pub trait Clock {
    /// Current value of the millisecond counter.
    fn now_millis(&self) -> u32;

    /// Whether at least `duration_ms` has elapsed since `start`.
    fn timed_out(&self, start: u32, duration_ms: u32) -> bool {
        elapsed_ms(self.now_millis(), start) >= duration_ms
    }

    /// Wait for `ms` milliseconds against this clock.
    ///
    /// Only used during peripheral initialisation, before the main loop
    /// starts servicing deadlines.
    fn delay_ms(&self, ms: u32) {
        let start = self.now_millis();
        while !self.timed_out(start, ms) {
            std::hint::spin_loop();
        }
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_millis(&self) -> u32 {
        (**self).now_millis()
    }

    fn timed_out(&self, start: u32, duration_ms: u32) -> bool {
        (**self).timed_out(start, duration_ms)
    }

    fn delay_ms(&self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

/// Door lock actuator.
pub trait LockActuator {
    /// Drive the lock to the open position.
    fn open(&mut self);

    /// Drive the lock to the closed position.
    fn close(&mut self);
}

/// Audible alarm output.
pub trait AlarmOutput {
    /// Sound a continuous tone.
    fn on(&mut self, frequency_hz: u16, volume: AlarmVolume);

    /// Silence the output.
    fn off(&mut self);

    /// Short beep that silences itself after `duration_ms`.
    fn chirp(&mut self, duration_ms: u32);
}

/// Visual status indicator (alarm LED).
pub trait StatusIndicator {
    fn on(&mut self);
    fn off(&mut self);
    fn toggle(&mut self);
}

/// Passive motion sensor with an edge latch.
pub trait MotionSensor {
    /// Return `true` once per captured rising edge, clearing the latch.
    fn consume_trigger_edge(&mut self) -> bool;
}

/// Independent watchdog timer.
pub trait Watchdog {
    /// Service the watchdog. Must be called within the watchdog window on
    /// every main loop iteration or the system resets.
    fn feed(&mut self);
}

/// Raw tone generator behind the buzzer.
///
/// Called from both contexts (the interrupt silences expired chirps), so
/// implementations must be `Send + Sync` and take `&self`.
pub trait ToneGenerator: Send + Sync {
    /// Start a tone at `frequency_hz` with the given duty cycle percent.
    fn tone(&self, frequency_hz: u16, duty_percent: u8);

    /// Stop the tone.
    fn silence(&self);
}

/// Register-level access to the contactless reader IC.
///
/// Each call is one short bus transaction. See [`mfrc522`](crate::mfrc522)
/// for the register map.
pub trait RegisterBus {
    /// Write `value` to register `reg`.
    fn write_register(&mut self, reg: u8, value: u8) -> Result<()>;

    /// Read register `reg`.
    fn read_register(&mut self, reg: u8) -> Result<u8>;

    /// Drive the hardware reset line (`true` holds the chip in reset).
    fn set_reset(&mut self, asserted: bool) -> Result<()>;
}

/// Row/column access to a 4x4 key matrix.
///
/// Rows are driven active one at a time; a pressed key connects its row to
/// its column.
pub trait KeypadMatrix {
    /// Drive `row` active.
    fn drive_row(&mut self, row: usize);

    /// Return `row` to idle.
    fn release_row(&mut self, row: usize);

    /// Active columns as a bitmask (bit `n` set means column `n` reads
    /// active).
    fn read_columns(&self) -> u8;
}

/// One erase unit of non-volatile memory.
pub trait FlashRegion {
    /// Size of the region in bytes.
    fn capacity(&self) -> usize;

    /// Copy `buf.len()` bytes starting at `offset` into `buf`.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<()>;

    /// Erase the whole region.
    fn erase(&mut self) -> Result<()>;

    /// Program `data` at `offset`. The target bytes must have been erased.
    fn program(&mut self, offset: usize, data: &[u8]) -> Result<()>;
}

/// Byte-oriented admin link transport.
pub trait SerialTransport {
    /// Next received byte, if one is waiting. Never blocks.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Write bytes to the link.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;
}

impl<T: SerialTransport + ?Sized> SerialTransport for Box<T> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }
}
