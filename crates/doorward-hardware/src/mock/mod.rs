//! Mock device implementations for testing and host simulation.
//!
//! Each mock can be driven programmatically without physical hardware.
//! Devices that get moved into the controller come with a cloneable handle
//! (`Mock::new() -> (device, handle)`) so tests keep observing and
//! stimulating them after hand-off.

pub mod card_reader;
pub mod clock;
pub mod flash;
pub mod keypad;
pub mod motion;
pub mod outputs;
pub mod serial;
pub mod watchdog;

// Re-export commonly used types
pub use card_reader::{MockMfrc522, MockMfrc522Handle};
pub use clock::MockClock;
pub use flash::MockFlash;
pub use keypad::{MockKeypadMatrix, MockKeypadMatrixHandle};
pub use motion::{MockMotion, MockMotionHandle};
pub use outputs::{
    MockAlarm, MockAlarmHandle, MockIndicator, MockIndicatorHandle, MockLock, MockLockHandle,
    MockTone,
};
pub use serial::{MockSerial, MockSerialHandle};
pub use watchdog::{MockWatchdog, MockWatchdogHandle};
