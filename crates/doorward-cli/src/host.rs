//! Host-side implementations of the hardware traits.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use doorward_core::constants::STORAGE_SECTOR_SIZE;
use doorward_hardware::{Clock, FlashRegion, HardwareError, Result, SerialTransport};
use tracing::debug;

/// Milliseconds since the simulation started, wrapping at 2^32.
#[derive(Debug, Clone, Copy)]
pub struct HostClock {
    start: Instant,
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HostClock {
    fn now_millis(&self) -> u32 {
        // Truncation is the wraparound.
        self.start.elapsed().as_millis() as u32
    }

    fn delay_ms(&self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

const ERASED_BYTE: u8 = 0xFF;

/// Flash sector backed by an image file.
///
/// Every erase and program is written through to the file, so the
/// configuration survives restarts of the simulator.
#[derive(Debug)]
pub struct FileFlash {
    path: PathBuf,
    data: Vec<u8>,
}

impl FileFlash {
    /// Open an image, creating an erased one if the file does not exist.
    ///
    /// Short images are padded with erased bytes; long ones are truncated
    /// to one sector.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err),
        };
        data.resize(STORAGE_SECTOR_SIZE, ERASED_BYTE);
        debug!(path = %path.display(), "Flash image opened");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
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

    fn write_through(&self) -> io::Result<()> {
        fs::write(&self.path, &self.data)
    }
}

impl FlashRegion for FileFlash {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn erase(&mut self) -> Result<()> {
        self.data.fill(ERASED_BYTE);
        self.write_through()
            .map_err(|err| HardwareError::flash_erase(format!("{}: {err}", self.path.display())))
    }

    fn program(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let range = self.range(offset, data.len())?;
        for (cell, byte) in self.data[range].iter_mut().zip(data) {
            *cell &= *byte;
        }
        self.write_through()
            .map_err(|err| HardwareError::flash_program(format!("{}: {err}", self.path.display())))
    }
}

/// Admin link on the simulator console.
///
/// Input arrives from the console reader task; output goes to stdout.
#[derive(Debug)]
pub struct ConsoleTransport {
    input: Receiver<u8>,
}

impl ConsoleTransport {
    pub fn new(input: Receiver<u8>) -> Self {
        Self { input }
    }
}

impl SerialTransport for ConsoleTransport {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        match self.input.try_recv() {
            Ok(byte) => Ok(Some(byte)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(HardwareError::disconnected("console")),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(bytes)
            .and_then(|()| stdout.flush())
            .map_err(|err| HardwareError::serial(err.to_string()))
    }
}

/// Admin link on a real serial port.
pub struct SerialPortTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialPortTransport {
    pub fn open(path: &str, baud_rate: u32) -> serialport::Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(1))
            .open()?;
        Ok(Self { port })
    }
}

impl SerialTransport for SerialPortTransport {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let waiting = self
            .port
            .bytes_to_read()
            .map_err(|err| HardwareError::serial(err.to_string()))?;
        if waiting == 0 {
            return Ok(None);
        }

        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(1) => Ok(Some(byte[0])),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(err) => Err(HardwareError::serial(err.to_string())),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.port
            .write_all(bytes)
            .map_err(|err| HardwareError::serial(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_image_is_erased() {
        let dir = tempfile::tempdir().unwrap();
        let flash = FileFlash::open(dir.path().join("flash.bin")).unwrap();
        assert_eq!(flash.capacity(), STORAGE_SECTOR_SIZE);
        assert!(flash.as_bytes().iter().all(|&b| b == ERASED_BYTE));
    }

    #[test]
    fn test_program_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flash.bin");

        let mut flash = FileFlash::open(&path).unwrap();
        flash.erase().unwrap();
        flash.program(4, &[0x12, 0x34]).unwrap();

        let reopened = FileFlash::open(&path).unwrap();
        let mut buf = [0u8; 2];
        reopened.read(4, &mut buf).unwrap();
        assert_eq!(buf, [0x12, 0x34]);
        assert_eq!(fs::read(&path).unwrap().len(), STORAGE_SECTOR_SIZE);
    }

    #[test]
    fn test_short_image_is_padded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flash.bin");
        fs::write(&path, [0u8; 8]).unwrap();

        let flash = FileFlash::open(&path).unwrap();
        assert_eq!(&flash.as_bytes()[..8], &[0u8; 8]);
        assert_eq!(flash.as_bytes()[8], ERASED_BYTE);
    }

    #[test]
    fn test_out_of_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut flash = FileFlash::open(dir.path().join("flash.bin")).unwrap();
        let err = flash.program(STORAGE_SECTOR_SIZE - 1, &[0, 0]).unwrap_err();
        assert!(matches!(err, HardwareError::OutOfBounds { .. }));
    }

    #[test]
    fn test_missing_directory_fails_erase() {
        let dir = tempfile::tempdir().unwrap();
        let mut flash = FileFlash::open(dir.path().join("missing").join("flash.bin")).unwrap();
        assert!(matches!(
            flash.erase(),
            Err(HardwareError::FlashErase { .. })
        ));
    }

    #[test]
    fn test_console_transport() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut console = ConsoleTransport::new(rx);
        assert_eq!(console.read_byte().unwrap(), None);

        tx.send(b'S').unwrap();
        assert_eq!(console.read_byte().unwrap(), Some(b'S'));

        drop(tx);
        assert!(console.read_byte().is_err());
    }

    #[test]
    fn test_host_clock_advances() {
        let clock = HostClock::new();
        let start = clock.now_millis();
        clock.delay_ms(5);
        assert!(clock.timed_out(start, 5));
    }
}
