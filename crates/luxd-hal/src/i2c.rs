//! Raw I2C bus primitives
//!
//! External monitors are reached over the I2C side-channel exposed as
//! `/dev/i2c-N`. This module provides the bus trait the DDC transport talks
//! to, the Linux character-device implementation, and channel enumeration
//! with EDID identity readout (slave 0x50).

use crate::HalError;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

/// Slave address of the EDID EEPROM on a monitor's control channel.
pub const EDID_CHIP_ADDRESS: u16 = 0x50;

/// Length of the base EDID identity block.
pub const EDID_BLOCK_LEN: usize = 128;

// I2C_SLAVE from linux/i2c-dev.h
nix::ioctl_write_int_bad!(i2c_slave, 0x0703);

/// Byte-level transfer primitives of one hardware control channel.
pub trait I2cBus: Send {
    /// Transmit `data` to `chip`, prefixed with the protocol data address.
    fn write(&mut self, chip: u16, data_addr: u8, data: &[u8]) -> Result<(), HalError>;

    /// Fill `buf` with a reply from `chip`.
    fn read(&mut self, chip: u16, buf: &mut [u8]) -> Result<(), HalError>;

    /// Human-readable channel name for diagnostics.
    fn name(&self) -> &str;
}

/// An open `/dev/i2c-N` character device.
pub struct LinuxI2cDev {
    file: File,
    name: String,
    slave: Option<u16>,
}

impl LinuxI2cDev {
    pub fn open(path: &Path) -> Result<Self, HalError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self {
            file,
            name: path.display().to_string(),
            slave: None,
        })
    }

    fn select_slave(&mut self, chip: u16) -> Result<(), HalError> {
        if self.slave == Some(chip) {
            return Ok(());
        }
        unsafe { i2c_slave(self.file.as_raw_fd(), libc::c_int::from(chip)) }
            .map_err(|e| HalError::Bus(format!("{}: I2C_SLAVE 0x{chip:02x}: {e}", self.name)))?;
        self.slave = Some(chip);
        Ok(())
    }
}

impl I2cBus for LinuxI2cDev {
    fn write(&mut self, chip: u16, data_addr: u8, data: &[u8]) -> Result<(), HalError> {
        self.select_slave(chip)?;

        let mut frame = Vec::with_capacity(data.len() + 1);
        frame.push(data_addr);
        frame.extend_from_slice(data);

        self.file
            .write_all(&frame)
            .map_err(|e| HalError::Bus(format!("{}: write: {e}", self.name)))
    }

    fn read(&mut self, chip: u16, buf: &mut [u8]) -> Result<(), HalError> {
        self.select_slave(chip)?;
        self.file
            .read_exact(buf)
            .map_err(|e| HalError::Bus(format!("{}: read: {e}", self.name)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// One control-capable channel found on the bus, with its identity block.
pub struct ChannelCandidate {
    pub bus: Box<dyn I2cBus>,
    pub edid: Option<Vec<u8>>,
}

/// Enumerates control-capable channels present on the machine.
pub trait ChannelSource: Send {
    fn scan(&self) -> Result<Vec<ChannelCandidate>, HalError>;
}

/// Scans `/dev` for I2C character devices.
pub struct LinuxChannelSource {
    dev_dir: PathBuf,
}

impl LinuxChannelSource {
    pub fn new() -> Self {
        Self {
            dev_dir: PathBuf::from("/dev"),
        }
    }

    pub fn with_dev_dir(dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
        }
    }

    /// Read the base EDID block from the channel's EEPROM, if present.
    fn read_identity(bus: &mut dyn I2cBus) -> Option<Vec<u8>> {
        // Reset the EEPROM offset, then read one base block
        bus.write(EDID_CHIP_ADDRESS, 0x00, &[]).ok()?;
        let mut block = vec![0u8; EDID_BLOCK_LEN];
        bus.read(EDID_CHIP_ADDRESS, &mut block).ok()?;
        Some(block)
    }
}

impl Default for LinuxChannelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelSource for LinuxChannelSource {
    fn scan(&self) -> Result<Vec<ChannelCandidate>, HalError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dev_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("i2c-"))
            .map(|e| e.path())
            .collect();
        paths.sort();

        let mut candidates = Vec::new();
        for path in paths {
            let mut bus = match LinuxI2cDev::open(&path) {
                Ok(bus) => bus,
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let edid = Self::read_identity(&mut bus);
            if edid.is_none() {
                tracing::debug!("No identity block on {}", path.display());
            }

            candidates.push(ChannelCandidate {
                bus: Box::new(bus),
                edid,
            });
        }

        tracing::debug!("Found {} control channel(s)", candidates.len());
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBus, MockHardware};

    #[test]
    fn test_read_identity_via_mock() {
        let state = MockHardware::shared();
        state.write().unwrap().i2c_reply = vec![0xAB; EDID_BLOCK_LEN];

        let mut bus = MockBus::new("mock-0", state.clone());
        let edid = LinuxChannelSource::read_identity(&mut bus).unwrap();
        assert_eq!(edid.len(), EDID_BLOCK_LEN);
        assert!(edid.iter().all(|&b| b == 0xAB));

        // The offset reset lands on the EDID EEPROM address
        let writes = state.read().unwrap().i2c_writes.clone();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].chip, EDID_CHIP_ADDRESS);
        assert_eq!(writes[0].bytes, vec![0x00]);
    }

    #[test]
    fn test_read_identity_absorbs_bus_failure() {
        let state = MockHardware::shared();
        state.write().unwrap().fail_writes = true;

        let mut bus = MockBus::new("mock-0", state);
        assert!(LinuxChannelSource::read_identity(&mut bus).is_none());
    }

    #[test]
    fn test_scan_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let source = LinuxChannelSource::with_dev_dir(tmp.path());
        assert!(source.scan().unwrap().is_empty());
    }
}
