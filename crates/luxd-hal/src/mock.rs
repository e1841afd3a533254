//! Mock implementations for testing without real hardware
//!
//! Provides in-memory backends for the backlight service and the I2C bus,
//! sharing one `MockHardware` state so tests can script replies and inspect
//! what the code under test transmitted.
//!
//! # Usage
//!
//! ```
//! use luxd_hal::mock::{MockBus, MockHardware};
//! use luxd_hal::I2cBus;
//!
//! let state = MockHardware::shared();
//! state.write().unwrap().i2c_reply = vec![0x6E; 12];
//!
//! let mut bus = MockBus::new("mock-0", state.clone());
//! bus.write(0x37, 0x51, &[0x82, 0x01, 0x10, 0xAC]).unwrap();
//! assert_eq!(state.read().unwrap().i2c_writes.len(), 1);
//! ```

use crate::backlight::BacklightService;
use crate::i2c::{ChannelCandidate, ChannelSource, I2cBus};
use crate::HalError;
use std::sync::{Arc, RwLock};

/// One recorded bus transmission. `bytes[0]` is the data address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub chip: u16,
    pub bytes: Vec<u8>,
}

/// Shared mock state for synchronized access across mock components.
#[derive(Debug)]
pub struct MockHardware {
    /// Internal panel level (normalized)
    pub backlight: f64,
    /// When false, the backlight service reports unavailable
    pub backlight_ok: bool,
    /// Every frame transmitted on the bus, in order
    pub i2c_writes: Vec<RecordedWrite>,
    /// Bytes served to the next bus read
    pub i2c_reply: Vec<u8>,
    /// Force transmit failures
    pub fail_writes: bool,
    /// Force reply-read failures
    pub fail_reads: bool,
}

impl MockHardware {
    pub fn new() -> Self {
        Self {
            backlight: 0.5,
            backlight_ok: true,
            i2c_writes: Vec::new(),
            i2c_reply: Vec::new(),
            fail_writes: false,
            fail_reads: false,
        }
    }

    pub fn shared() -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self::new()))
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock I2C channel backed by shared state.
pub struct MockBus {
    name: String,
    state: Arc<RwLock<MockHardware>>,
}

impl MockBus {
    pub fn new(name: impl Into<String>, state: Arc<RwLock<MockHardware>>) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }
}

impl I2cBus for MockBus {
    fn write(&mut self, chip: u16, data_addr: u8, data: &[u8]) -> Result<(), HalError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| HalError::Bus("mock state poisoned".into()))?;

        if state.fail_writes {
            return Err(HalError::Bus(format!("{}: injected write failure", self.name)));
        }

        let mut bytes = Vec::with_capacity(data.len() + 1);
        bytes.push(data_addr);
        bytes.extend_from_slice(data);
        state.i2c_writes.push(RecordedWrite { chip, bytes });
        Ok(())
    }

    fn read(&mut self, _chip: u16, buf: &mut [u8]) -> Result<(), HalError> {
        let state = self
            .state
            .read()
            .map_err(|_| HalError::Bus("mock state poisoned".into()))?;

        if state.fail_reads {
            return Err(HalError::Bus(format!("{}: injected read failure", self.name)));
        }
        if state.i2c_reply.len() < buf.len() {
            return Err(HalError::Bus(format!(
                "{}: short reply ({} < {})",
                self.name,
                state.i2c_reply.len(),
                buf.len()
            )));
        }

        buf.copy_from_slice(&state.i2c_reply[..buf.len()]);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Mock channel enumeration: a fixed list of named channels with optional
/// identity blocks, all sharing one hardware state.
pub struct MockChannelSource {
    channels: Vec<(String, Option<Vec<u8>>)>,
    state: Arc<RwLock<MockHardware>>,
}

impl MockChannelSource {
    pub fn new(state: Arc<RwLock<MockHardware>>) -> Self {
        Self {
            channels: Vec::new(),
            state,
        }
    }

    pub fn with_channel(mut self, name: impl Into<String>, edid: Option<Vec<u8>>) -> Self {
        self.channels.push((name.into(), edid));
        self
    }
}

impl ChannelSource for MockChannelSource {
    fn scan(&self) -> Result<Vec<ChannelCandidate>, HalError> {
        Ok(self
            .channels
            .iter()
            .map(|(name, edid)| ChannelCandidate {
                bus: Box::new(MockBus::new(name.clone(), Arc::clone(&self.state))) as Box<dyn I2cBus>,
                edid: edid.clone(),
            })
            .collect())
    }
}

/// Mock internal panel service.
pub struct MockBacklight {
    state: Arc<RwLock<MockHardware>>,
}

impl MockBacklight {
    pub fn new(state: Arc<RwLock<MockHardware>>) -> Self {
        Self { state }
    }
}

impl BacklightService for MockBacklight {
    fn get(&self) -> Result<f64, HalError> {
        let state = self
            .state
            .read()
            .map_err(|_| HalError::ServiceUnavailable("mock state poisoned".into()))?;
        if !state.backlight_ok {
            return Err(HalError::ServiceUnavailable("injected outage".into()));
        }
        Ok(state.backlight)
    }

    fn set(&mut self, level: f64) -> Result<(), HalError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| HalError::ServiceUnavailable("mock state poisoned".into()))?;
        if !state.backlight_ok {
            return Err(HalError::ServiceUnavailable("injected outage".into()));
        }
        state.backlight = level.clamp(0.0, 1.0);
        Ok(())
    }
}
