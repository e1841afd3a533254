//! Hardware Abstraction Layer (HAL)
//!
//! This crate provides luxd's view of the machine's display hardware:
//! display enumeration with EDID identity blocks, the sysfs backlight
//! service backing the internal panel, and raw I2C bus primitives used by
//! the DDC/CI transport for external monitors.
//!
//! # Example
//!
//! ```no_run
//! use luxd_hal::{DisplayEnumerator, DrmEnumerator};
//!
//! fn main() -> Result<(), luxd_hal::HalError> {
//!     let displays = DrmEnumerator::new().enumerate()?;
//!     for d in &displays {
//!         println!("{} builtin={}", d.connector, d.builtin);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backlight;
pub mod display;
pub mod i2c;
pub mod mock;

pub use backlight::{BacklightService, NullBacklight, SysfsBacklight, locate_backlight};
pub use display::{
    DisplayEnumerator, DisplayId, DisplayInfo, DrmEnumerator, identity_matches,
};
pub use i2c::{ChannelCandidate, ChannelSource, I2cBus, LinuxChannelSource, LinuxI2cDev};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HalError {
    #[error("platform service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("bus transfer failed: {0}")]
    Bus(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HAL Result type
pub type Result<T> = std::result::Result<T, HalError>;
