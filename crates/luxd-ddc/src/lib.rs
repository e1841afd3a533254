//! DDC/CI protocol engine
//!
//! Talks to external monitors over their I2C control channel: builds and
//! parses checksummed command frames, resolves which physical channel serves
//! a given display by comparing EDID identity blocks, and performs the
//! read/write brightness transaction with the mandatory settle delay.
//!
//! Every failure here means "hardware channel unusable" to callers; the
//! routing layer falls back to gamma control and never surfaces an error.

pub mod frame;
pub mod resolver;
pub mod transport;

pub use frame::{
    DDC_CHIP_ADDRESS, DDC_DATA_ADDRESS, DDC_REPLY_LEN, VCP_BRIGHTNESS, VcpReply, checksum,
    parse_reply, read_request, write_request,
};
pub use resolver::ChannelResolver;
pub use transport::{DdcTransport, SETTLE_DELAY};

use luxd_hal::{DisplayId, HalError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DdcError {
    #[error("no control channel for display {0}")]
    NotFound(DisplayId),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl From<HalError> for DdcError {
    fn from(e: HalError) -> Self {
        DdcError::Transport(e.to_string())
    }
}

/// DDC Result type
pub type Result<T> = std::result::Result<T, DdcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let not_found = DdcError::NotFound(7);
        let transport = DdcError::Transport("write failed".into());
        let protocol = DdcError::Protocol("bad reply type".into());

        assert!(format!("{not_found}").contains("display 7"));
        assert!(format!("{transport}").contains("transport"));
        assert!(format!("{protocol}").contains("protocol"));
    }

    #[test]
    fn test_hal_error_maps_to_transport() {
        let err: DdcError = HalError::Bus("timeout".into()).into();
        assert!(matches!(err, DdcError::Transport(_)));
    }
}
