//! DDC/CI frame codec
//!
//! Frames are `[source, length, payload.., checksum]` where the checksum is
//! the running XOR of a fixed base with every preceding frame byte. The base
//! folds the destination (0x6E) with the data address the frame is sent
//! under (0x51).

use crate::DdcError;

/// I2C chip address of the DDC/CI endpoint on the monitor.
pub const DDC_CHIP_ADDRESS: u16 = 0x37;

/// Data address every command frame is sent under.
pub const DDC_DATA_ADDRESS: u8 = 0x51;

/// VCP feature code for brightness (luminance).
pub const VCP_BRIGHTNESS: u8 = 0x10;

/// Size of a VCP feature reply buffer.
pub const DDC_REPLY_LEN: usize = 12;

const CHECKSUM_BASE: u8 = 0x6E ^ DDC_DATA_ADDRESS;

/// XOR checksum over the frame bytes transmitted so far.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(CHECKSUM_BASE, |acc, b| acc ^ b)
}

/// Build a "set VCP feature" frame: `[0x84, 0x03, vcp, hi, lo, checksum]`.
///
/// Only the low value byte is driven; the high byte stays 0, limiting the
/// transmitted range to 0-255.
pub fn write_request(vcp: u8, value: u8) -> [u8; 6] {
    let mut frame = [0x84, 0x03, vcp, 0x00, value, 0x00];
    frame[5] = checksum(&frame[..5]);
    frame
}

/// Build a "get VCP feature" request: `[0x82, 0x01, vcp, checksum]`.
pub fn read_request(vcp: u8) -> [u8; 4] {
    let mut frame = [0x82, 0x01, vcp, 0x00];
    frame[3] = checksum(&frame[..3]);
    frame
}

/// Parsed "get VCP feature" reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcpReply {
    /// Current value, low byte.
    pub current: u8,
    /// Maximum value, low byte.
    pub max: u8,
}

/// Validate a reply buffer for the given VCP code.
///
/// `reply[1]` must carry the feature-reply type (0x02) and `reply[3]` must
/// echo the requested code; anything else is a protocol violation, distinct
/// from a transport failure.
pub fn parse_reply(reply: &[u8], vcp: u8) -> Result<VcpReply, DdcError> {
    if reply.len() < DDC_REPLY_LEN {
        return Err(DdcError::Protocol(format!(
            "reply too short: {} bytes",
            reply.len()
        )));
    }
    if reply[1] != 0x02 {
        return Err(DdcError::Protocol(format!(
            "unexpected reply type 0x{:02x}",
            reply[1]
        )));
    }
    if reply[3] != vcp {
        return Err(DdcError::Protocol(format!(
            "reply for VCP 0x{:02x}, requested 0x{vcp:02x}",
            reply[3]
        )));
    }

    Ok(VcpReply {
        current: reply[9],
        max: reply[7],
    })
}
