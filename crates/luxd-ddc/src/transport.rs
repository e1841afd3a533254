//! DDC read/write transactions
//!
//! One transaction per call, no retries: a failed transmit surfaces as
//! `Transport`, a malformed reply as `Protocol`, and the routing layer
//! treats either as "hardware channel unusable".

use crate::frame::{
    DDC_CHIP_ADDRESS, DDC_DATA_ADDRESS, DDC_REPLY_LEN, VCP_BRIGHTNESS, VcpReply, parse_reply,
    read_request, write_request,
};
use crate::resolver::ChannelResolver;
use crate::DdcError;
use luxd_hal::{ChannelSource, DisplayInfo};
use std::thread;
use std::time::Duration;

/// Fixed wait between the read request and the reply fetch. DDC/CI devices
/// stage the reply asynchronously and are not required to answer sooner;
/// this blocks the control sequence for its full duration by design.
pub const SETTLE_DELAY: Duration = Duration::from_millis(40);

pub struct DdcTransport {
    resolver: ChannelResolver,
}

impl DdcTransport {
    pub fn new(source: Box<dyn ChannelSource>) -> Self {
        Self {
            resolver: ChannelResolver::new(source),
        }
    }

    pub fn resolver_mut(&mut self) -> &mut ChannelResolver {
        &mut self.resolver
    }

    /// Read the brightness register of `display`.
    pub fn read_brightness(&mut self, display: &DisplayInfo) -> Result<VcpReply, DdcError> {
        let bus = self
            .resolver
            .resolve(display.id, display.edid.as_deref())?;

        let request = read_request(VCP_BRIGHTNESS);
        bus.write(DDC_CHIP_ADDRESS, DDC_DATA_ADDRESS, &request)?;

        thread::sleep(SETTLE_DELAY);

        let mut reply = [0u8; DDC_REPLY_LEN];
        bus.read(DDC_CHIP_ADDRESS, &mut reply)?;

        let parsed = parse_reply(&reply, VCP_BRIGHTNESS)?;
        let display_id = display.id;
        tracing::debug!(
            "Display {}: brightness register = {} (max {})",
            display_id,
            parsed.current,
            parsed.max
        );
        Ok(parsed)
    }

    /// Write the brightness register of `display`.
    pub fn write_brightness(&mut self, display: &DisplayInfo, value: u8) -> Result<(), DdcError> {
        let bus = self
            .resolver
            .resolve(display.id, display.edid.as_deref())?;

        let frame = write_request(VCP_BRIGHTNESS, value);
        bus.write(DDC_CHIP_ADDRESS, DDC_DATA_ADDRESS, &frame)?;

        let display_id = display.id;
        tracing::debug!("Display {}: brightness register <- {}", display_id, value);
        Ok(())
    }
}
