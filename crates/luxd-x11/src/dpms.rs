//! DPMS power-state polling
//!
//! Monitors blank under DPMS without any hotplug event, and some forget
//! their settings while off. Polling the DPMS power level lets the daemon
//! notice the off-to-on transition and replay brightness.

use x11rb::protocol::dpms::{ConnectionExt as _, DPMSMode};
use x11rb::rust_connection::RustConnection;

pub struct DpmsMonitor {
    conn: RustConnection,
    supported: bool,
}

impl DpmsMonitor {
    /// Connect to the display server named by `DISPLAY`.
    pub fn connect() -> Result<Self, String> {
        let (conn, _) = RustConnection::connect(None).map_err(|e| e.to_string())?;
        let supported = conn
            .dpms_capable()
            .ok()
            .and_then(|c| c.reply().ok())
            .map(|r| r.capable)
            .unwrap_or(false);
        if !supported {
            tracing::info!("DPMS not supported, screen wake detection disabled");
        }
        Ok(Self { conn, supported })
    }

    /// Whether the screens are currently powered on. Reports true when DPMS
    /// is unsupported or disabled, so wake detection degrades to silence
    /// rather than spurious events.
    pub fn screens_on(&self) -> bool {
        if !self.supported {
            return true;
        }
        self.conn
            .dpms_info()
            .ok()
            .and_then(|c| c.reply().ok())
            .map(|info| !info.state || info.power_level == DPMSMode::ON)
            .unwrap_or(true)
    }
}
