//! RandR gamma ramp backend
//!
//! Installs linear per-channel ramps (minimum 0, exponent 1) scaled to the
//! requested channel maxima on the CRTC driving each display.

use crate::output::find_target;
use luxd_gamma::{ChannelMaxima, GammaBackend, GammaError};
use luxd_hal::DisplayInfo;
use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::Window;
use x11rb::rust_connection::RustConnection;

fn xerr(e: impl std::fmt::Display) -> GammaError {
    GammaError::Backend(e.to_string())
}

pub struct X11GammaBackend {
    conn: RustConnection,
    root: Window,
}

impl X11GammaBackend {
    /// Connect to the display server named by `DISPLAY`.
    pub fn connect() -> Result<Self, GammaError> {
        let (conn, screen_num) = RustConnection::connect(None).map_err(xerr)?;
        let root = conn.setup().roots[screen_num].root;
        tracing::debug!("X11 gamma backend connected (screen {})", screen_num);
        Ok(Self { conn, root })
    }

    fn ramp(size: usize, max: f64) -> Vec<u16> {
        let last = (size - 1).max(1) as f64;
        (0..size)
            .map(|i| ((i as f64 / last) * max * 65535.0).round() as u16)
            .collect()
    }
}

impl GammaBackend for X11GammaBackend {
    fn apply(&mut self, display: &DisplayInfo, maxima: ChannelMaxima) -> Result<(), GammaError> {
        let target = find_target(&self.conn, self.root, display).map_err(GammaError::Backend)?;

        let size = self
            .conn
            .randr_get_crtc_gamma_size(target.crtc)
            .map_err(xerr)?
            .reply()
            .map_err(xerr)?
            .size as usize;
        if size == 0 {
            return Err(GammaError::Backend("CRTC has no gamma ramp".into()));
        }

        self.conn
            .randr_set_crtc_gamma(
                target.crtc,
                &Self::ramp(size, maxima.red),
                &Self::ramp(size, maxima.green),
                &Self::ramp(size, maxima.blue),
            )
            .map_err(xerr)?
            .check()
            .map_err(xerr)?;
        self.conn.flush().map_err(xerr)?;
        Ok(())
    }

    fn restore_default(&mut self, display: &DisplayInfo) -> Result<(), GammaError> {
        self.apply(
            display,
            ChannelMaxima {
                red: 1.0,
                green: 1.0,
                blue: 1.0,
            },
        )
    }
}
