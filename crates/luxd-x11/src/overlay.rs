//! Overlay surface provider
//!
//! Each surface is a black override-redirect window covering one display,
//! dimming it through the compositor's `_NET_WM_WINDOW_OPACITY` hint. The
//! window carries an empty XFixes input region so clicks pass through.

use crate::output::find_target;
use luxd_hal::DisplayInfo;
use luxd_overlay::{OverlayError, OverlaySurface, SurfaceProvider};
use std::sync::Arc;
use x11rb::connection::Connection;
use x11rb::protocol::xfixes::ConnectionExt as _;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ConfigureWindowAux, ConnectionExt as _, CreateWindowAux, PropMode, StackMode,
    Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

fn xerr(e: impl std::fmt::Display) -> OverlayError {
    OverlayError::Provider(e.to_string())
}

fn opacity_cardinal(opacity: f64) -> u32 {
    (opacity.clamp(0.0, 1.0) * u32::MAX as f64) as u32
}

pub struct X11OverlayProvider {
    conn: Arc<RustConnection>,
    root: Window,
    black_pixel: u32,
    opacity_atom: Atom,
}

impl X11OverlayProvider {
    /// Connect to the display server named by `DISPLAY`.
    pub fn connect() -> Result<Self, OverlayError> {
        let (conn, screen_num) = RustConnection::connect(None).map_err(xerr)?;
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let black_pixel = screen.black_pixel;

        // Negotiate XFixes before any region request
        conn.xfixes_query_version(5, 0)
            .map_err(xerr)?
            .reply()
            .map_err(xerr)?;

        let opacity_atom = conn
            .intern_atom(false, b"_NET_WM_WINDOW_OPACITY")
            .map_err(xerr)?
            .reply()
            .map_err(xerr)?
            .atom;

        tracing::debug!("X11 overlay provider connected (screen {})", screen_num);
        Ok(Self {
            conn: Arc::new(conn),
            root,
            black_pixel,
            opacity_atom,
        })
    }

    fn set_window_opacity(&self, win: Window, opacity: f64) -> Result<(), OverlayError> {
        self.conn
            .change_property32(
                PropMode::REPLACE,
                win,
                self.opacity_atom,
                AtomEnum::CARDINAL,
                &[opacity_cardinal(opacity)],
            )
            .map_err(xerr)?;
        Ok(())
    }
}

impl SurfaceProvider for X11OverlayProvider {
    fn create(
        &mut self,
        display: &DisplayInfo,
        opacity: f64,
    ) -> Result<Box<dyn OverlaySurface>, OverlayError> {
        let target =
            find_target(&self.conn, self.root, display).map_err(OverlayError::Provider)?;

        let win = self.conn.generate_id().map_err(xerr)?;
        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                win,
                self.root,
                target.x,
                target.y,
                target.width,
                target.height,
                0,
                WindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &CreateWindowAux::new()
                    .background_pixel(self.black_pixel)
                    .override_redirect(1),
            )
            .map_err(xerr)?;

        self.set_window_opacity(win, opacity)?;

        // Empty input region so the overlay never swallows clicks
        let region = self.conn.generate_id().map_err(xerr)?;
        self.conn.xfixes_create_region(region, &[]).map_err(xerr)?;
        self.conn
            .xfixes_set_window_shape_region(
                win,
                x11rb::protocol::shape::SK::INPUT,
                0,
                0,
                region,
            )
            .map_err(xerr)?;
        self.conn.xfixes_destroy_region(region).map_err(xerr)?;

        self.conn
            .configure_window(win, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
            .map_err(xerr)?;
        self.conn.map_window(win).map_err(xerr)?;
        self.conn.flush().map_err(xerr)?;

        let display_id = display.id;
        tracing::debug!(
            "Overlay window created for display {} at opacity {:.3}",
            display_id,
            opacity
        );

        Ok(Box::new(X11OverlaySurface {
            conn: Arc::clone(&self.conn),
            opacity_atom: self.opacity_atom,
            win,
            opacity,
        }))
    }
}

struct X11OverlaySurface {
    conn: Arc<RustConnection>,
    opacity_atom: Atom,
    win: Window,
    opacity: f64,
}

impl OverlaySurface for X11OverlaySurface {
    fn set_opacity(&mut self, opacity: f64) -> Result<(), OverlayError> {
        self.conn
            .change_property32(
                PropMode::REPLACE,
                self.win,
                self.opacity_atom,
                AtomEnum::CARDINAL,
                &[opacity_cardinal(opacity)],
            )
            .map_err(xerr)?;
        self.conn.flush().map_err(xerr)?;
        self.opacity = opacity;
        Ok(())
    }

    fn opacity(&self) -> f64 {
        self.opacity
    }
}

impl Drop for X11OverlaySurface {
    fn drop(&mut self) {
        let _ = self.conn.destroy_window(self.win);
        let _ = self.conn.flush();
    }
}
