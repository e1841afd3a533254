//! Per-class display drivers
//!
//! Both drivers absorb backend failures at this boundary: get degrades to a
//! default, set degrades to a no-op, and either leaves a log line.

use luxd_gamma::GammaEngine;
use luxd_hal::{BacklightService, DisplayId, DisplayInfo};

/// Driver for the built-in panel, backed by the platform backlight service.
///
/// Exactly one panel is tracked for the whole session; the service is
/// resolved once at startup and never re-scanned on hotplug.
pub struct InternalDisplayDriver {
    service: Box<dyn BacklightService>,
}

impl InternalDisplayDriver {
    pub fn new(service: Box<dyn BacklightService>) -> Self {
        Self { service }
    }

    /// Current panel brightness, 0.0 when the service is unavailable.
    pub fn get(&self) -> f64 {
        match self.service.get() {
            Ok(level) => level,
            Err(e) => {
                tracing::debug!("Backlight read failed: {}", e);
                0.0
            }
        }
    }

    pub fn set(&mut self, level: f64) {
        let clamped = level.clamp(0.0, 1.0);
        if let Err(e) = self.service.set(clamped) {
            tracing::warn!("Backlight write failed: {}", e);
        }
    }
}

/// Driver for external monitors, delegating entirely to the gamma engine.
pub struct ExternalDisplayDriver {
    engine: GammaEngine,
}

impl ExternalDisplayDriver {
    pub fn new(engine: GammaEngine) -> Self {
        Self { engine }
    }

    /// Current software brightness; 1.0 for displays never touched.
    pub fn get_brightness(&self, display: DisplayId) -> f64 {
        self.engine.get_brightness(display)
    }

    pub fn set_brightness(&mut self, display: &DisplayInfo, brightness: f64) {
        self.engine.set_brightness(display, brightness);
    }

    /// Flip warm tint, returning the new tint state.
    pub fn toggle_warm_tint(&mut self, display: &DisplayInfo) -> bool {
        self.engine.toggle_warm_tint(display)
    }

    /// Restore the default curve and discard cached state.
    pub fn reset(&mut self, display: &DisplayInfo) {
        self.engine.reset(display);
    }

    /// Forget state for a departed display without touching hardware.
    pub fn forget(&mut self, display: DisplayId) {
        self.engine.forget(display);
    }
}
