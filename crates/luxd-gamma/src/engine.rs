//! Per-display gamma state and tint decomposition

use crate::GammaError;
use luxd_hal::{DisplayId, DisplayInfo};
use std::collections::HashMap;

/// Warm tint channel multipliers: a static color-temperature approximation,
/// not a calibrated value. Red stays at 100% so it keeps reflecting base
/// brightness regardless of tint state.
pub const WARM_TINT_RED: f64 = 1.0;
pub const WARM_TINT_GREEN: f64 = 0.75;
pub const WARM_TINT_BLUE: f64 = 0.5;

/// Transfer-curve maxima for one display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMaxima {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

/// Decompose a brightness value into channel maxima under a tint state.
pub fn channel_maxima(brightness: f64, warm_tint: bool) -> ChannelMaxima {
    let brightness = brightness.clamp(0.0, 1.0);
    if warm_tint {
        ChannelMaxima {
            red: brightness * WARM_TINT_RED,
            green: brightness * WARM_TINT_GREEN,
            blue: brightness * WARM_TINT_BLUE,
        }
    } else {
        ChannelMaxima {
            red: brightness,
            green: brightness,
            blue: brightness,
        }
    }
}

/// Applies transfer curves to the actual display hardware.
pub trait GammaBackend: Send {
    /// Install a linear ramp from 0.0 to each channel's maximum.
    fn apply(&mut self, display: &DisplayInfo, maxima: ChannelMaxima) -> Result<(), GammaError>;

    /// Restore the platform's default color curve.
    fn restore_default(&mut self, display: &DisplayInfo) -> Result<(), GammaError>;
}

#[derive(Debug, Clone, Copy)]
struct GammaState {
    brightness: f64,
    warm_tint: bool,
}

pub struct GammaEngine {
    backend: Box<dyn GammaBackend>,
    states: HashMap<DisplayId, GammaState>,
}

impl GammaEngine {
    pub fn new(backend: Box<dyn GammaBackend>) -> Self {
        Self {
            backend,
            states: HashMap::new(),
        }
    }

    /// Set software brightness for `display`, preserving its tint state.
    ///
    /// Backend failures are absorbed: the cached state is left untouched and
    /// the caller sees a no-op.
    pub fn set_brightness(&mut self, display: &DisplayInfo, brightness: f64) {
        let clamped = brightness.clamp(0.0, 1.0);
        let warm_tint = self
            .states
            .get(&display.id)
            .map(|s| s.warm_tint)
            .unwrap_or(false);

        let maxima = channel_maxima(clamped, warm_tint);
        let display_id = display.id;
        match self.backend.apply(display, maxima) {
            Ok(()) => {
                tracing::debug!(
                    "Display {}: gamma brightness {:.3} rgb=({:.3}, {:.3}, {:.3})",
                    display_id,
                    clamped,
                    maxima.red,
                    maxima.green,
                    maxima.blue
                );
                self.states.insert(
                    display.id,
                    GammaState {
                        brightness: clamped,
                        warm_tint,
                    },
                );
            }
            Err(e) => {
                tracing::warn!("Display {}: gamma apply failed: {}", display_id, e);
            }
        }
    }

    /// Current software brightness; 1.0 for displays never touched.
    ///
    /// This is the red channel maximum, which tint never attenuates.
    pub fn get_brightness(&self, display: DisplayId) -> f64 {
        self.states.get(&display).map(|s| s.brightness).unwrap_or(1.0)
    }

    /// Flip warm tint and immediately re-apply the current brightness under
    /// the new tint state. The brightness value itself is unchanged, only
    /// its RGB decomposition. Returns the new tint state.
    pub fn toggle_warm_tint(&mut self, display: &DisplayInfo) -> bool {
        let state = self.states.get(&display.id).copied().unwrap_or(GammaState {
            brightness: 1.0,
            warm_tint: false,
        });
        let new_tint = !state.warm_tint;

        self.states.insert(
            display.id,
            GammaState {
                brightness: state.brightness,
                warm_tint: new_tint,
            },
        );
        let display_id = display.id;
        tracing::info!(
            "Display {}: warm tint {}",
            display_id,
            if new_tint { "on" } else { "off" }
        );

        self.set_brightness(display, state.brightness);
        new_tint
    }

    pub fn is_warm_tint(&self, display: DisplayId) -> bool {
        self.states
            .get(&display)
            .map(|s| s.warm_tint)
            .unwrap_or(false)
    }

    /// Restore the default curve and discard cached state.
    ///
    /// Does not restore per-display brightness; replaying persisted values
    /// is the controller's job.
    pub fn reset(&mut self, display: &DisplayInfo) {
        if let Err(e) = self.backend.restore_default(display) {
            let display_id = display.id;
            tracing::warn!("Display {}: gamma restore failed: {}", display_id, e);
        }
        self.states.remove(&display.id);
    }

    /// Forget state for a departed display without touching hardware.
    pub fn forget(&mut self, display: DisplayId) {
        self.states.remove(&display);
    }

    pub fn tracked(&self, display: DisplayId) -> bool {
        self.states.contains_key(&display)
    }
}
