//! Sub-zero dimming overlays
//!
//! When requested brightness drops below the hardware floor, the controller
//! layers a darkening overlay on top: a full-screen, click-through, topmost
//! black surface whose opacity this manager drives. The surface exists only
//! while its opacity is above zero and is destroyed the instant it reaches
//! zero; at most one surface exists per display.

pub mod mock;

use luxd_hal::{DisplayId, DisplayInfo};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("surface provider failure: {0}")]
    Provider(String),
}

/// A live darkening surface. Dropping it releases the surface.
pub trait OverlaySurface: Send {
    fn set_opacity(&mut self, opacity: f64) -> Result<(), OverlayError>;
    fn opacity(&self) -> f64;
}

/// Creates overlay surfaces covering a display's geometry.
pub trait SurfaceProvider: Send {
    fn create(
        &mut self,
        display: &DisplayInfo,
        opacity: f64,
    ) -> Result<Box<dyn OverlaySurface>, OverlayError>;
}

pub struct OverlayManager {
    provider: Box<dyn SurfaceProvider>,
    overlays: HashMap<DisplayId, Box<dyn OverlaySurface>>,
}

impl OverlayManager {
    pub fn new(provider: Box<dyn SurfaceProvider>) -> Self {
        Self {
            provider,
            overlays: HashMap::new(),
        }
    }

    /// Drive the overlay for `display` to `opacity` (clamped to [0, 1]).
    ///
    /// Opacity above zero creates the surface if absent or updates it;
    /// exactly zero destroys it. Provider failures are absorbed and logged.
    pub fn set_opacity(&mut self, display: &DisplayInfo, opacity: f64) {
        let clamped = opacity.clamp(0.0, 1.0);
        let display_id = display.id;

        if clamped > 0.0 {
            if let Some(surface) = self.overlays.get_mut(&display.id) {
                if let Err(e) = surface.set_opacity(clamped) {
                    tracing::warn!("Display {}: overlay update failed: {}", display_id, e);
                }
                return;
            }

            match self.provider.create(display, clamped) {
                Ok(surface) => {
                    tracing::debug!(
                        "Display {}: created sub-zero overlay at {:.2}",
                        display_id,
                        clamped
                    );
                    self.overlays.insert(display.id, surface);
                }
                Err(e) => {
                    tracing::warn!("Display {}: overlay creation failed: {}", display_id, e);
                }
            }
        } else if self.overlays.remove(&display.id).is_some() {
            tracing::debug!("Display {}: removed sub-zero overlay", display_id);
        }
    }

    pub fn has_overlay(&self, display: DisplayId) -> bool {
        self.overlays.contains_key(&display)
    }

    pub fn opacity(&self, display: DisplayId) -> Option<f64> {
        self.overlays.get(&display).map(|s| s.opacity())
    }

    /// Release the overlay of a departed display, if any.
    pub fn remove(&mut self, display: DisplayId) {
        self.overlays.remove(&display);
    }

    /// Release every overlay surface.
    pub fn cleanup(&mut self) {
        self.overlays.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSurfaceProvider;

    fn external(id: DisplayId) -> DisplayInfo {
        DisplayInfo {
            id,
            connector: format!("card0-DP-{id}"),
            edid: None,
            builtin: false,
        }
    }

    fn manager() -> (OverlayManager, MockSurfaceProvider) {
        let provider = MockSurfaceProvider::new();
        (OverlayManager::new(Box::new(provider.clone())), provider)
    }

    #[test]
    fn test_overlay_created_on_nonzero_opacity() {
        let (mut mgr, provider) = manager();
        let d = external(1);

        mgr.set_opacity(&d, 0.5);
        assert!(mgr.has_overlay(1));
        assert_eq!(mgr.opacity(1), Some(0.5));
        assert_eq!(provider.created_count(), 1);
    }

    #[test]
    fn test_overlay_updated_not_recreated() {
        let (mut mgr, provider) = manager();
        let d = external(1);

        mgr.set_opacity(&d, 0.3);
        mgr.set_opacity(&d, 0.8);

        assert_eq!(mgr.opacity(1), Some(0.8));
        // Invariant: one surface per display
        assert_eq!(provider.created_count(), 1);
        assert_eq!(provider.live_count(), 1);
    }

    #[test]
    fn test_overlay_destroyed_at_zero() {
        let (mut mgr, provider) = manager();
        let d = external(1);

        mgr.set_opacity(&d, 0.4);
        mgr.set_opacity(&d, 0.0);

        assert!(!mgr.has_overlay(1));
        assert_eq!(provider.live_count(), 0);
    }

    #[test]
    fn test_zero_opacity_without_overlay_is_noop() {
        let (mut mgr, provider) = manager();
        mgr.set_opacity(&external(1), 0.0);

        assert!(!mgr.has_overlay(1));
        assert_eq!(provider.created_count(), 0);
    }

    #[test]
    fn test_opacity_clamped() {
        let (mut mgr, _provider) = manager();
        let d = external(1);

        mgr.set_opacity(&d, 4.2);
        assert_eq!(mgr.opacity(1), Some(1.0));

        // Negative opacity behaves like zero
        mgr.set_opacity(&d, -1.0);
        assert!(!mgr.has_overlay(1));
    }

    #[test]
    fn test_provider_failure_absorbed() {
        let (mut mgr, provider) = manager();
        provider.fail_next();

        mgr.set_opacity(&external(1), 0.5);
        assert!(!mgr.has_overlay(1));
    }

    #[test]
    fn test_cleanup_releases_all() {
        let (mut mgr, provider) = manager();
        mgr.set_opacity(&external(1), 0.5);
        mgr.set_opacity(&external(2), 0.7);
        assert_eq!(provider.live_count(), 2);

        mgr.cleanup();
        assert_eq!(provider.live_count(), 0);
        assert!(!mgr.has_overlay(1));
        assert!(!mgr.has_overlay(2));
    }

    #[test]
    fn test_remove_departed_display() {
        let (mut mgr, provider) = manager();
        mgr.set_opacity(&external(1), 0.5);

        mgr.remove(1);
        assert!(!mgr.has_overlay(1));
        assert_eq!(provider.live_count(), 0);
    }
}
