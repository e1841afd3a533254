//! Brightness routing controller
//!
//! Classifies each display from the latest enumeration snapshot, routes
//! brightness operations to the matching driver, layers sub-zero overlay
//! dimming below the 1% floor, and persists every value it applies.

use crate::drivers::{ExternalDisplayDriver, InternalDisplayDriver};
use luxd_hal::{DisplayId, DisplayInfo};
use luxd_overlay::OverlayManager;
use luxd_store::BrightnessStore;
use std::collections::{HashMap, HashSet};

/// Brightness below this floor engages the sub-zero overlay.
pub const SUB_ZERO_FLOOR: f64 = 0.01;

/// Overlay opacity for a clamped brightness value.
///
/// Below the floor, the last percent of brightness maps linearly onto the
/// full opacity range; at or above it the overlay is off.
pub fn overlay_opacity(brightness: f64) -> f64 {
    if brightness < SUB_ZERO_FLOOR {
        (1.0 - brightness * 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub struct BrightnessController {
    internal: InternalDisplayDriver,
    external: ExternalDisplayDriver,
    overlays: OverlayManager,
    store: BrightnessStore,
    displays: HashMap<DisplayId, DisplayInfo>,
}

impl BrightnessController {
    pub fn new(
        internal: InternalDisplayDriver,
        external: ExternalDisplayDriver,
        overlays: OverlayManager,
        store: BrightnessStore,
    ) -> Self {
        Self {
            internal,
            external,
            overlays,
            store,
            displays: HashMap::new(),
        }
    }

    /// Set brightness for `display`, clamped to [0.0, 1.0].
    ///
    /// Routes to the backlight or the gamma engine, drives the sub-zero
    /// overlay, then persists the clamped value. Unknown displays are
    /// skipped with a log line.
    pub fn set_brightness(&mut self, display: DisplayId, value: f64) {
        let display_id = display;
        let Some(info) = self.displays.get(&display).cloned() else {
            tracing::warn!("Ignoring brightness for unknown display {}", display_id);
            return;
        };
        let clamped = value.clamp(0.0, 1.0);

        if info.builtin {
            self.internal.set(clamped);
        } else {
            self.external.set_brightness(&info, clamped);
        }
        self.overlays.set_opacity(&info, overlay_opacity(clamped));

        if let Err(e) = self.store.save(display, clamped) {
            tracing::warn!("Display {}: brightness not persisted: {}", display_id, e);
        }
    }

    /// Current brightness, 0.0 for unknown displays or failed drivers.
    pub fn get_brightness(&self, display: DisplayId) -> f64 {
        match self.displays.get(&display) {
            Some(info) if info.builtin => self.internal.get(),
            Some(_) => self.external.get_brightness(display),
            None => 0.0,
        }
    }

    /// Step brightness relative to its current value.
    pub fn adjust_brightness(&mut self, display: DisplayId, delta: f64) {
        let current = self.get_brightness(display);
        self.set_brightness(display, current + delta);
    }

    /// Re-apply the last persisted brightness; a display with no saved
    /// value is left alone.
    pub fn restore_saved_brightness(&mut self, display: DisplayId) {
        let display_id = display;
        match self.store.load(display) {
            Some(value) => {
                tracing::debug!("Display {}: restoring brightness {:.3}", display_id, value);
                self.set_brightness(display, value);
            }
            None => {
                tracing::debug!("Display {}: no saved brightness", display_id);
            }
        }
    }

    /// Re-apply persisted brightness on every known display.
    pub fn restore_all(&mut self) {
        let displays: Vec<DisplayId> = self.displays.keys().copied().collect();
        for display in displays {
            self.restore_saved_brightness(display);
        }
    }

    /// Toggle warm tint. The built-in panel has no tint support, so the
    /// request is logged and dropped there. Returns the new tint state.
    pub fn toggle_warm_tint(&mut self, display: DisplayId) -> bool {
        match self.displays.get(&display).cloned() {
            Some(info) if info.builtin => {
                tracing::info!("Warm tint not supported on the built-in panel");
                false
            }
            Some(info) => self.external.toggle_warm_tint(&info),
            None => {
                let display_id = display;
                tracing::warn!("Ignoring tint toggle for unknown display {}", display_id);
                false
            }
        }
    }

    /// Replace the display snapshot after a hotplug change.
    ///
    /// Departed displays lose their overlay and gamma state; newly attached
    /// ones get their saved brightness restored.
    pub fn update_displays(&mut self, snapshot: Vec<DisplayInfo>) {
        let present: HashSet<DisplayId> = snapshot.iter().map(|d| d.id).collect();

        let departed: Vec<DisplayId> = self
            .displays
            .keys()
            .filter(|id| !present.contains(id))
            .copied()
            .collect();
        for display in departed {
            let display_id = display;
            tracing::info!("Display {} departed", display_id);
            self.overlays.remove(display);
            self.external.forget(display);
        }

        let previous: HashSet<DisplayId> = self.displays.keys().copied().collect();
        self.displays = snapshot.into_iter().map(|d| (d.id, d)).collect();

        let attached: Vec<DisplayId> = present.difference(&previous).copied().collect();
        for display in attached {
            let display_id = display;
            tracing::info!("Display {} attached", display_id);
            self.restore_saved_brightness(display);
        }
    }

    pub fn has_display(&self, display: DisplayId) -> bool {
        self.displays.contains_key(&display)
    }

    pub fn display_ids(&self) -> Vec<DisplayId> {
        self.displays.keys().copied().collect()
    }

    pub fn snapshot(&self) -> Vec<DisplayInfo> {
        self.displays.values().cloned().collect()
    }

    /// Display targeted by events that don't name one: the built-in panel
    /// when present, otherwise the first external by connector order.
    pub fn default_target(&self) -> Option<DisplayId> {
        if let Some(builtin) = self.displays.values().find(|d| d.builtin) {
            return Some(builtin.id);
        }
        self.displays
            .values()
            .min_by(|a, b| a.connector.cmp(&b.connector))
            .map(|d| d.id)
    }

    /// Restore default curves and release every overlay, for shutdown.
    pub fn release_all(&mut self) {
        let externals: Vec<DisplayInfo> = self
            .displays
            .values()
            .filter(|d| !d.builtin)
            .cloned()
            .collect();
        for display in externals {
            self.external.reset(&display);
        }
        self.overlays.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxd_gamma::mock::MockGammaBackend;
    use luxd_gamma::{GammaEngine, channel_maxima};
    use luxd_hal::mock::{MockBacklight, MockHardware};
    use luxd_overlay::mock::MockSurfaceProvider;
    use std::sync::{Arc, RwLock};

    fn builtin(id: DisplayId) -> DisplayInfo {
        DisplayInfo {
            id,
            connector: format!("card0-eDP-{id}"),
            edid: Some(vec![0xE0 | id as u8; 128]),
            builtin: true,
        }
    }

    fn external(id: DisplayId) -> DisplayInfo {
        DisplayInfo {
            id,
            connector: format!("card0-DP-{id}"),
            edid: Some(vec![id as u8; 128]),
            builtin: false,
        }
    }

    struct Harness {
        controller: BrightnessController,
        hardware: Arc<RwLock<MockHardware>>,
        gamma: MockGammaBackend,
        surfaces: MockSurfaceProvider,
        _tmp: tempfile::TempDir,
    }

    fn harness(displays: Vec<DisplayInfo>) -> Harness {
        let hardware = MockHardware::shared();
        let gamma = MockGammaBackend::new();
        let surfaces = MockSurfaceProvider::new();
        let tmp = tempfile::tempdir().unwrap();

        let mut controller = BrightnessController::new(
            InternalDisplayDriver::new(Box::new(MockBacklight::new(hardware.clone()))),
            ExternalDisplayDriver::new(GammaEngine::new(Box::new(gamma.clone()))),
            OverlayManager::new(Box::new(surfaces.clone())),
            BrightnessStore::open(tmp.path().join("state.json")).unwrap(),
        );
        controller.update_displays(displays);

        Harness {
            controller,
            hardware,
            gamma,
            surfaces,
            _tmp: tmp,
        }
    }

    #[test]
    fn test_overlay_opacity_mapping() {
        assert_eq!(overlay_opacity(0.5), 0.0);
        assert_eq!(overlay_opacity(0.01), 0.0);
        assert!((overlay_opacity(0.005) - 0.5).abs() < 1e-9);
        assert_eq!(overlay_opacity(0.0), 1.0);
    }

    #[test]
    fn test_routes_builtin_to_backlight() {
        let mut h = harness(vec![builtin(1), external(2)]);

        h.controller.set_brightness(1, 0.7);
        assert!((h.hardware.read().unwrap().backlight - 0.7).abs() < 1e-9);
        assert!(h.gamma.applied(1).is_none());
        assert!((h.controller.get_brightness(1) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_routes_external_to_gamma() {
        let mut h = harness(vec![builtin(1), external(2)]);

        h.controller.set_brightness(2, 0.4);
        assert_eq!(h.gamma.applied(2).unwrap(), channel_maxima(0.4, false));
        // Backlight untouched
        assert!((h.hardware.read().unwrap().backlight - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_set_clamps() {
        let mut h = harness(vec![external(2)]);

        h.controller.set_brightness(2, 7.0);
        assert_eq!(h.controller.get_brightness(2), 1.0);

        h.controller.set_brightness(2, -1.0);
        assert_eq!(h.controller.get_brightness(2), 0.0);
    }

    #[test]
    fn test_unknown_display_ignored() {
        let mut h = harness(vec![builtin(1)]);

        h.controller.set_brightness(99, 0.5);
        assert_eq!(h.controller.get_brightness(99), 0.0);
        assert!(!h.controller.toggle_warm_tint(99));
    }

    #[test]
    fn test_sub_zero_engages_overlay() {
        let mut h = harness(vec![external(2)]);

        h.controller.set_brightness(2, 0.005);
        assert!((h.controller.get_brightness(2) - 0.005).abs() < 1e-9);
        assert_eq!(h.surfaces.live_count(), 1);

        // Rising back above the floor destroys the surface
        h.controller.set_brightness(2, 0.5);
        assert_eq!(h.surfaces.live_count(), 0);
    }

    #[test]
    fn test_adjust_steps_from_current() {
        let mut h = harness(vec![external(2)]);

        h.controller.set_brightness(2, 0.5);
        h.controller.adjust_brightness(2, 0.05);
        assert!((h.controller.get_brightness(2) - 0.55).abs() < 1e-9);

        h.controller.adjust_brightness(2, -0.6);
        assert_eq!(h.controller.get_brightness(2), 0.0);
    }

    #[test]
    fn test_persist_and_restore() {
        let mut h = harness(vec![external(2)]);

        h.controller.set_brightness(2, 0.35);
        // Re-applying the unchanged persisted value is idempotent
        h.controller.restore_saved_brightness(2);
        assert!((h.controller.get_brightness(2) - 0.35).abs() < 1e-9);
        assert_eq!(h.gamma.applied(2).unwrap(), channel_maxima(0.35, false));
    }

    #[test]
    fn test_restore_without_saved_value_is_noop() {
        let mut h = harness(vec![external(2)]);

        h.controller.restore_saved_brightness(2);
        // External default brightness is 1.0, never overwritten
        assert_eq!(h.controller.get_brightness(2), 1.0);
        assert!(h.gamma.applied(2).is_none());
    }

    #[test]
    fn test_tint_toggle_external_only() {
        let mut h = harness(vec![builtin(1), external(2)]);

        assert!(!h.controller.toggle_warm_tint(1));
        assert!(h.controller.toggle_warm_tint(2));
        assert!(!h.controller.toggle_warm_tint(2));
    }

    #[test]
    fn test_attach_restores_saved_brightness() {
        let mut h = harness(vec![external(2)]);

        h.controller.set_brightness(2, 0.25);
        h.controller.update_displays(vec![]);
        assert!(!h.controller.has_display(2));

        // Reattach picks the persisted value back up
        h.controller.update_displays(vec![external(2)]);
        assert_eq!(h.gamma.applied(2).unwrap(), channel_maxima(0.25, false));
    }

    #[test]
    fn test_departure_drops_overlay_and_gamma_state() {
        let mut h = harness(vec![external(2)]);

        h.controller.set_brightness(2, 0.005);
        assert_eq!(h.surfaces.live_count(), 1);

        h.controller.update_displays(vec![]);
        assert_eq!(h.surfaces.live_count(), 0);
        assert!(!h.controller.toggle_warm_tint(2));
    }

    #[test]
    fn test_default_target_prefers_builtin() {
        let h = harness(vec![external(2), builtin(1)]);
        assert_eq!(h.controller.default_target(), Some(1));

        let h = harness(vec![external(3), external(2)]);
        // DP-2 sorts before DP-3
        assert_eq!(h.controller.default_target(), Some(2));

        let h = harness(vec![]);
        assert_eq!(h.controller.default_target(), None);
    }

    #[test]
    fn test_release_all_resets_externals() {
        let mut h = harness(vec![builtin(1), external(2)]);

        h.controller.set_brightness(2, 0.004);
        h.controller.release_all();

        assert!(h.gamma.restored(2));
        assert_eq!(h.surfaces.live_count(), 0);
    }
}
