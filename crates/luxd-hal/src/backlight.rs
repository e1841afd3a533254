//! Internal panel backlight service
//!
//! The built-in panel is driven through the sysfs backlight class. The
//! capability is behind a trait so the controller can be handed a null
//! implementation when the machine has no panel; callers never crash on a
//! missing service, they just see 0.0 / no-op.

use crate::HalError;
use std::fs;
use std::path::{Path, PathBuf};

/// Platform brightness capability for the internal panel.
///
/// Values are normalized to [0.0, 1.0].
pub trait BacklightService: Send {
    fn get(&self) -> Result<f64, HalError>;
    fn set(&mut self, level: f64) -> Result<(), HalError>;
}

/// Backlight control via `/sys/class/backlight/<dev>`.
pub struct SysfsBacklight {
    path: PathBuf,
    max_brightness: u32,
}

impl SysfsBacklight {
    /// Open a specific backlight device directory.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self, HalError> {
        let path = path.into();
        let max_brightness = fs::read_to_string(path.join("max_brightness"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(255);

        if !path.join("brightness").exists() {
            return Err(HalError::ServiceUnavailable(format!(
                "no brightness control at {}",
                path.display()
            )));
        }

        Ok(Self {
            path,
            max_brightness,
        })
    }

    /// Scan the backlight class for the first controllable device.
    pub fn locate() -> Option<Self> {
        Self::locate_in(Path::new("/sys/class/backlight"))
    }

    fn locate_in(class_dir: &Path) -> Option<Self> {
        let entries = fs::read_dir(class_dir).ok()?;
        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        paths.sort();

        for path in paths {
            if path.join("brightness").exists() {
                tracing::info!("Found backlight at {}", path.display());
                return Self::with_path(path).ok();
            }
        }
        None
    }
}

impl BacklightService for SysfsBacklight {
    fn get(&self) -> Result<f64, HalError> {
        let contents = fs::read_to_string(self.path.join("brightness"))?;
        let raw: u32 = contents
            .trim()
            .parse()
            .map_err(|_| HalError::ServiceUnavailable("unreadable brightness".into()))?;
        Ok(f64::from(raw) / f64::from(self.max_brightness.max(1)))
    }

    fn set(&mut self, level: f64) -> Result<(), HalError> {
        let clamped = level.clamp(0.0, 1.0);
        let raw = (clamped * f64::from(self.max_brightness)).round() as u32;
        fs::write(self.path.join("brightness"), raw.to_string())?;
        tracing::debug!("Backlight set to {:.3} (raw: {})", clamped, raw);
        Ok(())
    }
}

/// Null backlight used when no panel service can be located.
///
/// `get` reports 0.0 and `set` is a no-op, both silently.
pub struct NullBacklight;

impl BacklightService for NullBacklight {
    fn get(&self) -> Result<f64, HalError> {
        Ok(0.0)
    }

    fn set(&mut self, _level: f64) -> Result<(), HalError> {
        Ok(())
    }
}

/// Resolve the panel service once at startup.
pub fn locate_backlight() -> Box<dyn BacklightService> {
    match SysfsBacklight::locate() {
        Some(service) => Box::new(service),
        None => {
            tracing::warn!("No backlight device found, internal panel control disabled");
            Box::new(NullBacklight)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_backlight(root: &Path, name: &str, max: u32, current: u32) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("max_brightness"), max.to_string()).unwrap();
        fs::write(dir.join("brightness"), current.to_string()).unwrap();
        dir
    }

    #[test]
    fn test_sysfs_get_normalized() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = make_backlight(tmp.path(), "intel_backlight", 400, 200);

        let bl = SysfsBacklight::with_path(dir).unwrap();
        assert!((bl.get().unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_sysfs_set_scales_and_clamps() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = make_backlight(tmp.path(), "intel_backlight", 400, 0);

        let mut bl = SysfsBacklight::with_path(dir.clone()).unwrap();
        bl.set(0.25).unwrap();
        assert_eq!(fs::read_to_string(dir.join("brightness")).unwrap(), "100");

        // Out-of-range input saturates
        bl.set(2.0).unwrap();
        assert_eq!(fs::read_to_string(dir.join("brightness")).unwrap(), "400");

        bl.set(-1.0).unwrap();
        assert_eq!(fs::read_to_string(dir.join("brightness")).unwrap(), "0");
    }

    #[test]
    fn test_with_path_requires_brightness_node() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("empty");
        fs::create_dir_all(&dir).unwrap();

        assert!(SysfsBacklight::with_path(dir).is_err());
    }

    #[test]
    fn test_locate_in_picks_first_controllable() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("acpi_video0")).unwrap();
        make_backlight(tmp.path(), "intel_backlight", 255, 128);

        let bl = SysfsBacklight::locate_in(tmp.path()).unwrap();
        assert!((bl.get().unwrap() - 128.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_null_backlight_degrades_silently() {
        let mut bl = NullBacklight;
        assert_eq!(bl.get().unwrap(), 0.0);
        bl.set(0.8).unwrap();
        assert_eq!(bl.get().unwrap(), 0.0);
    }
}
