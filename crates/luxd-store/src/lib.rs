//! Per-display brightness persistence
//!
//! A flat JSON map in the state directory, keyed `brightness_<id>`. Written
//! on every successful set, read back when a display attaches or after wake.

use luxd_hal::DisplayId;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

const KEY_PREFIX: &str = "brightness_";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub struct BrightnessStore {
    path: PathBuf,
    values: HashMap<String, f64>,
}

impl BrightnessStore {
    /// Open the store at `path`, loading existing state. A missing file is
    /// an empty store; a corrupt file is an error so we never silently
    /// clobber someone's state.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, values })
    }

    fn key(display: DisplayId) -> String {
        format!("{KEY_PREFIX}{display}")
    }

    /// Persist the last-known brightness for `display`.
    pub fn save(&mut self, display: DisplayId, value: f64) -> Result<(), StoreError> {
        let clamped = value.clamp(0.0, 1.0);
        self.values.insert(Self::key(display), clamped);
        self.flush()?;
        let display_id = display;
        tracing::debug!("Saved brightness {:.3} for display {}", clamped, display_id);
        Ok(())
    }

    /// Last persisted brightness for `display`, if any.
    pub fn load(&self, display: DisplayId) -> Option<f64> {
        self.values.get(&Self::key(display)).copied()
    }

    /// Drop the persisted value for `display`.
    pub fn clear(&mut self, display: DisplayId) -> Result<(), StoreError> {
        if self.values.remove(&Self::key(display)).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a crash mid-write never truncates the state
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&self.values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
