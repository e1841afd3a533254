//! In-memory gamma backend for tests

use crate::engine::{ChannelMaxima, GammaBackend};
use crate::GammaError;
use luxd_hal::{DisplayId, DisplayInfo};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct MockGammaState {
    applied: HashMap<DisplayId, ChannelMaxima>,
    restored: HashSet<DisplayId>,
    fail_next: bool,
}

/// Records applied ramps instead of touching hardware. Cloning shares state
/// so tests can keep a handle while the engine owns the backend.
#[derive(Clone)]
pub struct MockGammaBackend {
    state: Arc<RwLock<MockGammaState>>,
}

impl MockGammaBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockGammaState::default())),
        }
    }

    /// Last maxima applied to `display`, if any.
    pub fn applied(&self, display: DisplayId) -> Option<ChannelMaxima> {
        self.state.read().ok()?.applied.get(&display).copied()
    }

    /// Whether `display` had its default curve restored.
    pub fn restored(&self, display: DisplayId) -> bool {
        self.state
            .read()
            .map(|s| s.restored.contains(&display))
            .unwrap_or(false)
    }

    /// Make the next apply call fail.
    pub fn fail_next(&self) {
        if let Ok(mut s) = self.state.write() {
            s.fail_next = true;
        }
    }
}

impl Default for MockGammaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GammaBackend for MockGammaBackend {
    fn apply(&mut self, display: &DisplayInfo, maxima: ChannelMaxima) -> Result<(), GammaError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| GammaError::Backend("mock state poisoned".into()))?;

        if state.fail_next {
            state.fail_next = false;
            return Err(GammaError::Backend("injected failure".into()));
        }

        state.applied.insert(display.id, maxima);
        Ok(())
    }

    fn restore_default(&mut self, display: &DisplayInfo) -> Result<(), GammaError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| GammaError::Backend("mock state poisoned".into()))?;
        state.applied.remove(&display.id);
        state.restored.insert(display.id);
        Ok(())
    }
}
