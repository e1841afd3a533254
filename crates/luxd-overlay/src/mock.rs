//! In-memory surface provider for tests

use crate::{OverlayError, OverlaySurface, SurfaceProvider};
use luxd_hal::DisplayInfo;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct MockProviderState {
    created: AtomicUsize,
    live: AtomicUsize,
    fail_next: AtomicBool,
}

/// Counts surface lifetimes. Cloning shares state so tests can keep a handle
/// while the manager owns the provider.
#[derive(Clone)]
pub struct MockSurfaceProvider {
    state: Arc<MockProviderState>,
}

impl MockSurfaceProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockProviderState::default()),
        }
    }

    /// Surfaces created so far.
    pub fn created_count(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }

    /// Surfaces currently alive (created and not yet dropped).
    pub fn live_count(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    /// Make the next create call fail.
    pub fn fail_next(&self) {
        self.state.fail_next.store(true, Ordering::SeqCst);
    }
}

impl Default for MockSurfaceProvider {
    fn default() -> Self {
        Self::new()
    }
}

struct MockSurface {
    opacity: f64,
    state: Arc<MockProviderState>,
}

impl OverlaySurface for MockSurface {
    fn set_opacity(&mut self, opacity: f64) -> Result<(), OverlayError> {
        self.opacity = opacity;
        Ok(())
    }

    fn opacity(&self) -> f64 {
        self.opacity
    }
}

impl Drop for MockSurface {
    fn drop(&mut self) {
        self.state.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SurfaceProvider for MockSurfaceProvider {
    fn create(
        &mut self,
        _display: &DisplayInfo,
        opacity: f64,
    ) -> Result<Box<dyn OverlaySurface>, OverlayError> {
        if self.state.fail_next.swap(false, Ordering::SeqCst) {
            return Err(OverlayError::Provider("injected failure".into()));
        }

        self.state.created.fetch_add(1, Ordering::SeqCst);
        self.state.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSurface {
            opacity,
            state: Arc::clone(&self.state),
        }))
    }
}
