//! X11 backends for luxd
//!
//! Concrete implementations of the gamma backend (RandR per-CRTC gamma
//! ramps) and the sub-zero overlay surface provider (override-redirect
//! black windows with an empty input region), plus a DPMS power-state
//! monitor for screen wake detection.

pub mod dpms;
pub mod gamma;
pub mod overlay;

mod output;

pub use dpms::DpmsMonitor;
pub use gamma::X11GammaBackend;
pub use overlay::X11OverlayProvider;
