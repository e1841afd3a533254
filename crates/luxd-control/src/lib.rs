//! Brightness routing and control flow
//!
//! The controller owns one driver per display class (backlight for the
//! built-in panel, gamma for externals), the sub-zero overlay manager and
//! the persistence store, and routes every brightness operation to the
//! right place. The event loop wraps it in an async mpsc consumer fed by
//! hotkeys, hotplug and wake notifications.
//!
//! Nothing in this crate returns an error to its caller. Driver and store
//! failures degrade to benign defaults and a log line; a brightness daemon
//! that crashes on a flaky monitor is worse than one that skips a beat.

pub mod controller;
pub mod drivers;
pub mod events;

pub use controller::{BrightnessController, overlay_opacity};
pub use drivers::{ExternalDisplayDriver, InternalDisplayDriver};
pub use events::{ControlEvent, ControlLoop};
