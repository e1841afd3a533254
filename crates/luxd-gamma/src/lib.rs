//! Software gamma brightness engine
//!
//! Brightness for displays without a usable hardware path is expressed as
//! the maximum of each channel's transfer curve: curve minimum fixed at 0.0,
//! gamma exponent fixed at 1.0 (a linear ramp). Warm tint multiplies the
//! channel maxima by fixed factors; the red channel is never attenuated, so
//! its maximum always reflects base brightness.

pub mod engine;
pub mod mock;

pub use engine::{
    ChannelMaxima, GammaBackend, GammaEngine, WARM_TINT_BLUE, WARM_TINT_GREEN, WARM_TINT_RED,
    channel_maxima,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GammaError {
    #[error("gamma backend failure: {0}")]
    Backend(String),
}

/// Gamma Result type
pub type Result<T> = std::result::Result<T, GammaError>;
