//! Error types for tactus-core.

use thiserror::Error;

/// Error type for playback engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported timing: resolution {resolution} is SMPTE division, only ticks per quarter note are supported")]
    UnsupportedTiming { resolution: i32 },

    #[error("Invalid tempo ratio: {0}. Must be finite and greater than 0.0")]
    InvalidTempoRatio(f64),

    #[error("Playback loop is already running")]
    AlreadyRunning,
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
