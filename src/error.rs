//! Centralized error type for the tactus umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tactus_core::Error),

    #[error("MIDI: {0}")]
    Midi(#[from] tactus_midi::Error),

    #[error("Failed to spawn playback thread: {0}")]
    Spawn(String),
}

pub type Result<T> = std::result::Result<T, Error>;
