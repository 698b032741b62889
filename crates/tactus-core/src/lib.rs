//! Playback kernel: tempo tracking, control gate and the dispatch loop.
//!
//! # Primary API
//!
//! - [`SyncPlayer`]: Synchronous engine; [`run`](SyncPlayer::run) owns the calling thread
//! - [`TempoTracker`] / [`delta_to_millis`]: Tick → wall-clock conversion
//! - [`Gate`] / [`ControlSignal`]: Cross-thread play/pause/stop signalling
//! - [`EventSink`]: Observer for dispatched events
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tactus_core::{PlayerConfig, SyncPlayer};
//! use tactus_midi::Score;
//!
//! let player = SyncPlayer::new(Arc::new(Score::load("song.mid")?), PlayerConfig::default())?;
//! player.on_event(|event| println!("{event:?}"));
//!
//! player.play();
//! player.run()?;
//! ```

pub mod error;
pub use error::{Error, Result};

mod config;
pub use config::PlayerConfig;

pub(crate) mod lockfree;
pub use lockfree::{AtomicDouble, AtomicFlag};

pub mod control;
pub use control::{ControlSignal, Gate};

mod state;
pub use state::PlaybackState;

pub mod tempo;
pub use tempo::{delta_to_millis, tempo_to_bpm, TempoTracker, TimeSignature};

mod observer;
pub use observer::{ErrorCallback, EventSink, FinishedCallback, PassSummary};

mod player;
pub use player::{Completion, Dispatch, SyncPlayer};
