//! # Tactus - MIDI Score Playback
//!
//! Plays a time-ordered MIDI score against the wall clock and forwards each
//! event to registered sinks, with play/pause/stop control from any thread.
//!
//! ## Architecture
//!
//! Tactus is an umbrella crate that coordinates:
//! - **tactus-midi** - Score model (events, SMF loading, track merging)
//! - **tactus-core** - Playback kernel (tempo tracking, control gate, dispatch loop)
//!
//! and adds [`AsyncPlayer`], which runs the dispatch loop on its own thread.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tactus::prelude::*;
//!
//! let player = AsyncPlayer::builder()
//!     .score(Score::load("song.mid")?)
//!     .build()?;
//!
//! player.on_event(|event| {
//!     if let Some(msg) = event.as_channel() {
//!         send_to_device(&msg.to_bytes());
//!     }
//! });
//!
//! player.play()?;
//! player.pause();
//! player.play()?; // resumes where it paused
//! player.stop();
//! ```

/// Re-export of tactus-core for direct access
pub use tactus_core as core;

/// Re-export of tactus-midi for direct access
pub use tactus_midi as midi;

pub use tactus_core::{
    Completion, Dispatch, EventSink, PassSummary, PlaybackState, PlayerConfig, SyncPlayer,
    TempoTracker, TimeSignature,
};
pub use tactus_midi::{ChannelMessage, ChannelVoice, Event, MetaEvent, MetaKind, Score, TimedEvent};

mod error;
pub use error::{Error, Result};

mod builder;
pub use builder::PlayerBuilder;

mod player;
pub use player::{AsyncPlayer, PlayerNotification, PLAYBACK_THREAD_NAME};

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        AsyncPlayer, Error, Event, EventSink, PassSummary, PlaybackState, PlayerBuilder,
        PlayerConfig, PlayerNotification, Result, Score, SyncPlayer, TimedEvent,
    };
}
