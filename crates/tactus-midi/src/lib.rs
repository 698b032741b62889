//! MIDI score model for the Tactus playback engine.
//!
//! Provides the immutable event payloads the engine dispatches, the merged
//! [`Score`] it walks, and a Standard MIDI File reader built on `midly`.

pub mod error;
pub use error::{Error, Result};

pub mod event;
pub use event::{
    cc, ChannelMessage, ChannelVoice, Event, MetaEvent, MetaKind, TimedEvent, CHANNEL_COUNT,
    DEFAULT_TEMPO,
};

mod score;
pub use score::Score;
