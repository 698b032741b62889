//! Builder for configuring and constructing an `AsyncPlayer`.

use crate::{AsyncPlayer, Result};
use std::sync::Arc;
use tactus_core::{EventSink, PlayerConfig, SyncPlayer};
use tactus_midi::Score;

/// A score is required; everything else falls back to [`PlayerConfig::default`].
///
/// # Example
///
/// ```ignore
/// use tactus::prelude::*;
///
/// let player = AsyncPlayer::builder()
///     .score(Score::load("song.mid")?)
///     .tempo_ratio(1.5)
///     .mute_on_stop(false)
///     .build()?;
/// ```
#[derive(Default)]
pub struct PlayerBuilder {
    score: Option<Arc<Score>>,
    config: PlayerConfig,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl PlayerBuilder {
    pub fn score(mut self, score: impl Into<Arc<Score>>) -> Self {
        self.score = Some(score.into());
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 16
    pub fn channels(mut self, channels: u8) -> Self {
        self.config.channels = channels;
        self
    }

    /// Default: 1.0
    pub fn tempo_ratio(mut self, ratio: f64) -> Self {
        self.config.tempo_ratio = ratio;
        self
    }

    /// Default: true
    pub fn reset_controllers_on_start(mut self, enabled: bool) -> Self {
        self.config.reset_controllers_on_start = enabled;
        self
    }

    /// Default: true
    pub fn mute_on_stop(mut self, enabled: bool) -> Self {
        self.config.mute_on_stop = enabled;
        self
    }

    /// Default: true
    pub fn interruptible_delays(mut self, enabled: bool) -> Self {
        self.config.interruptible_delays = enabled;
        self
    }

    /// Default: true
    pub fn forward_meta_events(mut self, enabled: bool) -> Self {
        self.config.forward_meta_events = enabled;
        self
    }

    /// Register a sink before the player exists.
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Build the bare engine without a playback thread.
    pub fn build_sync(self) -> Result<SyncPlayer> {
        let score = self.score.ok_or_else(|| {
            tactus_core::Error::InvalidArgument("a score is required to build a player".into())
        })?;

        let engine = SyncPlayer::new(score, self.config)?;
        for sink in self.sinks {
            engine.add_sink(sink);
        }
        Ok(engine)
    }

    pub fn build(self) -> Result<AsyncPlayer> {
        Ok(AsyncPlayer::from_engine(self.build_sync()?))
    }
}
