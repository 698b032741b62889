//! Player configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tactus_midi::CHANNEL_COUNT;

/// Configuration for a [`SyncPlayer`](crate::SyncPlayer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Number of channels that receive reset and mute broadcasts.
    pub channels: u8,
    /// Send Reset All Controllers on every channel when a pass starts.
    pub reset_controllers_on_start: bool,
    /// Send All Sound Off on every channel when a pass ends.
    pub mute_on_stop: bool,
    /// Let `stop` cut a pending inter-event delay short.
    pub interruptible_delays: bool,
    /// Forward every meta event to sinks. When off, only tempo meta events
    /// are forwarded; the rest still update the tracker.
    pub forward_meta_events: bool,
    /// Initial tempo ratio. 2.0 plays twice as fast.
    pub tempo_ratio: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            channels: CHANNEL_COUNT,
            reset_controllers_on_start: true,
            mute_on_stop: true,
            interruptible_delays: true,
            forward_meta_events: true,
            tempo_ratio: 1.0,
        }
    }
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 || self.channels > CHANNEL_COUNT {
            return Err(Error::InvalidArgument(format!(
                "channels {} out of range (1-{})",
                self.channels, CHANNEL_COUNT
            )));
        }
        if !self.tempo_ratio.is_finite() || self.tempo_ratio <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "tempo_ratio {} must be finite and positive",
                self.tempo_ratio
            )));
        }
        Ok(())
    }
}
