//! Player lifecycle state.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Player lifecycle state.
///
/// The engine only ever drives `Stopped`, `Playing` and `Paused`.
/// `FastForward`, `Rewind` and `Loading` are reserved for transport modes
/// that have no transitions yet; nothing in this crate produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
    FastForward,
    Rewind,
    Loading,
}

impl PlaybackState {
    fn to_u8(self) -> u8 {
        match self {
            PlaybackState::Stopped => 0,
            PlaybackState::Playing => 1,
            PlaybackState::Paused => 2,
            PlaybackState::FastForward => 3,
            PlaybackState::Rewind => 4,
            PlaybackState::Loading => 5,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => PlaybackState::Playing,
            2 => PlaybackState::Paused,
            3 => PlaybackState::FastForward,
            4 => PlaybackState::Rewind,
            5 => PlaybackState::Loading,
            _ => PlaybackState::Stopped,
        }
    }
}

/// `PlaybackState` readable from any thread without blocking.
#[derive(Debug, Default)]
pub(crate) struct AtomicPlaybackState {
    value: AtomicU8,
}

impl AtomicPlaybackState {
    pub(crate) fn new(state: PlaybackState) -> Self {
        Self {
            value: AtomicU8::new(state.to_u8()),
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> PlaybackState {
        PlaybackState::from_u8(self.value.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set(&self, state: PlaybackState) {
        self.value.store(state.to_u8(), Ordering::Release);
    }
}
