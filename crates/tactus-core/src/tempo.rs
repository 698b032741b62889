//! Tempo tracking and tick → wall-clock conversion.
//!
//! Delays are derived from the tempo in effect when the event is reached:
//!
//! ```text
//! ms = tempo_us_per_quarter * delta_ticks / (1000 * ticks_per_quarter * ratio)
//! ```

use crate::error::{Error, Result};
use crate::lockfree::AtomicDouble;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tactus_midi::{MetaEvent, MetaKind, Score, DEFAULT_TEMPO};
use tracing::{debug, warn};

/// Convert a tick delta to milliseconds.
///
/// Fails with [`Error::UnsupportedTiming`] for SMPTE (negative) resolution.
pub fn delta_to_millis(tempo: u32, delta: u32, resolution: i32, ratio: f64) -> Result<f64> {
    if resolution < 0 {
        return Err(Error::UnsupportedTiming { resolution });
    }
    if resolution == 0 {
        return Err(Error::InvalidArgument(
            "tick resolution must be non-zero".into(),
        ));
    }

    Ok(f64::from(tempo) * f64::from(delta) / (1000.0 * f64::from(resolution) * ratio))
}

/// Beats per minute for a tempo in microseconds per quarter note.
#[inline]
pub fn tempo_to_bpm(tempo: u32) -> f64 {
    60.0 / f64::from(tempo) * 1_000_000.0
}

/// Typed view over the four time-signature bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u32,
    pub clocks_per_click: u8,
    pub thirty_seconds_per_quarter: u8,
}

impl TimeSignature {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            numerator: bytes[0],
            // Stored as a power of two
            denominator: 1u32.checked_shl(u32::from(bytes[1])).unwrap_or(0),
            clocks_per_click: bytes[2],
            thirty_seconds_per_quarter: bytes[3],
        }
    }
}

/// Current tempo, time signature and user tempo ratio.
///
/// Written by the playback thread (tempo, time signature) or any controller
/// (ratio); read from anywhere. Readers may see slightly stale values.
#[derive(Debug)]
pub struct TempoTracker {
    tempo: AtomicU32,
    time_signature: AtomicU32,
    ratio: AtomicDouble,
}

impl TempoTracker {
    pub fn new() -> Self {
        Self {
            tempo: AtomicU32::new(DEFAULT_TEMPO),
            time_signature: AtomicU32::new(0),
            ratio: AtomicDouble::new(1.0),
        }
    }

    /// Microseconds per quarter note.
    #[inline]
    pub fn tempo(&self) -> u32 {
        self.tempo.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_tempo(&self, micros_per_quarter: u32) {
        self.tempo.store(micros_per_quarter, Ordering::Release);
    }

    #[inline]
    pub fn bpm(&self) -> f64 {
        tempo_to_bpm(self.tempo())
    }

    /// Raw time-signature bytes; all zero until a time-signature event is seen.
    #[inline]
    pub fn time_signature(&self) -> [u8; 4] {
        self.time_signature.load(Ordering::Acquire).to_be_bytes()
    }

    /// Copies at most four bytes. Shorter payloads are zero-filled.
    pub fn set_time_signature(&self, bytes: &[u8]) {
        let mut packed = [0u8; 4];
        let len = bytes.len().min(4);
        packed[..len].copy_from_slice(&bytes[..len]);
        self.time_signature
            .store(u32::from_be_bytes(packed), Ordering::Release);
    }

    #[inline]
    pub fn tempo_ratio(&self) -> f64 {
        self.ratio.get()
    }

    /// Takes effect on the next delay computation.
    pub fn set_tempo_ratio(&self, ratio: f64) -> Result<()> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(Error::InvalidTempoRatio(ratio));
        }
        self.ratio.set(ratio);
        Ok(())
    }

    /// Apply a tempo or time-signature meta event. Returns whether state changed.
    pub fn observe(&self, meta: &MetaEvent) -> bool {
        match meta.kind() {
            MetaKind::Tempo => match meta.tempo() {
                Some(tempo) if tempo > 0 => {
                    debug!("Tempo change: {} us/qn ({} BPM)", tempo, tempo_to_bpm(tempo));
                    self.set_tempo(tempo);
                    true
                }
                _ => {
                    warn!("Ignoring malformed tempo event: {:?}", meta.data());
                    false
                }
            },
            MetaKind::TimeSignature => {
                if meta.data().len() < 4 {
                    warn!(
                        "Short time signature payload ({} bytes), zero-filling",
                        meta.data().len()
                    );
                }
                self.set_time_signature(meta.data());
                true
            }
            _ => false,
        }
    }

    /// Restore tempo and time signature to their defaults. The ratio is kept.
    pub fn reset(&self) {
        self.set_tempo(DEFAULT_TEMPO);
        self.time_signature.store(0, Ordering::Release);
    }

    pub fn millis_for(&self, delta: u32, resolution: i32) -> Result<f64> {
        delta_to_millis(self.tempo(), delta, resolution, self.tempo_ratio())
    }

    /// Real-time delay for `delta` ticks at the current tempo and ratio.
    pub fn delay_for(&self, delta: u32, resolution: i32) -> Result<Duration> {
        let millis = self.millis_for(delta, resolution)?;
        Duration::try_from_secs_f64(millis / 1000.0)
            .map_err(|e| Error::InvalidArgument(format!("delay of {millis} ms: {e}")))
    }
}

impl Default for TempoTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Total playing time of `score` in milliseconds, without sleeping.
///
/// Replays the score's tempo changes from the default tempo, in the same
/// order the dispatch loop applies them.
pub fn total_play_time_millis(score: &Score, ratio: f64) -> Result<f64> {
    let mut tempo = DEFAULT_TEMPO;
    let mut total = 0.0;

    for timed in score.events() {
        if timed.delta != 0 {
            total += delta_to_millis(tempo, timed.delta, score.resolution(), ratio)?;
        }
        if let Some(next) = timed.event.as_meta().and_then(MetaEvent::tempo) {
            if next > 0 {
                tempo = next;
            }
        }
    }

    Ok(total)
}
