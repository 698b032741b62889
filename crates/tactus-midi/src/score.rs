//! Merged, time-ordered score ready for playback.
//!
//! A [`Score`] is the single event stream the playback engine walks by index.
//! It can be built directly from [`TimedEvent`]s, merged from several
//! per-track sequences, or loaded from a Standard MIDI File via `midly`.

use crate::error::Result;
use crate::event::{Event, MetaKind, TimedEvent};
use midly::{Smf, Timing};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Ordered event sequence plus its tick resolution.
///
/// `resolution` is ticks per quarter note. Negative values denote SMPTE
/// (absolute-time) division, which playback rejects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    events: Vec<TimedEvent>,
    resolution: i32,
}

impl Score {
    pub fn new(events: Vec<TimedEvent>, resolution: i32) -> Self {
        Self { events, resolution }
    }

    pub fn empty(resolution: i32) -> Self {
        Self::new(Vec::new(), resolution)
    }

    /// Load and parse a MIDI file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::parse(&data)
    }

    /// Parse MIDI file from bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        let smf = Smf::parse(data)?;
        Ok(Self::from_smf(&smf))
    }

    /// Merge all tracks of a parsed SMF into one score.
    pub fn from_smf(smf: &Smf) -> Self {
        let resolution = match smf.header.timing {
            Timing::Metrical(tpq) => i32::from(tpq.as_int()),
            // Keep the division so playback can report it
            Timing::Timecode(fps, subframes) => {
                -(i32::from(fps.as_int()) * i32::from(subframes).max(1))
            }
        };

        debug!(
            "Parsing MIDI file: {} tracks, resolution {}",
            smf.tracks.len(),
            resolution
        );

        let tracks = smf
            .tracks
            .iter()
            .map(|track| {
                let mut pending_delta = 0u32;
                let mut events = Vec::with_capacity(track.len());
                for event in track.iter() {
                    pending_delta = pending_delta.saturating_add(event.delta.as_int());
                    if let Some(converted) = Event::from_midly(&event.kind) {
                        events.push(TimedEvent::new(pending_delta, converted));
                        pending_delta = 0;
                    }
                }
                events
            })
            .collect();

        Self::from_tracks(tracks, resolution)
    }

    /// Merge per-track delta sequences into one time-ordered score.
    ///
    /// Events at the same tick keep track order, then in-track order.
    /// Per-track end-of-track markers are dropped.
    pub fn from_tracks(tracks: Vec<Vec<TimedEvent>>, resolution: i32) -> Self {
        let mut absolute: Vec<(u64, usize, Event)> = Vec::new();

        for (track_index, track) in tracks.into_iter().enumerate() {
            let mut tick = 0u64;
            for timed in track {
                tick += u64::from(timed.delta);
                if timed.event.meta_kind() == Some(MetaKind::EndOfTrack) {
                    continue;
                }
                absolute.push((tick, track_index, timed.event));
            }
        }

        // Stable: in-track order survives equal keys
        absolute.sort_by_key(|(tick, track, _)| (*tick, *track));

        let mut previous = 0u64;
        let events: Vec<TimedEvent> = absolute
            .into_iter()
            .map(|(tick, _, event)| {
                let delta = u32::try_from(tick - previous).unwrap_or(u32::MAX);
                previous = tick;
                TimedEvent::new(delta, event)
            })
            .collect();

        debug!("Merged score: {} events", events.len());

        Self::new(events, resolution)
    }

    #[inline]
    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&TimedEvent> {
        self.events.get(index)
    }

    #[inline]
    pub fn resolution(&self) -> i32 {
        self.resolution
    }

    /// `false` for SMPTE division.
    #[inline]
    pub fn is_metrical(&self) -> bool {
        self.resolution >= 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Sum of all deltas.
    pub fn duration_ticks(&self) -> u64 {
        self.events.iter().map(|e| u64::from(e.delta)).sum()
    }
}
