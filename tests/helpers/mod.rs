//! Test helpers and fixtures for Tactus integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `EARLY_SLACK_MS`: How much earlier than scheduled an event may be observed
//! - `LATE_SLACK_MS`: How much later than scheduled an event may be observed
//! - `NOTIFY_TIMEOUT_MS`: Upper bound for notifications and state changes

#![allow(dead_code)]

pub mod tolerances;

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tactus::midi::cc;
use tactus::prelude::*;
use tactus::ChannelVoice;
use tolerances::NOTIFY_TIMEOUT_MS;

/// Ticks per quarter note used by the fixtures.
pub const TEST_RESOLUTION: i32 = 480;

pub fn notify_timeout() -> Duration {
    Duration::from_millis(NOTIFY_TIMEOUT_MS)
}

/// Install a test-friendly subscriber so `RUST_LOG` output shows up.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Sink that records every event with its arrival time.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(Instant, Event)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn timed(&self) -> Vec<(Instant, Event)> {
        self.events.lock().clone()
    }

    /// Events from the score, without reset/mute broadcasts.
    pub fn score_events(&self) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|(_, e)| !is_broadcast(e))
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn score_event_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(_, e)| !is_broadcast(e))
            .count()
    }

    /// Number of controller broadcasts for `controller` (one per channel).
    pub fn broadcast_count(&self, controller: u8) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(_, e)| controller_of(e) == Some(controller))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &Event) {
        self.events.lock().push((Instant::now(), event.clone()));
    }
}

fn controller_of(event: &Event) -> Option<u8> {
    match event.as_channel()?.message {
        ChannelVoice::ControlChange {
            controller,
            value: 0,
        } => Some(controller),
        _ => None,
    }
}

pub fn is_broadcast(event: &Event) -> bool {
    matches!(
        controller_of(event),
        Some(cc::ALL_SOUND_OFF) | Some(cc::RESET_ALL_CONTROLLERS)
    )
}

/// `count` notes, each `delta` ticks after the previous one, at the default tempo.
///
/// Note numbers rise from 40 so every event is distinct.
pub fn note_run(count: usize, delta: u32) -> Score {
    let events = (0..count)
        .map(|i| {
            let delta = if i == 0 { 0 } else { delta };
            TimedEvent::new(delta, Event::note_on(0, 40 + (i % 80) as u8, 100))
        })
        .collect();
    Score::new(events, TEST_RESOLUTION)
}

/// Player with a recording sink attached.
pub fn recording_player(score: Score) -> (AsyncPlayer, Arc<RecordingSink>) {
    let sink = RecordingSink::new();
    let player = AsyncPlayer::builder()
        .score(score)
        .sink(sink.clone())
        .build()
        .expect("Failed to create test player");
    (player, sink)
}

/// Poll `condition` every millisecond until it holds or `max_wait_ms` passes.
pub fn wait_until(max_wait_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    let timeout = Duration::from_millis(max_wait_ms);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Wait for the player to reach `expected`.
pub fn wait_for_state(player: &AsyncPlayer, expected: PlaybackState, max_wait_ms: u64) -> bool {
    wait_until(max_wait_ms, || player.state() == expected)
}

/// Assert `actual` lies in `[expected - EARLY_SLACK_MS, expected + LATE_SLACK_MS]`.
pub fn assert_delay_near(actual: Duration, expected_ms: f64) {
    let actual_ms = actual.as_secs_f64() * 1000.0;
    let low = expected_ms - tolerances::EARLY_SLACK_MS as f64;
    let high = expected_ms + tolerances::LATE_SLACK_MS as f64;
    assert!(
        actual_ms >= low && actual_ms <= high,
        "Expected delay of ~{expected_ms} ms, measured {actual_ms:.1} ms"
    );
}
