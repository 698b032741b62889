//! Synchronous playback engine.
//!
//! [`SyncPlayer::run`] walks the score on the calling thread, sleeping for
//! each event's delta at the current tempo and forwarding events to the
//! registered sinks. Any number of cloned handles may drive it from other
//! threads through [`play`](SyncPlayer::play), [`pause`](SyncPlayer::pause)
//! and [`stop`](SyncPlayer::stop).
//!
//! ```text
//!            play               pause (seen by loop)
//! Stopped ─────────▶ Playing ─────────────────────▶ Paused
//!    ▲                │  ▲            play            │
//!    │  stop / end    │  └──────────────────────────────┘
//!    └────────────────┴──────────── stop ◀────────────┘
//! ```

use crate::config::PlayerConfig;
use crate::control::ControlSignal;
use crate::lockfree::AtomicFlag;
use crate::observer::{EventSink, Observers, PassSummary};
use crate::state::{AtomicPlaybackState, PlaybackState};
use crate::tempo::{self, TempoTracker};
use crate::{Error, Result};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tactus_midi::{cc, Event, Score, TimedEvent};
use tracing::{debug, trace, warn};

/// Outcome of [`SyncPlayer::handle_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The event reached the tempo tracker and sinks.
    Dispatched,
    /// A stop request cut the delay short. Nothing was dispatched.
    Interrupted,
}

/// Why a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The cursor reached the end of the score.
    Finished,
    /// A stop request was honoured.
    Stopped,
}

#[derive(Debug)]
struct Shared {
    score: Arc<Score>,
    config: PlayerConfig,
    control: ControlSignal,
    state: AtomicPlaybackState,
    tempo: TempoTracker,
    cursor: AtomicUsize,
    play_delta: AtomicU64,
    running: AtomicFlag,
    observers: Observers,
}

/// Handle to a playback engine. Clones share the same engine.
#[derive(Debug, Clone)]
pub struct SyncPlayer {
    shared: Arc<Shared>,
}

impl SyncPlayer {
    pub fn new(score: Arc<Score>, config: PlayerConfig) -> Result<Self> {
        config.validate()?;

        let tempo = TempoTracker::new();
        tempo.set_tempo_ratio(config.tempo_ratio)?;

        Ok(Self {
            shared: Arc::new(Shared {
                score,
                config,
                control: ControlSignal::new(),
                state: AtomicPlaybackState::new(PlaybackState::Stopped),
                tempo,
                cursor: AtomicUsize::new(0),
                play_delta: AtomicU64::new(0),
                running: AtomicFlag::new(false),
                observers: Observers::new(),
            }),
        })
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Start or resume. Discards a pause the loop has not yet observed.
    ///
    /// Only arms the gate; some thread must be inside [`run`](Self::run).
    pub fn play(&self) {
        let shared = &*self.shared;
        let previous = shared.control.gate().open_with(|| {
            shared.control.clear_pause();
            let previous = shared.state.get();
            shared.state.set(PlaybackState::Playing);
            previous
        });

        if previous == PlaybackState::Paused {
            debug!(
                "Resuming playback at position {}",
                shared.cursor.load(Ordering::Acquire)
            );
        }
    }

    /// Request a pause and mute immediately. No-op unless playing.
    ///
    /// The state becomes `Paused` once the loop reaches its next check.
    pub fn pause(&self) {
        if self.shared.state.get() != PlaybackState::Playing {
            return;
        }
        self.shared.control.request_pause();
        self.broadcast(cc::ALL_SOUND_OFF);
    }

    /// Request a stop. No-op when already stopped.
    pub fn stop(&self) {
        let shared = &*self.shared;
        // Under the gate lock, serialized with the loop's exit cleanup
        shared
            .control
            .request_stop_if(|| shared.state.get() != PlaybackState::Stopped);
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Wait out the event's delta, then apply and forward it.
    ///
    /// Tempo and time-signature events update the tracker. Every event reaches
    /// the sinks unless `forward_meta_events` is off, which holds back meta
    /// events other than tempo.
    pub fn handle_event(&self, timed: &TimedEvent) -> Result<Dispatch> {
        let shared = &*self.shared;

        if timed.delta != 0 {
            let delay = shared
                .tempo
                .delay_for(timed.delta, shared.score.resolution())?;
            if self.sleep(delay)? {
                return Ok(Dispatch::Interrupted);
            }
        }

        if let Some(meta) = timed.event.as_meta() {
            shared.tempo.observe(meta);
        }

        let forward = shared.config.forward_meta_events
            || !timed.event.is_meta()
            || timed.event.is_tempo();
        if forward {
            trace!("Dispatching {:?}", timed.event);
            shared.observers.emit_event(&timed.event);
        }

        shared
            .play_delta
            .fetch_add(u64::from(timed.delta), Ordering::AcqRel);

        Ok(Dispatch::Dispatched)
    }

    /// Returns `true` when a stop request cut the sleep short.
    fn sleep(&self, delay: Duration) -> Result<bool> {
        let shared = &*self.shared;

        if !shared.config.interruptible_delays {
            thread::sleep(delay);
            return Ok(false);
        }

        let deadline = Instant::now().checked_add(delay).ok_or_else(|| {
            Error::InvalidArgument(format!("delay of {delay:?} overflows the clock"))
        })?;
        let control = &shared.control;
        Ok(control
            .gate()
            .sleep_until(deadline, || control.stop_requested()))
    }

    /// Run one playback pass on the calling thread.
    ///
    /// Blocks on the gate until [`play`](Self::play), then dispatches from
    /// the start of the score until the end or a stop request. Finished
    /// observers run only on a natural end; error observers run when a
    /// delay cannot be computed, and the error is returned.
    pub fn run(&self) -> Result<Completion> {
        let shared = &*self.shared;
        if shared.running.swap(true) {
            return Err(Error::AlreadyRunning);
        }

        shared.tempo.reset();
        shared.play_delta.store(0, Ordering::Release);
        shared.cursor.store(0, Ordering::Release);

        debug!(
            "Playback pass starting: {} events, resolution {}",
            shared.score.len(),
            shared.score.resolution()
        );

        if shared.config.reset_controllers_on_start {
            self.broadcast(cc::RESET_ALL_CONTROLLERS);
        }

        let outcome = self.dispatch_loop();
        self.finish(outcome)
    }

    fn dispatch_loop(&self) -> Result<Completion> {
        let shared = &*self.shared;
        let control = &shared.control;
        let mut cursor = 0usize;

        loop {
            control.gate().wait_until_open();

            if control.stop_requested() {
                return Ok(Completion::Stopped);
            }

            // Under the gate lock so a racing play() or stop() is not lost
            let paused = control.gate().close_if(|| {
                if control.pause_requested() && !control.stop_requested() {
                    control.clear_pause();
                    shared.state.set(PlaybackState::Paused);
                    true
                } else {
                    false
                }
            });
            if paused {
                debug!("Playback paused at position {}", cursor);
                continue;
            }

            let Some(timed) = shared.score.get(cursor) else {
                return Ok(Completion::Finished);
            };

            match self.handle_event(timed)? {
                Dispatch::Dispatched => {
                    cursor += 1;
                    shared.cursor.store(cursor, Ordering::Release);
                }
                Dispatch::Interrupted => {}
            }
        }
    }

    fn finish(&self, outcome: Result<Completion>) -> Result<Completion> {
        let shared = &*self.shared;

        if shared.config.mute_on_stop {
            self.broadcast(cc::ALL_SOUND_OFF);
        }

        let summary = PassSummary {
            play_delta_time: shared.play_delta.load(Ordering::Acquire),
            events_dispatched: shared.cursor.swap(0, Ordering::AcqRel),
        };
        if matches!(outcome, Ok(Completion::Finished)) {
            shared.play_delta.store(0, Ordering::Release);
        }

        // Cleared before the state flips so a caller that sees Stopped can start a new pass
        shared.running.set(false);
        shared.control.gate().close_if(|| {
            shared.control.clear_stop();
            shared.control.clear_pause();
            shared.state.set(PlaybackState::Stopped);
            true
        });

        match &outcome {
            Ok(Completion::Finished) => {
                debug!(
                    "Playback finished: {} events, {} ticks",
                    summary.events_dispatched, summary.play_delta_time
                );
                shared.observers.emit_finished(&summary);
            }
            Ok(Completion::Stopped) => {
                debug!(
                    "Playback stopped after {} events",
                    summary.events_dispatched
                );
            }
            Err(e) => {
                warn!("Playback pass failed: {}", e);
                shared.observers.emit_error(e);
            }
        }

        outcome
    }

    /// Send a controller message with value 0 on every configured channel.
    fn broadcast(&self, controller: u8) {
        let observers = &self.shared.observers;
        for channel in 0..self.shared.config.channels {
            observers.emit_event(&Event::control_change(channel, controller, 0));
        }
    }

    // =========================================================================
    // Observers
    // =========================================================================

    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.shared.observers.add_sink(sink);
    }

    /// Register a closure as an event sink.
    pub fn on_event<F>(&self, f: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.add_sink(Arc::new(f));
    }

    /// Called on the playback thread once per pass that reaches the end.
    pub fn on_finished<F>(&self, f: F)
    where
        F: Fn(&PassSummary) + Send + Sync + 'static,
    {
        self.shared.observers.add_finished(Arc::new(f));
    }

    /// Called on the playback thread when a pass fails.
    pub fn on_error<F>(&self, f: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.shared.observers.add_error(Arc::new(f));
    }

    pub fn sink_count(&self) -> usize {
        self.shared.observers.sink_count()
    }

    // =========================================================================
    // Status
    // =========================================================================

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.shared.state.get()
    }

    /// Index of the next event to dispatch.
    #[inline]
    pub fn position(&self) -> usize {
        self.shared.cursor.load(Ordering::Acquire)
    }

    /// Ticks consumed in the current pass.
    #[inline]
    pub fn play_delta_time(&self) -> u64 {
        self.shared.play_delta.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.shared.running.get()
    }

    #[inline]
    pub fn tempo(&self) -> u32 {
        self.shared.tempo.tempo()
    }

    #[inline]
    pub fn bpm(&self) -> f64 {
        self.shared.tempo.bpm()
    }

    #[inline]
    pub fn time_signature(&self) -> [u8; 4] {
        self.shared.tempo.time_signature()
    }

    #[inline]
    pub fn tempo_ratio(&self) -> f64 {
        self.shared.tempo.tempo_ratio()
    }

    pub fn set_tempo_ratio(&self, ratio: f64) -> Result<()> {
        self.shared.tempo.set_tempo_ratio(ratio)
    }

    /// Playing time of the whole score at the current tempo ratio.
    pub fn total_play_time_millis(&self) -> Result<f64> {
        tempo::total_play_time_millis(&self.shared.score, self.tempo_ratio())
    }

    #[inline]
    pub fn score(&self) -> &Arc<Score> {
        &self.shared.score
    }

    #[inline]
    pub fn config(&self) -> &PlayerConfig {
        &self.shared.config
    }
}
