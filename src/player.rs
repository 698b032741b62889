//! Threaded player facade.
//!
//! [`AsyncPlayer`] owns one [`SyncPlayer`] and the thread its dispatch loop
//! runs on. Control calls never block on playback; completion and failure
//! are reported through [`subscribe`](AsyncPlayer::subscribe).

use crate::{Error, PlayerBuilder, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tactus_core::{
    Completion, EventSink, PassSummary, PlaybackState, PlayerConfig, SyncPlayer, TimeSignature,
};
use tactus_midi::{Event, Score};
use tracing::{debug, warn};

/// Playback thread name.
pub const PLAYBACK_THREAD_NAME: &str = "tactus-playback";

/// Pass outcome delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerNotification {
    /// The pass reached the end of the score.
    Finished(PassSummary),
    /// The pass terminated with an error. The player is `Stopped`.
    Failed(tactus_core::Error),
    /// The pass ended on a stop request.
    Stopped,
}

#[derive(Debug, Default)]
struct Notifier {
    subscribers: Mutex<Vec<Sender<PlayerNotification>>>,
    last_error: Mutex<Option<tactus_core::Error>>,
}

impl Notifier {
    fn subscribe(&self) -> Receiver<PlayerNotification> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Dropped receivers are pruned.
    fn send(&self, notification: PlayerNotification) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(notification.clone()).is_ok());
    }

    fn fail(&self, error: &tactus_core::Error) {
        *self.last_error.lock() = Some(error.clone());
        self.send(PlayerNotification::Failed(error.clone()));
    }
}

/// Runs a [`SyncPlayer`] on a dedicated thread.
///
/// Dropping the player requests a stop without joining the thread.
///
/// # Example
///
/// ```ignore
/// use tactus::prelude::*;
///
/// let player = AsyncPlayer::builder()
///     .score(Score::load("song.mid")?)
///     .build()?;
/// player.on_event(|event| println!("{event:?}"));
///
/// let events = player.subscribe();
/// player.play()?;
/// assert!(matches!(events.recv(), Ok(PlayerNotification::Finished(_))));
/// ```
pub struct AsyncPlayer {
    engine: SyncPlayer,
    notifier: Arc<Notifier>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncPlayer {
    pub fn builder() -> PlayerBuilder {
        PlayerBuilder::default()
    }

    pub fn new(score: Arc<Score>, config: PlayerConfig) -> Result<Self> {
        Ok(Self::from_engine(SyncPlayer::new(score, config)?))
    }

    /// Wrap an existing engine. Its observers stay registered.
    pub fn from_engine(engine: SyncPlayer) -> Self {
        let notifier = Arc::new(Notifier::default());

        {
            let notifier = notifier.clone();
            engine.on_finished(move |summary: &PassSummary| {
                notifier.send(PlayerNotification::Finished(*summary))
            });
        }
        {
            let notifier = notifier.clone();
            engine.on_error(move |error: &tactus_core::Error| notifier.fail(error));
        }

        Self {
            engine,
            notifier,
            thread: Mutex::new(None),
        }
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Start from the beginning when stopped, resume when paused.
    pub fn play(&self) -> Result<()> {
        loop {
            // Held across the state check so concurrent callers start one loop
            let mut slot = self.thread.lock();

            match self.engine.state() {
                PlaybackState::Playing => return Ok(()),
                PlaybackState::Paused => {
                    self.engine.play();
                    return Ok(());
                }
                _ => {}
            }

            if let Some(handle) = slot.take() {
                if Self::is_joinable(&handle) {
                    // Joined unlocked: its finished observers may call play()
                    drop(slot);
                    Self::reap(handle);
                    continue;
                }
                Self::reap(handle);
            }
            *slot = Some(self.spawn()?);

            // The loop blocks on the gate first, so arming after the spawn is safe
            self.engine.play();
            return Ok(());
        }
    }

    /// Pause when playing. No-op otherwise.
    pub fn pause(&self) {
        if self.engine.state() == PlaybackState::Playing {
            self.engine.pause();
        }
    }

    pub fn stop(&self) {
        self.engine.stop();
    }

    /// Block until the current pass ends. Returns immediately when no loop
    /// thread exists or when called from the playback thread itself.
    pub fn wait(&self) {
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            Self::reap(handle);
        }
    }

    fn spawn(&self) -> Result<JoinHandle<()>> {
        let engine = self.engine.clone();
        let notifier = self.notifier.clone();

        let handle = thread::Builder::new()
            .name(PLAYBACK_THREAD_NAME.into())
            .spawn(move || match engine.run() {
                Ok(Completion::Stopped) => notifier.send(PlayerNotification::Stopped),
                // Finished and failures arrive through the engine observers
                Ok(Completion::Finished) => {}
                Err(tactus_core::Error::AlreadyRunning) => {
                    warn!("Playback loop already running, spawned thread exits");
                }
                Err(_) => {}
            })
            .map_err(|e| Error::Spawn(e.to_string()))?;

        debug!("Spawned {} thread", PLAYBACK_THREAD_NAME);
        Ok(handle)
    }

    /// A joinable handle is still running on some other thread.
    fn is_joinable(handle: &JoinHandle<()>) -> bool {
        !handle.is_finished() && handle.thread().id() != thread::current().id()
    }

    /// Join a previous loop thread, or detach it when called from that thread.
    fn reap(handle: JoinHandle<()>) {
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!("Playback thread panicked");
        }
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Receive an event per pass outcome. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<PlayerNotification> {
        self.notifier.subscribe()
    }

    /// Most recent pass failure, if any.
    pub fn last_error(&self) -> Option<tactus_core::Error> {
        self.notifier.last_error.lock().clone()
    }

    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.engine.add_sink(sink);
    }

    pub fn on_event<F>(&self, f: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.engine.on_event(f);
    }

    // =========================================================================
    // Status
    // =========================================================================

    #[inline]
    pub fn engine(&self) -> &SyncPlayer {
        &self.engine
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.engine.state()
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.engine.position()
    }

    #[inline]
    pub fn play_delta_time(&self) -> u64 {
        self.engine.play_delta_time()
    }

    #[inline]
    pub fn tempo(&self) -> u32 {
        self.engine.tempo()
    }

    #[inline]
    pub fn bpm(&self) -> f64 {
        self.engine.bpm()
    }

    #[inline]
    pub fn time_signature(&self) -> [u8; 4] {
        self.engine.time_signature()
    }

    pub fn time_signature_info(&self) -> TimeSignature {
        TimeSignature::from_bytes(self.engine.time_signature())
    }

    #[inline]
    pub fn tempo_ratio(&self) -> f64 {
        self.engine.tempo_ratio()
    }

    pub fn set_tempo_ratio(&self, ratio: f64) -> Result<()> {
        Ok(self.engine.set_tempo_ratio(ratio)?)
    }

    pub fn total_play_time_millis(&self) -> Result<f64> {
        Ok(self.engine.total_play_time_millis()?)
    }

    #[inline]
    pub fn score(&self) -> &Arc<Score> {
        self.engine.score()
    }
}

impl Drop for AsyncPlayer {
    fn drop(&mut self) {
        self.engine.stop();
    }
}

impl std::fmt::Debug for AsyncPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncPlayer")
            .field("state", &self.engine.state())
            .field("position", &self.engine.position())
            .field("thread", &self.thread.lock().is_some())
            .finish()
    }
}
