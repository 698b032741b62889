//! Observer registry for dispatched events, finished passes and errors.
//!
//! Lists are published via `ArcSwap` so the playback thread reads a snapshot
//! without locking. Registration copies the list (`rcu`), which is fine since
//! it happens rarely and never on the playback thread.

use crate::Error;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tactus_midi::Event;

/// Receives every event the player forwards to its output.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &Event);
}

impl<F> EventSink for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event)
    }
}

/// Totals for one completed pass through the score.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PassSummary {
    /// Sum of the deltas of every dispatched event, in ticks.
    pub play_delta_time: u64,
    pub events_dispatched: usize,
}

pub type FinishedCallback = Arc<dyn Fn(&PassSummary) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Ordered observer lists. Callbacks run in registration order.
pub(crate) struct Observers {
    sinks: ArcSwap<Vec<Arc<dyn EventSink>>>,
    finished: ArcSwap<Vec<FinishedCallback>>,
    errors: ArcSwap<Vec<ErrorCallback>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self {
            sinks: ArcSwap::from_pointee(Vec::new()),
            finished: ArcSwap::from_pointee(Vec::new()),
            errors: ArcSwap::from_pointee(Vec::new()),
        }
    }

    pub(crate) fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.sinks.rcu(|list| {
            let mut list = Vec::clone(list);
            list.push(sink.clone());
            list
        });
    }

    pub(crate) fn add_finished(&self, callback: FinishedCallback) {
        self.finished.rcu(|list| {
            let mut list = Vec::clone(list);
            list.push(callback.clone());
            list
        });
    }

    pub(crate) fn add_error(&self, callback: ErrorCallback) {
        self.errors.rcu(|list| {
            let mut list = Vec::clone(list);
            list.push(callback.clone());
            list
        });
    }

    pub(crate) fn sink_count(&self) -> usize {
        self.sinks.load().len()
    }

    pub(crate) fn emit_event(&self, event: &Event) {
        for sink in self.sinks.load().iter() {
            sink.on_event(event);
        }
    }

    pub(crate) fn emit_finished(&self, summary: &PassSummary) {
        // Full snapshot: callbacks may register more observers
        let callbacks = self.finished.load_full();
        for callback in callbacks.iter() {
            callback(summary);
        }
    }

    pub(crate) fn emit_error(&self, error: &Error) {
        let callbacks = self.errors.load_full();
        for callback in callbacks.iter() {
            callback(error);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("sinks", &self.sinks.load().len())
            .field("finished", &self.finished.load().len())
            .field("errors", &self.errors.load().len())
            .finish()
    }
}
