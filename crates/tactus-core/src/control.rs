//! Cross-thread control signal for the dispatch loop.
//!
//! A [`Gate`] is a boolean the playback thread can block on until a
//! controller opens it. Pause and stop intents ride alongside as one-shot
//! flags; the loop consumes them the next time it passes the gate.

use crate::lockfree::AtomicFlag;
use parking_lot::{Condvar, Mutex};
use std::time::Instant;

/// Open/close/block-until-open signal.
#[derive(Debug, Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    pub fn new(open: bool) -> Self {
        Self {
            open: Mutex::new(open),
            cond: Condvar::new(),
        }
    }

    /// Open the gate and wake every waiter. Idempotent.
    pub fn open(&self) {
        self.open_with(|| ());
    }

    /// Run `f` and open the gate under the same lock.
    pub fn open_with<R>(&self, f: impl FnOnce() -> R) -> R {
        let mut open = self.open.lock();
        let result = f();
        *open = true;
        self.cond.notify_all();
        result
    }

    /// Open the gate if `f` returns true, evaluated under the gate lock.
    pub fn open_if(&self, f: impl FnOnce() -> bool) -> bool {
        let mut open = self.open.lock();
        let opened = f();
        if opened {
            *open = true;
            self.cond.notify_all();
        }
        opened
    }

    /// Subsequent waits block until the next `open`.
    pub fn close(&self) {
        *self.open.lock() = false;
    }

    /// Close the gate if `f` returns true, evaluated under the gate lock.
    pub fn close_if(&self, f: impl FnOnce() -> bool) -> bool {
        let mut open = self.open.lock();
        let close = f();
        if close {
            *open = false;
        }
        close
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }

    /// Block the calling thread until the gate is open.
    pub fn wait_until_open(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }

    /// Sleep until `deadline`, waking early when `cancelled` holds.
    ///
    /// `cancelled` is re-checked on every [`open`](Self::open), so a
    /// controller interrupts the sleep by setting its flag and then opening
    /// the gate. Returns `true` if the sleep was cut short.
    pub fn sleep_until(&self, deadline: Instant, cancelled: impl Fn() -> bool) -> bool {
        let mut open = self.open.lock();
        loop {
            if cancelled() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            self.cond.wait_until(&mut open, deadline);
        }
    }
}

/// Gate plus the pause/stop intent flags.
#[derive(Debug)]
pub struct ControlSignal {
    gate: Gate,
    pause_requested: AtomicFlag,
    stop_requested: AtomicFlag,
}

impl ControlSignal {
    pub fn new() -> Self {
        Self {
            gate: Gate::new(false),
            pause_requested: AtomicFlag::new(false),
            stop_requested: AtomicFlag::new(false),
        }
    }

    #[inline]
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    #[inline]
    pub fn request_pause(&self) {
        self.pause_requested.set(true);
    }

    #[inline]
    pub fn pause_requested(&self) -> bool {
        self.pause_requested.get()
    }

    #[inline]
    pub fn clear_pause(&self) {
        self.pause_requested.set(false);
    }

    /// Flag the stop and open the gate so a blocked or sleeping loop sees it.
    pub fn request_stop(&self) {
        self.request_stop_if(|| true);
    }

    /// Like [`request_stop`](Self::request_stop), but only when `f` holds
    /// under the gate lock.
    pub fn request_stop_if(&self, f: impl FnOnce() -> bool) -> bool {
        self.gate.open_if(|| {
            let stop = f();
            if stop {
                self.stop_requested.set(true);
            }
            stop
        })
    }

    #[inline]
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.get()
    }

    #[inline]
    pub fn clear_stop(&self) {
        self.stop_requested.set(false);
    }
}

impl Default for ControlSignal {
    fn default() -> Self {
        Self::new()
    }
}
