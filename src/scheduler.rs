//! Clock abstraction and a cooperative trailing debouncer

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += by;
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let elapsed = *self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + elapsed
    }
}

/// Holds at most one pending value; scheduling again supersedes it and
/// restarts the window (last write wins).
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.window));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(value, _)| value)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Takes the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|(_, deadline)| now >= *deadline);
        if !due {
            return None;
        }
        self.pending.take().map(|(value, _)| value)
    }

    /// Takes the pending value regardless of its deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}
