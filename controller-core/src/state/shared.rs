//! Interrupt-safe storage for the shared controller state.
//!
//! [`SharedState`] holds the whole [`SystemState`] in a `critical_section`
//! mutex. Every mutation reads the snapshot, applies a transition, and writes
//! the full snapshot back before the critical section ends, so no context can
//! observe a half-applied multi-field update.
//!
//! [`AnalogSampleCache`] is a single atomic: it has exactly one writer (the
//! sample-complete handler) and tolerates any read interleaving.

use core::cell::Cell;

use critical_section::Mutex;
use portable_atomic::{AtomicU16, Ordering};

use super::{StateEvent, SystemState, Transition, transition};
use crate::config::SAMPLE_MAX;

/// Owner of the process-wide [`SystemState`].
pub struct SharedState {
    inner: Mutex<Cell<SystemState>>,
}

impl SharedState {
    /// Creates storage holding `initial`.
    #[must_use]
    pub const fn new(initial: SystemState) -> Self {
        Self {
            inner: Mutex::new(Cell::new(initial)),
        }
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SystemState {
        critical_section::with(|cs| self.inner.borrow(cs).get())
    }

    /// Applies `event` atomically and returns the resulting transition.
    pub fn apply(&self, event: StateEvent) -> Transition {
        self.update(|state| {
            let result = transition(*state, event);
            *state = result.state;
            result
        })
    }

    /// Runs `f` against the state inside one critical section.
    ///
    /// The closure must stay short; it executes with interrupts masked.
    pub fn update<R>(&self, f: impl FnOnce(&mut SystemState) -> R) -> R {
        critical_section::with(|cs| {
            let cell = self.inner.borrow(cs);
            let mut state = cell.get();
            let result = f(&mut state);
            cell.set(state);
            result
        })
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(SystemState::BOOT)
    }
}

/// Most recent raw sample from the analog input.
pub struct AnalogSampleCache {
    latest: AtomicU16,
}

impl AnalogSampleCache {
    /// Creates a cache holding a zero sample.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: AtomicU16::new(0),
        }
    }

    /// Stores a fresh sample, masked to the 12-bit converter range.
    pub fn store(&self, sample: u16) {
        self.latest.store(sample & SAMPLE_MAX, Ordering::Release);
    }

    /// Returns the latest stored sample.
    #[must_use]
    pub fn latest(&self) -> u16 {
        self.latest.load(Ordering::Acquire)
    }
}

impl Default for AnalogSampleCache {
    fn default() -> Self {
        Self::new()
    }
}
