//! Monotonic millisecond timestamps shared by every event source.
//!
//! Hardware delivers edges and ticks with a timestamp taken from a free-running
//! millisecond counter. The counter is 32 bits wide and wraps after ~49 days, so
//! all interval math goes through [`Millis::elapsed_since`], which is wrapping.

use core::fmt;

/// Timestamp in milliseconds since boot (wrapping).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Millis(u32);

impl Millis {
    /// Timestamp of the boot instant.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw millisecond counter value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw millisecond counter value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`, tolerant of counter wrap.
    #[must_use]
    pub const fn elapsed_since(self, earlier: Millis) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Returns the timestamp `millis` after `self`.
    #[must_use]
    pub const fn wrapping_add_millis(self, millis: u32) -> Self {
        Self(self.0.wrapping_add(millis))
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of monotonic timestamps.
///
/// Firmware backs this with the embassy time driver; tests and the emulator use
/// a manually advanced clock so event ordering is fully deterministic.
pub trait MonotonicClock {
    /// Returns the current timestamp.
    fn now(&self) -> Millis;
}

/// Clock that only moves when told to.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: core::cell::Cell<Millis>,
}

impl ManualClock {
    /// Creates a clock parked at `start`.
    #[must_use]
    pub const fn starting_at(start: Millis) -> Self {
        Self {
            now: core::cell::Cell::new(start),
        }
    }

    /// Moves the clock forward by `millis`.
    pub fn advance(&self, millis: u32) {
        self.now.set(self.now.get().wrapping_add_millis(millis));
    }

    /// Jumps the clock to `instant`.
    pub fn set(&self, instant: Millis) {
        self.now.set(instant);
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> Millis {
        self.now.get()
    }
}
