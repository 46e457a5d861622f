//! Per-line debounce windows for the push buttons.
//!
//! Each input line owns one atomic slot holding the timestamp of its last
//! accepted edge. Slots are independent, so handlers for different lines never
//! contend. A slot is only advanced through compare-exchange: if two contexts
//! race on the same line inside one window, exactly one of them wins.

use core::fmt;

use portable_atomic::{AtomicU64, Ordering};

use crate::clock::Millis;
use crate::config::{CountdownPreset, DEBOUNCE_WINDOW_MS};

/// Sentinel stored in a slot that has never accepted an edge.
const NEVER_ACCEPTED: u64 = u64::MAX;

/// Number of debounced input lines.
pub const INPUT_LINE_COUNT: usize = 4;

/// Physical button lines wired to the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum InputLine {
    PowerToggle,
    Countdown10,
    Countdown20,
    Countdown30,
}

impl InputLine {
    /// Every line, in slot order.
    pub const ALL: [InputLine; INPUT_LINE_COUNT] = [
        Self::PowerToggle,
        Self::Countdown10,
        Self::Countdown20,
        Self::Countdown30,
    ];

    /// Deterministic slot index for this line.
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            Self::PowerToggle => 0,
            Self::Countdown10 => 1,
            Self::Countdown20 => 2,
            Self::Countdown30 => 3,
        }
    }

    /// Countdown preset bound to this line, if it is a countdown button.
    #[must_use]
    pub const fn countdown_preset(self) -> Option<CountdownPreset> {
        match self {
            Self::PowerToggle => None,
            Self::Countdown10 => Some(CountdownPreset::Ten),
            Self::Countdown20 => Some(CountdownPreset::Twenty),
            Self::Countdown30 => Some(CountdownPreset::Thirty),
        }
    }

    /// Short label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PowerToggle => "power",
            Self::Countdown10 => "t10",
            Self::Countdown20 => "t20",
            Self::Countdown30 => "t30",
        }
    }
}

impl fmt::Display for InputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Edge dropped because it arrived inside the debounce window.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Bounce {
    pub line: InputLine,
    /// Milliseconds since the last accepted edge on the same line.
    pub elapsed_ms: u32,
}

impl fmt::Display for Bounce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} edge {}ms after previous (window {}ms)",
            self.line, self.elapsed_ms, DEBOUNCE_WINDOW_MS
        )
    }
}

// Slots are u64 so every u32 instant is representable next to the sentinel.
#[allow(clippy::cast_lossless)]
const fn encode(instant: Millis) -> u64 {
    instant.as_u32() as u64
}

#[allow(clippy::cast_possible_truncation)]
const fn decode(raw: u64) -> Option<Millis> {
    if raw == NEVER_ACCEPTED {
        None
    } else {
        Some(Millis::new(raw as u32))
    }
}

/// One independent debounce window per input line.
pub struct DebounceBank {
    last_accepted: [AtomicU64; INPUT_LINE_COUNT],
}

impl DebounceBank {
    /// Creates a bank in which no line has accepted an edge yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_accepted: [
                AtomicU64::new(NEVER_ACCEPTED),
                AtomicU64::new(NEVER_ACCEPTED),
                AtomicU64::new(NEVER_ACCEPTED),
                AtomicU64::new(NEVER_ACCEPTED),
            ],
        }
    }

    /// Filters a raw edge observed on `line` at `now`.
    ///
    /// The edge is accepted iff at least [`DEBOUNCE_WINDOW_MS`] elapsed since
    /// the previous accepted edge on the same line (or none was accepted yet).
    ///
    /// # Errors
    ///
    /// Returns [`Bounce`] when the edge falls inside the window; the window is
    /// left untouched in that case.
    pub fn accept(&self, line: InputLine, now: Millis) -> Result<(), Bounce> {
        let slot = &self.last_accepted[line.as_index()];
        let stored = slot.load(Ordering::Acquire);

        if let Some(previous) = decode(stored) {
            let elapsed_ms = now.elapsed_since(previous);
            if elapsed_ms < DEBOUNCE_WINDOW_MS {
                return Err(Bounce { line, elapsed_ms });
            }
        }

        slot.compare_exchange(stored, encode(now), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| Bounce {
                line,
                elapsed_ms: 0,
            })
    }

    /// Timestamp of the last accepted edge on `line`, if any.
    #[must_use]
    pub fn last_accepted(&self, line: InputLine) -> Option<Millis> {
        decode(self.last_accepted[line.as_index()].load(Ordering::Acquire))
    }
}

impl Default for DebounceBank {
    fn default() -> Self {
        Self::new()
    }
}
