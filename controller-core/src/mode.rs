//! Quantized intensity levels and the analog-to-mode mapping.

use core::fmt;

use crate::config::{MODE_HIGH_THRESHOLD, MODE_LOW_THRESHOLD, MODE_MEDIUM_THRESHOLD};

/// Operating intensity. `Off` is idle; `Low`..`High` increase the drive.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Mode {
    #[default]
    Off,
    Low,
    Medium,
    High,
}

impl Mode {
    /// Numeric level shown on the status display (0..=3).
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Mode::Off => 0,
            Mode::Low => 1,
            Mode::Medium => 2,
            Mode::High => 3,
        }
    }

    /// Attempts to construct a [`Mode`] from a raw level.
    #[must_use]
    pub const fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Mode::Off),
            1 => Some(Mode::Low),
            2 => Some(Mode::Medium),
            3 => Some(Mode::High),
            _ => None,
        }
    }

    /// Returns `true` for every mode except [`Mode::Off`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Mode::Off)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// Maps a raw 12-bit sample onto a mode band.
#[must_use]
pub const fn derive_mode(sample: u16) -> Mode {
    if sample < MODE_LOW_THRESHOLD {
        Mode::Off
    } else if sample < MODE_MEDIUM_THRESHOLD {
        Mode::Low
    } else if sample < MODE_HIGH_THRESHOLD {
        Mode::Medium
    } else {
        Mode::High
    }
}
