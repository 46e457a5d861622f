//! Fixed design constants for the controller.
//!
//! Nothing here is runtime-configurable; the values are the board's timing
//! and threshold budget and are referenced by both firmware and emulator.

use core::time::Duration;

/// Period of the hardware tick that drives the coordinator, in milliseconds.
pub const TICK_PERIOD_MS: u32 = 100;

/// Minimum spacing between two accepted edges on the same input line.
pub const DEBOUNCE_WINDOW_MS: u32 = 50;

/// Ticks between status display refreshes (~500 ms).
pub const STATUS_REFRESH_TICKS: u8 = 5;

/// Ticks between countdown decrements (~1000 ms).
pub const COUNTDOWN_STEP_TICKS: u8 = 10;

/// How long the boot splash stays on screen before the tick starts.
pub const SPLASH_DURATION: Duration = Duration::from_millis(2_000);

/// Largest value the 12-bit sampler can deliver.
pub const SAMPLE_MAX: u16 = 4_095;

/// Samples below this value select [`Mode::Off`](crate::mode::Mode::Off).
pub const MODE_LOW_THRESHOLD: u16 = 200;
/// Samples below this value (and above the low threshold) select `Low`.
pub const MODE_MEDIUM_THRESHOLD: u16 = 1_365;
/// Samples below this value (and above the medium threshold) select `Medium`.
pub const MODE_HIGH_THRESHOLD: u16 = 2_730;

/// Actuator duty (percent) for modes `Off`, `Low`, `Medium`, `High`.
pub const DUTY_TABLE: [u8; 4] = [0, 60, 80, 100];

/// Whether countdown triggers are honored while the controller is powered off.
///
/// Disabled: a powered-off controller must keep its outputs dark, and a
/// countdown started with `mode == Off` could never advance anyway.
pub const COUNTDOWN_WHILE_POWERED_OFF: bool = false;

/// Fixed session lengths selectable from the countdown buttons.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CountdownPreset {
    Ten,
    Twenty,
    Thirty,
}

impl CountdownPreset {
    /// Every preset, shortest first.
    pub const ALL: [CountdownPreset; 3] = [Self::Ten, Self::Twenty, Self::Thirty];

    /// Session length in whole seconds.
    #[must_use]
    pub const fn seconds(self) -> u16 {
        match self {
            Self::Ten => 10,
            Self::Twenty => 20,
            Self::Thirty => 30,
        }
    }
}

/// Sub-cadence schedule derived from the tick period.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TickSchedule {
    refresh_every: u8,
    countdown_every: u8,
}

impl TickSchedule {
    /// Creates a schedule with explicit sub-cadences (in ticks).
    #[must_use]
    pub const fn new(refresh_every: u8, countdown_every: u8) -> Self {
        Self {
            refresh_every,
            countdown_every,
        }
    }

    /// Ticks between status refreshes.
    #[must_use]
    pub const fn refresh_every(&self) -> u8 {
        self.refresh_every
    }

    /// Ticks between countdown decrements.
    #[must_use]
    pub const fn countdown_every(&self) -> u8 {
        self.countdown_every
    }
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self::new(STATUS_REFRESH_TICKS, COUNTDOWN_STEP_TICKS)
    }
}
