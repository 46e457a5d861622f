//! Output actuation: mode and operating state to actuator duty and indicator.
//!
//! [`OutputCommand::resolve`] is the pure mapping; [`OutputStage`] is the only
//! component allowed to touch the actuator and indicator drivers. The stage
//! writes both drivers on every call, so calling it each tick with an
//! unchanged command is harmless.

use crate::config::DUTY_TABLE;
use crate::mode::Mode;
use crate::state::OperatingState;

/// Status LEDs, one per active mode.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Indicator {
    Led1,
    Led2,
    Led3,
}

impl Indicator {
    /// Indicator associated with `mode`, or `None` for [`Mode::Off`].
    #[must_use]
    pub const fn for_mode(mode: Mode) -> Option<Self> {
        match mode {
            Mode::Off => None,
            Mode::Low => Some(Self::Led1),
            Mode::Medium => Some(Self::Led2),
            Mode::High => Some(Self::Led3),
        }
    }

    /// Deterministic index (0..3) used by driver implementations.
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            Self::Led1 => 0,
            Self::Led2 => 1,
            Self::Led3 => 2,
        }
    }
}

/// Hardware-facing output levels for one actuation pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct OutputCommand {
    /// Actuator duty cycle in percent (0..=100).
    pub duty_percent: u8,
    pub indicator: Option<Indicator>,
}

impl OutputCommand {
    /// Everything dark.
    pub const OFF: Self = Self {
        duty_percent: 0,
        indicator: None,
    };

    /// Output levels for `mode` while the controller is in `state`.
    #[must_use]
    pub const fn resolve(mode: Mode, state: OperatingState) -> Self {
        if !state.drives_outputs() {
            return Self::OFF;
        }
        Self {
            duty_percent: DUTY_TABLE[mode.level() as usize],
            indicator: Indicator::for_mode(mode),
        }
    }

    /// Same as [`resolve`](Self::resolve) for a raw level; unknown levels
    /// clamp to [`OutputCommand::OFF`].
    #[must_use]
    pub const fn resolve_level(level: u8, state: OperatingState) -> Self {
        match Mode::from_level(level) {
            Some(mode) => Self::resolve(mode, state),
            None => Self::OFF,
        }
    }

    /// Returns `true` when neither the actuator nor any indicator is on.
    #[must_use]
    pub const fn is_off(&self) -> bool {
        self.duty_percent == 0 && self.indicator.is_none()
    }
}

/// Proportional actuator (PWM duty cycle).
pub trait ActuatorDriver {
    /// Sets the duty cycle; `percent` is always within 0..=100.
    fn set_duty(&mut self, percent: u8);
}

/// Mutually exclusive status indicators.
pub trait IndicatorDriver {
    /// Lights `indicator` and turns every other indicator off.
    fn set_indicator(&mut self, indicator: Option<Indicator>);
}

/// Single authority over the actuator and indicator drivers.
pub struct OutputStage<A, I> {
    actuator: A,
    indicators: I,
    last: Option<OutputCommand>,
}

impl<A, I> OutputStage<A, I>
where
    A: ActuatorDriver,
    I: IndicatorDriver,
{
    /// Wraps the drivers; nothing is written until the first command.
    pub const fn new(actuator: A, indicators: I) -> Self {
        Self {
            actuator,
            indicators,
            last: None,
        }
    }

    /// Writes `command` to both drivers.
    pub fn apply(&mut self, command: OutputCommand) {
        self.actuator.set_duty(command.duty_percent.min(100));
        self.indicators.set_indicator(command.indicator);
        self.last = Some(command);
    }

    /// Resolves and writes the outputs for `mode` in `state`.
    pub fn actuate(&mut self, mode: Mode, state: OperatingState) -> OutputCommand {
        let command = OutputCommand::resolve(mode, state);
        self.apply(command);
        command
    }

    /// Forces the actuator and every indicator off immediately.
    pub fn force_off(&mut self) {
        self.apply(OutputCommand::OFF);
    }

    /// Last command written, if any.
    pub fn last_applied(&self) -> Option<OutputCommand> {
        self.last
    }

    /// Provides access to the actuator driver.
    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Provides access to the indicator driver.
    pub fn indicators(&self) -> &I {
        &self.indicators
    }
}
