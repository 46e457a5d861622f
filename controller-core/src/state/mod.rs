//! Operating-state machine for the controller.
//!
//! Every mutation of [`SystemState`] goes through [`transition`], a pure
//! function that returns the next state together with the side effect the
//! caller must carry out. Keeping the machine pure lets the coordinator and
//! button handlers share it while the hardware-facing work (forcing outputs
//! off, logging) stays with the caller.

use core::fmt;

use crate::config::{COUNTDOWN_WHILE_POWERED_OFF, CountdownPreset};
use crate::mode::Mode;

pub mod shared;

pub use shared::{AnalogSampleCache, SharedState};

/// Display/operating phase of the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum OperatingState {
    /// A countdown finished; outputs idle until the next button press.
    Ready,
    /// A timed session is running.
    CountingDown,
    /// Powered off by the toggle button.
    Stopped,
    /// Running with no time limit.
    Unbounded,
}

impl OperatingState {
    /// Returns `true` when the actuator and indicators should be driven.
    #[must_use]
    pub const fn drives_outputs(self) -> bool {
        matches!(self, Self::CountingDown | Self::Unbounded)
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ready => "ready",
            Self::CountingDown => "counting-down",
            Self::Stopped => "stopped",
            Self::Unbounded => "unbounded",
        };
        f.write_str(label)
    }
}

/// The single shared record describing what the controller is doing.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SystemState {
    pub mode: Mode,
    pub countdown_seconds: u16,
    pub operating_state: OperatingState,
    pub power_active: bool,
    pub manual_override_pending: bool,
}

impl SystemState {
    /// State the controller boots into: powered, continuous, lowest intensity.
    pub const BOOT: Self = Self {
        mode: Mode::Low,
        countdown_seconds: 0,
        operating_state: OperatingState::Unbounded,
        power_active: true,
        manual_override_pending: false,
    };

    /// Checks the structural invariants that every reachable state satisfies.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        let stopped = matches!(self.operating_state, OperatingState::Stopped);
        let counting = matches!(self.operating_state, OperatingState::CountingDown);

        if stopped && (self.countdown_seconds != 0 || self.mode.is_active()) {
            return false;
        }
        if self.countdown_seconds > 0 && !counting {
            return false;
        }
        // Only the power toggle enters or leaves `Stopped`.
        stopped != self.power_active
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::BOOT
    }
}

/// Inputs accepted by the state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StateEvent {
    /// Debounced press of the power toggle.
    PowerToggled,
    /// Debounced press of a countdown button.
    CountdownRequested(CountdownPreset),
    /// The tick derived `Mode` from the latest analog sample.
    SampleEvaluated(Mode),
    /// One second of countdown time has elapsed.
    SecondElapsed,
}

/// Why an event left the state untouched.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IgnoreReason {
    /// Countdown triggers are not honored while powered off.
    PoweredOff,
    /// No countdown is running, or it cannot advance with `mode == Off`.
    CountdownIdle,
}

/// Side effect the caller must perform after applying a transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    /// Nothing observable changed.
    None,
    /// Power turned on; the controller entered continuous operation.
    PoweredOn,
    /// Power turned off; outputs must be forced off before returning.
    ForceOutputsOff,
    /// A countdown session of the given length started (or restarted).
    CountdownStarted(u16),
    /// The running countdown moved down to the given number of seconds.
    CountdownDecremented(u16),
    /// The countdown reached zero and the controller is now `Ready`.
    CountdownExpired,
    /// Analog-derived mode replaced the previous one.
    ModeChanged { from: Mode, to: Mode },
    /// A pending manual override kept the handler-set mode for this pass.
    OverrideConsumed,
    /// The event had no effect.
    Ignored(IgnoreReason),
}

/// Result of applying one [`StateEvent`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub state: SystemState,
    pub effect: Effect,
}

impl Transition {
    const fn new(state: SystemState, effect: Effect) -> Self {
        Self { state, effect }
    }
}

/// Applies `event` to `state`, returning the next state and its side effect.
#[must_use]
pub fn transition(state: SystemState, event: StateEvent) -> Transition {
    match event {
        StateEvent::PowerToggled => toggle_power(state),
        StateEvent::CountdownRequested(preset) => start_countdown(state, preset),
        StateEvent::SampleEvaluated(derived) => evaluate_sample(state, derived),
        StateEvent::SecondElapsed => step_countdown(state),
    }
}

fn toggle_power(state: SystemState) -> Transition {
    if state.power_active {
        let next = SystemState {
            mode: Mode::Off,
            countdown_seconds: 0,
            operating_state: OperatingState::Stopped,
            power_active: false,
            manual_override_pending: true,
        };
        Transition::new(next, Effect::ForceOutputsOff)
    } else {
        let next = SystemState {
            mode: Mode::Low,
            countdown_seconds: 0,
            operating_state: OperatingState::Unbounded,
            power_active: true,
            manual_override_pending: true,
        };
        Transition::new(next, Effect::PoweredOn)
    }
}

fn start_countdown(state: SystemState, preset: CountdownPreset) -> Transition {
    if !state.power_active && !COUNTDOWN_WHILE_POWERED_OFF {
        return Transition::new(state, Effect::Ignored(IgnoreReason::PoweredOff));
    }

    let seconds = preset.seconds();
    let next = SystemState {
        countdown_seconds: seconds,
        operating_state: OperatingState::CountingDown,
        manual_override_pending: true,
        ..state
    };
    Transition::new(next, Effect::CountdownStarted(seconds))
}

fn evaluate_sample(state: SystemState, derived: Mode) -> Transition {
    if state.manual_override_pending {
        let next = SystemState {
            manual_override_pending: false,
            ..state
        };
        return Transition::new(next, Effect::OverrideConsumed);
    }

    // Derivation is suspended while powered off so `Stopped` keeps `mode == Off`.
    if !state.power_active || derived == state.mode {
        return Transition::new(state, Effect::None);
    }

    let next = SystemState {
        mode: derived,
        ..state
    };
    Transition::new(
        next,
        Effect::ModeChanged {
            from: state.mode,
            to: derived,
        },
    )
}

fn step_countdown(state: SystemState) -> Transition {
    let running = matches!(state.operating_state, OperatingState::CountingDown)
        && state.countdown_seconds > 0
        && state.mode.is_active();
    if !running {
        return Transition::new(state, Effect::Ignored(IgnoreReason::CountdownIdle));
    }

    let remaining = state.countdown_seconds - 1;
    if remaining == 0 {
        let next = SystemState {
            countdown_seconds: 0,
            operating_state: OperatingState::Ready,
            ..state
        };
        Transition::new(next, Effect::CountdownExpired)
    } else {
        let next = SystemState {
            countdown_seconds: remaining,
            ..state
        };
        Transition::new(next, Effect::CountdownDecremented(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(state: SystemState, event: StateEvent) -> SystemState {
        transition(state, event).state
    }

    #[test]
    fn boot_state_is_consistent() {
        assert!(SystemState::BOOT.is_consistent());
        assert_eq!(SystemState::default().mode, Mode::Low);
        assert_eq!(
            SystemState::default().operating_state,
            OperatingState::Unbounded
        );
    }

    #[test]
    fn power_off_clears_session_and_requests_output_shutdown() {
        let counting = apply(
            SystemState::BOOT,
            StateEvent::CountdownRequested(CountdownPreset::Twenty),
        );
        let result = transition(counting, StateEvent::PowerToggled);

        assert_eq!(result.effect, Effect::ForceOutputsOff);
        assert_eq!(result.state.operating_state, OperatingState::Stopped);
        assert_eq!(result.state.countdown_seconds, 0);
        assert_eq!(result.state.mode, Mode::Off);
        assert!(!result.state.power_active);
        assert!(result.state.manual_override_pending);
    }

    #[test]
    fn power_on_resumes_continuous_low_mode() {
        let off = apply(SystemState::BOOT, StateEvent::PowerToggled);
        let result = transition(off, StateEvent::PowerToggled);

        assert_eq!(result.effect, Effect::PoweredOn);
        assert_eq!(result.state.mode, Mode::Low);
        assert_eq!(result.state.operating_state, OperatingState::Unbounded);
        assert!(result.state.power_active);
    }

    #[test]
    fn countdown_trigger_ignored_while_powered_off() {
        let off = apply(SystemState::BOOT, StateEvent::PowerToggled);
        let result = transition(off, StateEvent::CountdownRequested(CountdownPreset::Ten));

        assert_eq!(result.effect, Effect::Ignored(IgnoreReason::PoweredOff));
        assert_eq!(result.state, off);
    }

    #[test]
    fn later_trigger_overwrites_running_countdown() {
        let first = apply(
            SystemState::BOOT,
            StateEvent::CountdownRequested(CountdownPreset::Thirty),
        );
        let stepped = apply(first, StateEvent::SecondElapsed);
        assert_eq!(stepped.countdown_seconds, 29);

        let result = transition(stepped, StateEvent::CountdownRequested(CountdownPreset::Ten));
        assert_eq!(result.effect, Effect::CountdownStarted(10));
        assert_eq!(result.state.countdown_seconds, 10);
    }

    #[test]
    fn override_suppresses_exactly_one_derivation() {
        let pressed = apply(
            SystemState::BOOT,
            StateEvent::CountdownRequested(CountdownPreset::Ten),
        );
        let first = transition(pressed, StateEvent::SampleEvaluated(Mode::High));
        assert_eq!(first.effect, Effect::OverrideConsumed);
        assert_eq!(first.state.mode, Mode::Low);

        let second = transition(first.state, StateEvent::SampleEvaluated(Mode::High));
        assert_eq!(
            second.effect,
            Effect::ModeChanged {
                from: Mode::Low,
                to: Mode::High
            }
        );
    }

    #[test]
    fn derivation_suspended_while_powered_off() {
        let mut off = apply(SystemState::BOOT, StateEvent::PowerToggled);
        off = apply(off, StateEvent::SampleEvaluated(Mode::High));
        let result = transition(off, StateEvent::SampleEvaluated(Mode::High));

        assert_eq!(result.effect, Effect::None);
        assert_eq!(result.state.mode, Mode::Off);
        assert!(result.state.is_consistent());
    }

    #[test]
    fn countdown_does_not_advance_in_mode_off() {
        let mut state = apply(
            SystemState::BOOT,
            StateEvent::CountdownRequested(CountdownPreset::Ten),
        );
        state.mode = Mode::Off;

        let result = transition(state, StateEvent::SecondElapsed);
        assert_eq!(result.effect, Effect::Ignored(IgnoreReason::CountdownIdle));
        assert_eq!(result.state.countdown_seconds, 10);
    }

    #[test]
    fn countdown_expiry_enters_ready() {
        let mut state = apply(
            SystemState::BOOT,
            StateEvent::CountdownRequested(CountdownPreset::Ten),
        );
        for expected in (1..10).rev() {
            let step = transition(state, StateEvent::SecondElapsed);
            assert_eq!(step.effect, Effect::CountdownDecremented(expected));
            state = step.state;
        }

        let last = transition(state, StateEvent::SecondElapsed);
        assert_eq!(last.effect, Effect::CountdownExpired);
        assert_eq!(last.state.operating_state, OperatingState::Ready);
        assert_eq!(last.state.countdown_seconds, 0);
        assert!(last.state.is_consistent());
    }

    #[test]
    fn unbounded_operation_ignores_second_ticks() {
        let result = transition(SystemState::BOOT, StateEvent::SecondElapsed);
        assert_eq!(result.effect, Effect::Ignored(IgnoreReason::CountdownIdle));
        assert_eq!(result.state, SystemState::BOOT);
    }

    #[test]
    fn inconsistent_states_are_detected() {
        let stopped_with_mode = SystemState {
            mode: Mode::High,
            countdown_seconds: 0,
            operating_state: OperatingState::Stopped,
            power_active: false,
            manual_override_pending: false,
        };
        assert!(!stopped_with_mode.is_consistent());

        let countdown_outside_session = SystemState {
            countdown_seconds: 5,
            ..SystemState::BOOT
        };
        assert!(!countdown_outside_session.is_consistent());
    }
}
