//! Process-wide controller storage and the button edge handlers.
//!
//! [`Controller`] groups everything that is shared between interrupt
//! contexts: the [`SharedState`], the [`AnalogSampleCache`], and the
//! [`DebounceBank`]. It is `const`-constructible so firmware can place it in
//! a `static` and hand `&'static Controller` to every task.

use crate::actuation::{ActuatorDriver, IndicatorDriver, OutputStage};
use crate::clock::Millis;
use crate::debounce::{Bounce, DebounceBank, InputLine};
use crate::state::{AnalogSampleCache, Effect, SharedState, StateEvent, SystemState};

/// Result of feeding one raw edge through the controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EdgeOutcome {
    /// The edge fell inside the line's debounce window and was dropped.
    Rejected(Bounce),
    /// The edge was accepted and its handler ran.
    Applied {
        line: InputLine,
        effect: Effect,
        state: SystemState,
    },
}

impl EdgeOutcome {
    /// Returns `true` when the edge passed the debouncer.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, EdgeOutcome::Applied { .. })
    }
}

/// Shared controller state reachable from every event source.
pub struct Controller {
    state: SharedState,
    samples: AnalogSampleCache,
    debounce: DebounceBank,
}

impl Controller {
    /// Creates a controller in the boot state.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_state(SystemState::BOOT)
    }

    /// Creates a controller starting from `initial`.
    #[must_use]
    pub const fn with_state(initial: SystemState) -> Self {
        Self {
            state: SharedState::new(initial),
            samples: AnalogSampleCache::new(),
            debounce: DebounceBank::new(),
        }
    }

    /// Handles a raw falling edge on `line` observed at `now`.
    ///
    /// Accepted power-toggle edges that switch the controller off force the
    /// outputs dark before this call returns; the state change and the
    /// output write happen inside the same critical section.
    pub fn handle_edge<A, I>(
        &self,
        line: InputLine,
        now: Millis,
        outputs: &mut OutputStage<A, I>,
    ) -> EdgeOutcome
    where
        A: ActuatorDriver,
        I: IndicatorDriver,
    {
        if let Err(bounce) = self.debounce.accept(line, now) {
            return EdgeOutcome::Rejected(bounce);
        }

        let event = match line.countdown_preset() {
            Some(preset) => StateEvent::CountdownRequested(preset),
            None => StateEvent::PowerToggled,
        };

        self.state.update(|state| {
            let result = crate::state::transition(*state, event);
            *state = result.state;
            if result.effect == Effect::ForceOutputsOff {
                outputs.force_off();
            }
            EdgeOutcome::Applied {
                line,
                effect: result.effect,
                state: result.state,
            }
        })
    }

    /// Stores a completed analog conversion.
    pub fn record_sample(&self, sample: u16) {
        self.samples.store(sample);
    }

    /// Latest analog sample.
    #[must_use]
    pub fn latest_sample(&self) -> u16 {
        self.samples.latest()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SystemState {
        self.state.snapshot()
    }

    /// Access to the shared state for the tick coordinator.
    #[must_use]
    pub fn shared_state(&self) -> &SharedState {
        &self.state
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::{Indicator, OutputCommand};
    use crate::mode::Mode;
    use crate::state::OperatingState;

    #[derive(Default)]
    struct Duty(Option<u8>);

    impl ActuatorDriver for Duty {
        fn set_duty(&mut self, percent: u8) {
            self.0 = Some(percent);
        }
    }

    #[derive(Default)]
    struct Leds(Option<Option<Indicator>>);

    impl IndicatorDriver for Leds {
        fn set_indicator(&mut self, indicator: Option<Indicator>) {
            self.0 = Some(indicator);
        }
    }

    fn stage() -> OutputStage<Duty, Leds> {
        OutputStage::new(Duty::default(), Leds::default())
    }

    #[test]
    fn power_off_forces_outputs_within_handler() {
        let controller = Controller::new();
        let mut outputs = stage();
        outputs.actuate(Mode::High, OperatingState::Unbounded);

        let outcome = controller.handle_edge(InputLine::PowerToggle, Millis::new(10), &mut outputs);

        assert!(matches!(
            outcome,
            EdgeOutcome::Applied {
                effect: Effect::ForceOutputsOff,
                ..
            }
        ));
        assert_eq!(outputs.last_applied(), Some(OutputCommand::OFF));
        assert_eq!(outputs.actuator().0, Some(0));
        assert_eq!(outputs.indicators().0, Some(None));
    }

    #[test]
    fn bounced_edge_leaves_state_untouched() {
        let controller = Controller::new();
        let mut outputs = stage();

        assert!(
            controller
                .handle_edge(InputLine::Countdown10, Millis::new(100), &mut outputs)
                .is_accepted()
        );
        let before = controller.snapshot();
        let outcome = controller.handle_edge(InputLine::Countdown10, Millis::new(120), &mut outputs);

        assert!(matches!(outcome, EdgeOutcome::Rejected(Bounce { elapsed_ms: 20, .. })));
        assert_eq!(controller.snapshot(), before);
    }

    #[test]
    fn countdown_lines_start_their_preset() {
        let controller = Controller::new();
        let mut outputs = stage();

        controller.handle_edge(InputLine::Countdown30, Millis::new(0), &mut outputs);
        let state = controller.snapshot();
        assert_eq!(state.countdown_seconds, 30);
        assert_eq!(state.operating_state, OperatingState::CountingDown);
        assert!(state.manual_override_pending);
        // Countdown buttons never touch the outputs directly.
        assert_eq!(outputs.last_applied(), None);
    }

    #[test]
    fn samples_are_cached() {
        let controller = Controller::new();
        controller.record_sample(3_000);
        assert_eq!(controller.latest_sample(), 3_000);
    }
}
