//! The 100 ms tick coordinator.
//!
//! One call to [`TickCoordinator::on_tick`] performs, in order:
//!
//! 1. kick off the next analog conversion (its result lands before a later
//!    tick, so derivation always reads the previous sample);
//! 2. derive the mode from the cached sample unless a manual override is
//!    pending or power is off;
//! 3. actuate the outputs from the freshly derived mode;
//! 4. on the slower sub-cadences, refresh the status display and step the
//!    countdown.
//!
//! The sub-cadence counters are owned by the coordinator, which lives in the
//! tick context only; everything shared goes through [`Controller`].

use crate::actuation::{ActuatorDriver, IndicatorDriver, OutputCommand, OutputStage};
use crate::config::TickSchedule;
use crate::controller::Controller;
use crate::display::{DisplayError, StatusDisplay, StatusView};
use crate::mode::derive_mode;
use crate::state::{Effect, StateEvent, SystemState, transition};

/// Analog sampling unit.
pub trait AnalogSampler {
    /// Requests a conversion without waiting for it. The result is delivered
    /// later through [`Controller::record_sample`].
    fn start_sample(&mut self);
}

/// Outcome of a scheduled status refresh.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RefreshOutcome {
    pub view: StatusView,
    pub result: Result<(), DisplayError>,
}

impl RefreshOutcome {
    /// Returns `true` when the refresh was skipped because of a display fault.
    #[must_use]
    pub const fn skipped(&self) -> bool {
        self.result.is_err()
    }
}

/// Everything that happened during one tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TickReport {
    /// Sequence number of this tick since the coordinator was created.
    pub tick: u32,
    /// Sample the mode derivation read.
    pub sample: u16,
    /// Effect of the mode derivation step.
    pub derivation: Effect,
    /// Output levels written this tick.
    pub output: OutputCommand,
    /// Status refresh, when the 500 ms slot fell on this tick.
    pub refresh: Option<RefreshOutcome>,
    /// Countdown step, when the 1000 ms slot fell on this tick.
    pub countdown: Option<Effect>,
    /// State after the tick completed.
    pub state: SystemState,
}

/// Sequencer driven by the periodic hardware tick.
#[derive(Clone, Debug)]
pub struct TickCoordinator {
    schedule: TickSchedule,
    refresh_ticks: u8,
    countdown_ticks: u8,
    ticks: u32,
}

impl TickCoordinator {
    /// Creates a coordinator with the board's default sub-cadences.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_schedule(TickSchedule::new(
            crate::config::STATUS_REFRESH_TICKS,
            crate::config::COUNTDOWN_STEP_TICKS,
        ))
    }

    /// Creates a coordinator with an explicit schedule.
    #[must_use]
    pub const fn with_schedule(schedule: TickSchedule) -> Self {
        Self {
            schedule,
            refresh_ticks: 0,
            countdown_ticks: 0,
            ticks: 0,
        }
    }

    /// Number of ticks processed so far (wrapping).
    #[must_use]
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Runs one tick.
    pub fn on_tick<S, A, I, D>(
        &mut self,
        controller: &Controller,
        sampler: &mut S,
        outputs: &mut OutputStage<A, I>,
        display: &mut D,
    ) -> TickReport
    where
        S: AnalogSampler,
        A: ActuatorDriver,
        I: IndicatorDriver,
        D: StatusDisplay,
    {
        self.ticks = self.ticks.wrapping_add(1);

        sampler.start_sample();

        let sample = controller.latest_sample();
        let derived = derive_mode(sample);

        // Derivation and actuation share one critical section so a power-off
        // edge cannot land between them and be overwritten by stale levels.
        let (derivation, output) = controller.shared_state().update(|state| {
            let result = transition(*state, StateEvent::SampleEvaluated(derived));
            *state = result.state;
            let output = outputs.actuate(state.mode, state.operating_state);
            (result.effect, output)
        });

        self.refresh_ticks = self.refresh_ticks.saturating_add(1);
        self.countdown_ticks = self.countdown_ticks.saturating_add(1);

        let refresh = if self.refresh_ticks >= self.schedule.refresh_every() {
            self.refresh_ticks = 0;
            let view = StatusView::for_state(&controller.snapshot());
            Some(RefreshOutcome {
                view,
                result: display.show(view),
            })
        } else {
            None
        };

        let countdown = if self.countdown_ticks >= self.schedule.countdown_every() {
            self.countdown_ticks = 0;
            Some(
                controller
                    .shared_state()
                    .apply(StateEvent::SecondElapsed)
                    .effect,
            )
        } else {
            None
        };

        TickReport {
            tick: self.ticks,
            sample,
            derivation,
            output,
            refresh,
            countdown,
            state: controller.snapshot(),
        }
    }
}

impl Default for TickCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::Indicator;
    use crate::mode::Mode;
    use crate::state::OperatingState;

    #[derive(Default)]
    struct CountingSampler(u32);

    impl AnalogSampler for CountingSampler {
        fn start_sample(&mut self) {
            self.0 += 1;
        }
    }

    struct NullDuty;

    impl ActuatorDriver for NullDuty {
        fn set_duty(&mut self, _: u8) {}
    }

    struct NullLeds;

    impl IndicatorDriver for NullLeds {
        fn set_indicator(&mut self, _: Option<Indicator>) {}
    }

    #[derive(Default)]
    struct FlakyDisplay {
        fail_next: bool,
        frames: u32,
    }

    impl FlakyDisplay {
        fn draw(&mut self) -> Result<(), DisplayError> {
            if core::mem::take(&mut self.fail_next) {
                return Err(DisplayError::Timeout);
            }
            self.frames += 1;
            Ok(())
        }
    }

    impl StatusDisplay for FlakyDisplay {
        fn show_splash(&mut self) -> Result<(), DisplayError> {
            self.draw()
        }

        fn show_ready(&mut self, _: Mode) -> Result<(), DisplayError> {
            self.draw()
        }

        fn show_stopped(&mut self) -> Result<(), DisplayError> {
            self.draw()
        }

        fn show_unbounded(&mut self, _: Mode) -> Result<(), DisplayError> {
            self.draw()
        }

        fn show_countdown(&mut self, _: Mode, _: u16) -> Result<(), DisplayError> {
            self.draw()
        }
    }

    #[test]
    fn every_tick_starts_a_sample_and_actuates() {
        let controller = Controller::new();
        let mut coordinator = TickCoordinator::new();
        let mut sampler = CountingSampler::default();
        let mut outputs = OutputStage::new(NullDuty, NullLeds);
        let mut display = FlakyDisplay::default();

        controller.record_sample(3_000);
        for _ in 0..3 {
            coordinator.on_tick(&controller, &mut sampler, &mut outputs, &mut display);
        }

        assert_eq!(sampler.0, 3);
        assert_eq!(coordinator.ticks(), 3);
        assert_eq!(
            outputs.last_applied(),
            Some(OutputCommand {
                duty_percent: 100,
                indicator: Some(Indicator::Led3),
            })
        );
    }

    #[test]
    fn refresh_runs_every_fifth_tick() {
        let controller = Controller::new();
        let mut coordinator = TickCoordinator::new();
        let mut sampler = CountingSampler::default();
        let mut outputs = OutputStage::new(NullDuty, NullLeds);
        let mut display = FlakyDisplay::default();

        let refreshed: heapless::Vec<u32, 8> = (0..20)
            .filter_map(|_| {
                let report =
                    coordinator.on_tick(&controller, &mut sampler, &mut outputs, &mut display);
                report.refresh.map(|_| report.tick)
            })
            .collect();

        assert_eq!(refreshed.as_slice(), &[5, 10, 15, 20]);
        assert_eq!(display.frames, 4);
    }

    #[test]
    fn failed_refresh_is_skipped_and_retried_next_slot() {
        let controller = Controller::new();
        let mut coordinator = TickCoordinator::new();
        let mut sampler = CountingSampler::default();
        let mut outputs = OutputStage::new(NullDuty, NullLeds);
        let mut display = FlakyDisplay {
            fail_next: true,
            frames: 0,
        };

        let mut outcomes: heapless::Vec<RefreshOutcome, 2> = heapless::Vec::new();
        for _ in 0..10 {
            let report = coordinator.on_tick(&controller, &mut sampler, &mut outputs, &mut display);
            if let Some(outcome) = report.refresh {
                outcomes.push(outcome).expect("two refresh slots");
            }
        }

        assert!(outcomes[0].skipped());
        assert_eq!(outcomes[0].result, Err(DisplayError::Timeout));
        assert!(!outcomes[1].skipped());
        assert_eq!(display.frames, 1);
    }

    #[test]
    fn derivation_uses_sample_cached_before_the_tick() {
        let controller = Controller::new();
        let mut coordinator = TickCoordinator::new();
        let mut sampler = CountingSampler::default();
        let mut outputs = OutputStage::new(NullDuty, NullLeds);
        let mut display = FlakyDisplay::default();

        controller.record_sample(1_500);
        let report = coordinator.on_tick(&controller, &mut sampler, &mut outputs, &mut display);

        assert_eq!(report.sample, 1_500);
        assert_eq!(
            report.derivation,
            Effect::ModeChanged {
                from: Mode::Low,
                to: Mode::Medium
            }
        );
        assert_eq!(report.output.duty_percent, 80);
        assert_eq!(report.state.operating_state, OperatingState::Unbounded);
    }
}
