//! Host-side rig wiring the controller to recording drivers and a manual clock.

#![allow(dead_code)]

use controller_core::actuation::{ActuatorDriver, Indicator, IndicatorDriver, OutputStage};
use controller_core::clock::{ManualClock, Millis, MonotonicClock};
use controller_core::config::TICK_PERIOD_MS;
use controller_core::controller::{Controller, EdgeOutcome};
use controller_core::coordinator::{AnalogSampler, TickCoordinator, TickReport};
use controller_core::debounce::InputLine;
use controller_core::display::{DisplayError, StatusDisplay, StatusView};
use controller_core::mode::Mode;

#[derive(Default)]
pub struct RecordingActuator {
    pub writes: Vec<u8>,
}

impl ActuatorDriver for RecordingActuator {
    fn set_duty(&mut self, percent: u8) {
        self.writes.push(percent);
    }
}

#[derive(Default)]
pub struct RecordingIndicators {
    pub writes: Vec<Option<Indicator>>,
}

impl IndicatorDriver for RecordingIndicators {
    fn set_indicator(&mut self, indicator: Option<Indicator>) {
        self.writes.push(indicator);
    }
}

/// Latches the analog input when a conversion starts; the result is
/// delivered after the tick, the way the converter interrupt would.
#[derive(Default)]
pub struct LatchingSampler {
    pub input: u16,
    pub pending: Option<u16>,
    pub conversions: u32,
}

impl AnalogSampler for LatchingSampler {
    fn start_sample(&mut self) {
        self.pending = Some(self.input);
        self.conversions += 1;
    }
}

#[derive(Default)]
pub struct RecordingDisplay {
    pub frames: Vec<StatusView>,
    pub splash_shown: bool,
    pub failing: bool,
}

impl RecordingDisplay {
    fn draw(&mut self, view: StatusView) -> Result<(), DisplayError> {
        if self.failing {
            return Err(DisplayError::Bus);
        }
        self.frames.push(view);
        Ok(())
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show_splash(&mut self) -> Result<(), DisplayError> {
        self.splash_shown = true;
        Ok(())
    }

    fn show_ready(&mut self, mode: Mode) -> Result<(), DisplayError> {
        self.draw(StatusView::Ready { mode })
    }

    fn show_stopped(&mut self) -> Result<(), DisplayError> {
        self.draw(StatusView::Stopped)
    }

    fn show_unbounded(&mut self, mode: Mode) -> Result<(), DisplayError> {
        self.draw(StatusView::Unbounded { mode })
    }

    fn show_countdown(&mut self, mode: Mode, seconds_left: u16) -> Result<(), DisplayError> {
        self.draw(StatusView::Countdown { mode, seconds_left })
    }
}

pub struct Rig {
    pub controller: Controller,
    pub coordinator: TickCoordinator,
    pub sampler: LatchingSampler,
    pub outputs: OutputStage<RecordingActuator, RecordingIndicators>,
    pub display: RecordingDisplay,
    pub clock: ManualClock,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            controller: Controller::new(),
            coordinator: TickCoordinator::new(),
            sampler: LatchingSampler::default(),
            outputs: OutputStage::new(RecordingActuator::default(), RecordingIndicators::default()),
            display: RecordingDisplay::default(),
            clock: ManualClock::starting_at(Millis::new(1_000)),
        }
    }

    /// Sets the analog input level seen by future conversions.
    pub fn set_input(&mut self, level: u16) {
        self.sampler.input = level;
    }

    /// Sets the input and completes a conversion immediately.
    pub fn prime_sample(&mut self, level: u16) {
        self.set_input(level);
        self.controller.record_sample(level);
    }

    pub fn press(&mut self, line: InputLine) -> EdgeOutcome {
        self.controller
            .handle_edge(line, self.clock.now(), &mut self.outputs)
    }

    pub fn wait(&self, millis: u32) {
        self.clock.advance(millis);
    }

    pub fn tick(&mut self) -> TickReport {
        self.clock.advance(TICK_PERIOD_MS);
        let report = self.coordinator.on_tick(
            &self.controller,
            &mut self.sampler,
            &mut self.outputs,
            &mut self.display,
        );
        if let Some(sample) = self.sampler.pending.take() {
            self.controller.record_sample(sample);
        }
        report
    }

    pub fn run(&mut self, ticks: usize) -> Vec<TickReport> {
        (0..ticks).map(|_| self.tick()).collect()
    }

    pub fn last_duty(&self) -> Option<u8> {
        self.outputs.actuator().writes.last().copied()
    }

    pub fn last_indicator(&self) -> Option<Option<Indicator>> {
        self.outputs.indicators().writes.last().copied()
    }
}
