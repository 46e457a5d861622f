//! Board drivers behind the `controller-core` hardware seams.
//!
//! Pin map (STM32F401CC):
//!
//! | Function          | Pin  | Peripheral  |
//! |-------------------|------|-------------|
//! | intensity input   | PA0  | ADC1_IN0    |
//! | LED1 / LED2 / LED3| PA1..PA3 | GPIO    |
//! | power button      | PA6  | EXTI6       |
//! | 10 / 20 / 30 s    | PA7, PB0, PB1 | EXTI7, EXTI0, EXTI1 |
//! | actuator PWM      | PB7  | TIM4_CH2    |
//! | status panel      | PB8 / PB9 | I2C1 SCL / SDA |

pub mod adc;
pub mod panel;

use controller_core::actuation::{ActuatorDriver, Indicator, IndicatorDriver};
use controller_core::clock::{Millis, MonotonicClock};
use controller_core::coordinator::AnalogSampler;
use embassy_stm32::gpio::{Level, Output};
use embassy_stm32::peripherals::TIM4;
use embassy_stm32::timer::simple_pwm::SimplePwm;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;

/// Wakes the sampler task when the tick wants a fresh conversion.
pub type SampleSignal = Signal<CriticalSectionRawMutex, ()>;

/// Embassy time driver exposed as the controller's millisecond clock.
#[derive(Copy, Clone, Default)]
pub struct BoardClock;

impl MonotonicClock for BoardClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now(&self) -> Millis {
        // Truncation wraps after ~49 days; every consumer uses wrapping math.
        Millis::new(Instant::now().as_millis() as u32)
    }
}

/// TIM4 channel 2 driving the actuator at the configured PWM frequency.
pub struct PwmActuator<'d> {
    pwm: SimplePwm<'d, TIM4>,
}

impl<'d> PwmActuator<'d> {
    /// Takes ownership of the timer and starts channel 2 fully off.
    pub fn new(mut pwm: SimplePwm<'d, TIM4>) -> Self {
        let mut channel = pwm.ch2();
        channel.set_duty_cycle_fully_off();
        channel.enable();
        Self { pwm }
    }
}

impl ActuatorDriver for PwmActuator<'_> {
    fn set_duty(&mut self, percent: u8) {
        self.pwm.ch2().set_duty_cycle_percent(percent.min(100));
    }
}

/// The three mode LEDs, active high.
pub struct LedIndicators<'d> {
    leds: [Output<'d>; 3],
}

impl<'d> LedIndicators<'d> {
    pub fn new(led1: Output<'d>, led2: Output<'d>, led3: Output<'d>) -> Self {
        Self {
            leds: [led1, led2, led3],
        }
    }
}

impl IndicatorDriver for LedIndicators<'_> {
    fn set_indicator(&mut self, indicator: Option<Indicator>) {
        let lit = indicator.map(Indicator::as_index);
        for (index, led) in self.leds.iter_mut().enumerate() {
            let level = if lit == Some(index) {
                Level::High
            } else {
                Level::Low
            };
            led.set_level(level);
        }
    }
}

/// Sampler seam for the tick: requests a conversion from the sampler task.
pub struct SampleRequests {
    signal: &'static SampleSignal,
}

impl SampleRequests {
    pub const fn new(signal: &'static SampleSignal) -> Self {
        Self { signal }
    }
}

impl AnalogSampler for SampleRequests {
    fn start_sample(&mut self) {
        self.signal.signal(());
    }
}
