use core::cell::RefCell;

use cortex_m::register::primask;
use cortex_m_rt::entry;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::{Executor, InterruptExecutor};
use embassy_stm32 as hal;
use embassy_stm32::adc::{Adc, AdcChannel};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, OutputType, Pull, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use static_cell::StaticCell;

use controller_core::actuation::OutputStage;
use controller_core::controller::Controller;
use controller_core::debounce::InputLine;

use crate::hw::adc::IntensityAdc;
use crate::hw::panel::{FrameSignal, StatusPanel};
use crate::hw::{LedIndicators, PwmActuator, SampleSignal};
use crate::telemetry::TelemetryRecorder;

mod button_task;
mod display_task;
mod sampler_task;
mod tick_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        cortex_m::interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                cortex_m::interrupt::enable();
            }
        }
    }
}

/// Output stage owned by the board, shared by the tick and the edge handlers.
pub(super) type BoardOutputs = OutputStage<PwmActuator<'static>, LedIndicators<'static>>;

/// Lock around [`BoardOutputs`]; every holder runs inside a critical section.
pub(super) type SharedOutputs = Mutex<CriticalSectionRawMutex, RefCell<BoardOutputs>>;

/// Actuator PWM carrier frequency.
const PWM_FREQUENCY: Hertz = Hertz(100);

/// I2C1 clock for the status panel.
const PANEL_I2C_FREQUENCY: Hertz = Hertz(400_000);

pub(super) static CONTROLLER: Controller = Controller::new();
pub(super) static TELEMETRY: Mutex<CriticalSectionRawMutex, RefCell<TelemetryRecorder>> =
    Mutex::new(RefCell::new(TelemetryRecorder::new()));
pub(super) static SAMPLE_REQUESTS: SampleSignal = Signal::new();
pub(super) static FRAMES: FrameSignal = Signal::new();
pub(super) static SPLASH_DONE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

static OUTPUTS: StaticCell<SharedOutputs> = StaticCell::new();
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_LOW: StaticCell<Executor> = StaticCell::new();

#[interrupt]
unsafe fn USART6() {
    unsafe { EXECUTOR_HIGH.on_interrupt() }
}

#[entry]
fn main() -> ! {
    let p = hal::init(hal::Config::default());
    defmt::info!(
        "{} {} booting",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let pwm = SimplePwm::new(
        p.TIM4,
        None,
        Some(PwmPin::new(p.PB7, OutputType::PushPull)),
        None,
        None,
        PWM_FREQUENCY,
        Default::default(),
    );
    let leds = LedIndicators::new(
        Output::new(p.PA1, Level::Low, Speed::Low),
        Output::new(p.PA2, Level::Low, Speed::Low),
        Output::new(p.PA3, Level::Low, Speed::Low),
    );
    let outputs: &'static SharedOutputs = OUTPUTS.init(Mutex::new(RefCell::new(
        OutputStage::new(PwmActuator::new(pwm), leds),
    )));

    let adc = IntensityAdc::new(Adc::new(p.ADC1), p.PA0.degrade_adc());

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = PANEL_I2C_FREQUENCY;
    let panel = StatusPanel::new(I2c::new_blocking(p.I2C1, p.PB8, p.PB9, i2c_config));

    let power = ExtiInput::new(p.PA6, p.EXTI6, Pull::Up);
    let countdown_10 = ExtiInput::new(p.PA7, p.EXTI7, Pull::Up);
    let countdown_20 = ExtiInput::new(p.PB0, p.EXTI0, Pull::Up);
    let countdown_30 = ExtiInput::new(p.PB1, p.EXTI1, Pull::Up);

    // Tick and power toggle preempt everything on the thread-mode executor.
    interrupt::USART6.set_priority(Priority::P6);
    let high = EXECUTOR_HIGH.start(interrupt::USART6);
    defmt::unwrap!(high.spawn(tick_task::run(outputs)));
    defmt::unwrap!(high.spawn(button_task::run(power, InputLine::PowerToggle, outputs)));

    let executor = EXECUTOR_LOW.init(Executor::new());
    executor.run(|spawner| {
        defmt::unwrap!(spawner.spawn(sampler_task::run(adc)));
        defmt::unwrap!(spawner.spawn(display_task::run(panel)));
        defmt::unwrap!(spawner.spawn(button_task::run(
            countdown_10,
            InputLine::Countdown10,
            outputs
        )));
        defmt::unwrap!(spawner.spawn(button_task::run(
            countdown_20,
            InputLine::Countdown20,
            outputs
        )));
        defmt::unwrap!(spawner.spawn(button_task::run(
            countdown_30,
            InputLine::Countdown30,
            outputs
        )));
    })
}
