use controller_core::clock::MonotonicClock;
use controller_core::debounce::InputLine;
use embassy_stm32::exti::ExtiInput;

use super::{CONTROLLER, SharedOutputs, TELEMETRY};
use crate::hw::BoardClock;

/// Watches one active-low button and feeds its falling edges to the
/// controller. The edge timestamp is taken as soon as the task wakes.
#[embassy_executor::task(pool_size = 4)]
pub async fn run(
    mut button: ExtiInput<'static>,
    line: InputLine,
    outputs: &'static SharedOutputs,
) -> ! {
    loop {
        button.wait_for_falling_edge().await;
        let now = BoardClock.now();

        let outcome =
            outputs.lock(|stage| CONTROLLER.handle_edge(line, now, &mut *stage.borrow_mut()));

        TELEMETRY.lock(|telemetry| telemetry.borrow_mut().record_edge(&outcome, now));
    }
}
