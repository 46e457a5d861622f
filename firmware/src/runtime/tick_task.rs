use controller_core::clock::MonotonicClock;
use controller_core::config::TICK_PERIOD_MS;
use controller_core::coordinator::TickCoordinator;
use embassy_time::{Duration, Ticker};

use super::{CONTROLLER, FRAMES, SAMPLE_REQUESTS, SPLASH_DONE, SharedOutputs, TELEMETRY};
use crate::hw::panel::FrameRequests;
use crate::hw::{BoardClock, SampleRequests};

/// Periodic 100 ms tick, started once the boot splash has been shown.
#[embassy_executor::task]
pub async fn run(outputs: &'static SharedOutputs) -> ! {
    SPLASH_DONE.wait().await;
    defmt::info!("tick started every {}ms", TICK_PERIOD_MS);

    let mut coordinator = TickCoordinator::new();
    let mut sampler = SampleRequests::new(&SAMPLE_REQUESTS);
    let mut display = FrameRequests::new(&FRAMES);
    let mut ticker = Ticker::every(Duration::from_millis(u64::from(TICK_PERIOD_MS)));

    loop {
        ticker.next().await;

        let report = outputs.lock(|stage| {
            let mut stage = stage.borrow_mut();
            coordinator.on_tick(&CONTROLLER, &mut sampler, &mut *stage, &mut display)
        });

        let now = BoardClock.now();
        TELEMETRY.lock(|telemetry| telemetry.borrow_mut().record_tick(&report, now));
    }
}
