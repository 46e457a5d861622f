use controller_core::clock::MonotonicClock;
use controller_core::config::SPLASH_DURATION;
use controller_core::display::{DisplayError, StatusDisplay};
use embassy_time::{Duration, Timer};

use super::{FRAMES, SPLASH_DONE, TELEMETRY};
use crate::hw::BoardClock;
use crate::hw::panel::StatusPanel;

/// Owns the panel: shows the splash, releases the tick, then draws
/// whatever frame the tick posted last.
#[embassy_executor::task]
pub async fn run(mut panel: StatusPanel<'static>) -> ! {
    if let Err(error) = panel.init().and_then(|()| panel.show_splash()) {
        defmt::warn!("status panel unavailable: {}", defmt::Display2Format(&error));
        record_fault(error);
    }

    Timer::after(Duration::try_from(SPLASH_DURATION).unwrap_or(Duration::MAX)).await;
    SPLASH_DONE.signal(());

    loop {
        let frame = FRAMES.wait().await;
        if let Err(error) = panel.draw(frame) {
            record_fault(error);
        }
    }
}

fn record_fault(error: DisplayError) {
    let now = BoardClock.now();
    TELEMETRY.lock(|telemetry| {
        telemetry.borrow_mut().record_display_fault(error, now);
    });
}
