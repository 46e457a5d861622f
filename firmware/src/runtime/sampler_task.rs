use super::{CONTROLLER, SAMPLE_REQUESTS};
use crate::hw::adc::IntensityAdc;

/// Runs conversions on request and publishes them to the sample cache.
///
/// One conversion is taken up front so the first tick derives from a real
/// reading instead of the zeroed cache.
#[embassy_executor::task]
pub async fn run(mut adc: IntensityAdc<'static>) -> ! {
    CONTROLLER.record_sample(adc.read());

    loop {
        SAMPLE_REQUESTS.wait().await;
        CONTROLLER.record_sample(adc.read());
    }
}
