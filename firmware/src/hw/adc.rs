//! ADC1 wrapper for the intensity potentiometer on PA0.

use controller_core::config::SAMPLE_MAX;
use embassy_stm32::adc::{Adc, AnyAdcChannel, SampleTime};
use embassy_stm32::peripherals::ADC1;

/// Embassy ADC wrapper that produces successive 12-bit intensity samples.
pub struct IntensityAdc<'d> {
    adc: Adc<'d, ADC1>,
    channel: AnyAdcChannel<ADC1>,
}

impl<'d> IntensityAdc<'d> {
    /// Constructs the wrapper with a sample time long enough for a
    /// high-impedance potentiometer divider.
    pub fn new(mut adc: Adc<'d, ADC1>, channel: AnyAdcChannel<ADC1>) -> Self {
        adc.set_sample_time(SampleTime::CYCLES84);
        Self { adc, channel }
    }

    /// Performs one blocking conversion.
    pub fn read(&mut self) -> u16 {
        self.adc.blocking_read(&mut self.channel).min(SAMPLE_MAX)
    }
}
