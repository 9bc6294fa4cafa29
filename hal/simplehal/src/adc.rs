//! ADC abstractions
//!
//! ADC1 is a 10-bit successive approximation converter with eight external
//! inputs and an internal reference channel.

use crate::gpio::Pin;

/// Largest conversion result (10-bit)
pub const ADC_MAX_VALUE: u16 = 1023;

/// Nominal internal reference voltage
pub const VREFINT_VOLTS: f32 = 1.2;

/// ADC input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdcChannel {
    A0 = 0,
    A1 = 1,
    A2 = 2,
    A3 = 3,
    A4 = 4,
    A5 = 5,
    A6 = 6,
    A7 = 7,
    /// Internal reference voltage
    Vrefint = 8,
}

impl AdcChannel {
    /// Channel number used in the sequence registers
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Pin carrying this input; `None` for internal channels
    pub const fn pin(self) -> Option<Pin> {
        match self {
            AdcChannel::A0 => Some(Pin::PA2),
            AdcChannel::A1 => Some(Pin::PA1),
            AdcChannel::A2 => Some(Pin::PC4),
            AdcChannel::A3 => Some(Pin::PD2),
            AdcChannel::A4 => Some(Pin::PD3),
            AdcChannel::A5 => Some(Pin::PD5),
            AdcChannel::A6 => Some(Pin::PD6),
            AdcChannel::A7 => Some(Pin::PD4),
            AdcChannel::Vrefint => None,
        }
    }
}

/// Sample time in ADC clock cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SampleTime {
    Cycles3 = 0,
    Cycles9 = 1,
    Cycles15 = 2,
    Cycles30 = 3,
    Cycles43 = 4,
    Cycles57 = 5,
    Cycles73 = 6,
    #[default]
    Cycles241 = 7,
}

/// ADC1 register access
///
/// The DMA request bit is owned by [`crate::DmaController`] through
/// `Peripheral::Adc1`.
pub trait AdcController {
    /// Clock the ADC, put the pin of `channel` into analog mode and set up
    /// continuous single-channel conversion, right aligned, software trigger
    fn configure_continuous(&mut self, channel: AdcChannel, sample_time: SampleTime);

    /// Run reset calibration followed by calibration
    fn calibrate(&mut self);

    /// Start conversions (software trigger)
    fn start(&mut self);

    /// Stop conversions and power the converter down
    fn stop(&mut self);
}
