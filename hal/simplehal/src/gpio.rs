//! GPIO pin identifiers
//!
//! The CH32V003 in its common packages bonds out PA1-PA2, PC0-PC7 and
//! PD2-PD7. Pins double as ADC inputs and timer outputs; the mapping is
//! fixed in silicon.

use crate::adc::AdcChannel;

/// GPIO port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A,
    C,
    D,
}

/// Bonded-out GPIO pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pin {
    PA1,
    PA2,
    PC0,
    PC1,
    PC2,
    PC3,
    PC4,
    PC5,
    PC6,
    PC7,
    PD2,
    PD3,
    PD4,
    PD5,
    PD6,
    PD7,
}

impl Pin {
    /// Port the pin belongs to
    pub const fn port(self) -> Port {
        match self {
            Pin::PA1 | Pin::PA2 => Port::A,
            Pin::PC0
            | Pin::PC1
            | Pin::PC2
            | Pin::PC3
            | Pin::PC4
            | Pin::PC5
            | Pin::PC6
            | Pin::PC7 => Port::C,
            _ => Port::D,
        }
    }

    /// Pin number within its port (0-7)
    pub const fn number(self) -> u8 {
        match self {
            Pin::PA1 => 1,
            Pin::PA2 => 2,
            Pin::PC0 => 0,
            Pin::PC1 => 1,
            Pin::PC2 => 2,
            Pin::PC3 => 3,
            Pin::PC4 => 4,
            Pin::PC5 => 5,
            Pin::PC6 => 6,
            Pin::PC7 => 7,
            Pin::PD2 => 2,
            Pin::PD3 => 3,
            Pin::PD4 => 4,
            Pin::PD5 => 5,
            Pin::PD6 => 6,
            Pin::PD7 => 7,
        }
    }

    /// ADC input routed to this pin, if any
    pub const fn adc_channel(self) -> Option<AdcChannel> {
        match self {
            Pin::PA2 => Some(AdcChannel::A0),
            Pin::PA1 => Some(AdcChannel::A1),
            Pin::PC4 => Some(AdcChannel::A2),
            Pin::PD2 => Some(AdcChannel::A3),
            Pin::PD3 => Some(AdcChannel::A4),
            Pin::PD5 => Some(AdcChannel::A5),
            Pin::PD6 => Some(AdcChannel::A6),
            Pin::PD4 => Some(AdcChannel::A7),
            _ => None,
        }
    }
}
