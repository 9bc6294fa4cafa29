//! Reset and clock control
//!
//! Bus clock gates and reset lines for the peripherals the drivers use,
//! the LSI oscillator and the reset cause flags.

use simplehal::gpio::Port;

use crate::regs;

const AHB_DMA1: u32 = 1 << 0;

const APB2_IOPA: u32 = 1 << 2;
const APB2_IOPC: u32 = 1 << 4;
const APB2_IOPD: u32 = 1 << 5;
const APB2_ADC1: u32 = 1 << 9;

const APB1_WWDG: u32 = 1 << 11;

/// ADCPRE field of CFGR0 (bits 15:11)
const CFGR0_ADCPRE_SHIFT: u32 = 11;
const CFGR0_ADCPRE_WIDTH: u32 = 5;
/// HCLK / 8
const ADCPRE_DIV8: u32 = 0b11000;

const RSTSCKR_LSION: u32 = 1 << 0;
const RSTSCKR_LSIRDY: u32 = 1 << 1;
const RSTSCKR_RMVF: u32 = 1 << 24;

/// Reset cause flags from RSTSCKR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetFlags {
    pub pin: bool,
    pub power_on: bool,
    pub software: bool,
    pub independent_watchdog: bool,
    pub window_watchdog: bool,
    pub low_power: bool,
}

impl ResetFlags {
    /// Decode the upper byte of RSTSCKR
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            pin: bits & (1 << 26) != 0,
            power_on: bits & (1 << 27) != 0,
            software: bits & (1 << 28) != 0,
            independent_watchdog: bits & (1 << 29) != 0,
            window_watchdog: bits & (1 << 30) != 0,
            low_power: bits & (1 << 31) != 0,
        }
    }
}

/// Read the reset cause flags
pub fn reset_flags() -> ResetFlags {
    ResetFlags::from_bits(regs::rcc().rstsckr.read())
}

/// Clear every reset cause flag
pub fn clear_reset_flags() {
    regs::rcc().rstsckr.set_bits(RSTSCKR_RMVF);
}

pub(crate) fn enable_dma1() {
    regs::rcc().ahbpcenr.set_bits(AHB_DMA1);
}

pub(crate) fn enable_gpio(port: Port) {
    let bit = match port {
        Port::A => APB2_IOPA,
        Port::C => APB2_IOPC,
        Port::D => APB2_IOPD,
    };
    regs::rcc().apb2pcenr.set_bits(bit);
}

/// Clock ADC1 at HCLK/8 and pulse its reset line
pub(crate) fn enable_adc1() {
    let rcc = regs::rcc();
    rcc.apb2pcenr.set_bits(APB2_ADC1);
    rcc.cfgr0
        .write_field(CFGR0_ADCPRE_SHIFT, CFGR0_ADCPRE_WIDTH, ADCPRE_DIV8);
    rcc.apb2prstr.set_bits(APB2_ADC1);
    rcc.apb2prstr.clear_bits(APB2_ADC1);
}

pub(crate) fn enable_wwdg() {
    regs::rcc().apb1pcenr.set_bits(APB1_WWDG);
}

/// Pulse the WWDG reset line, returning it to its power-on state
pub(crate) fn reset_wwdg() {
    let rcc = regs::rcc();
    rcc.apb1prstr.set_bits(APB1_WWDG);
    rcc.apb1prstr.clear_bits(APB1_WWDG);
}

/// Start the LSI oscillator and wait until it is stable
pub(crate) fn enable_lsi() {
    let rcc = regs::rcc();
    rcc.rstsckr.set_bits(RSTSCKR_LSION);
    while !rcc.rstsckr.is_set(RSTSCKR_LSIRDY) {}
}
