//! ADC1 controller

use simplehal::adc::{AdcChannel, SampleTime};
use simplehal::gpio::{Pin, Port};
use simplehal::AdcController;

use crate::{rcc, regs};

const CTLR1_SCAN: u32 = 1 << 8;

const CTLR2_ADON: u32 = 1 << 0;
const CTLR2_CONT: u32 = 1 << 1;
const CTLR2_CAL: u32 = 1 << 2;
const CTLR2_RSTCAL: u32 = 1 << 3;
const CTLR2_ALIGN: u32 = 1 << 11;
const CTLR2_EXTSEL_SWSTART: u32 = 0b111 << 17;
const CTLR2_EXTTRIG: u32 = 1 << 20;
const CTLR2_SWSTART: u32 = 1 << 22;

const RSQR1_L_SHIFT: u32 = 20;
const RSQR1_L_WIDTH: u32 = 4;
const RSQR3_SQ1_WIDTH: u32 = 5;
const SAMPTR_WIDTH: u32 = 3;

/// CFGLR with `pin` switched to analog input (MODE = 00, CNF = 00)
pub(crate) const fn analog_cfglr(cfglr: u32, pin: u8) -> u32 {
    cfglr & !(0xF << (pin as u32 * 4))
}

fn set_analog(pin: Pin) {
    let port = pin.port();
    rcc::enable_gpio(port);
    let gpio = match port {
        Port::A => regs::gpioa(),
        Port::C => regs::gpioc(),
        Port::D => regs::gpiod(),
    };
    gpio.cfglr.modify(|v| analog_cfglr(v, pin.number()));
}

/// ADC1 register interface
pub struct Adc {
    _private: (),
}

impl Adc {
    pub(crate) const fn new() -> Self {
        Self { _private: () }
    }
}

impl AdcController for Adc {
    fn configure_continuous(&mut self, channel: AdcChannel, sample_time: SampleTime) {
        if let Some(pin) = channel.pin() {
            set_analog(pin);
        }
        rcc::enable_adc1();

        let adc = regs::adc1();
        adc.ctlr1.clear_bits(CTLR1_SCAN);
        adc.ctlr2.modify(|v| {
            (v & !(CTLR2_ALIGN | CTLR2_SWSTART)) | CTLR2_CONT | CTLR2_EXTSEL_SWSTART | CTLR2_EXTTRIG
        });
        adc.rsqr1.write_field(RSQR1_L_SHIFT, RSQR1_L_WIDTH, 0);
        adc.rsqr3
            .write_field(0, RSQR3_SQ1_WIDTH, channel.number() as u32);
        adc.samptr2.write_field(
            channel.number() as u32 * SAMPTR_WIDTH,
            SAMPTR_WIDTH,
            sample_time as u32,
        );
        adc.ctlr2.set_bits(CTLR2_ADON);
        debug!("ADC channel {} continuous", channel.number());
    }

    fn calibrate(&mut self) {
        let adc = regs::adc1();
        adc.ctlr2.set_bits(CTLR2_RSTCAL);
        while adc.ctlr2.is_set(CTLR2_RSTCAL) {}
        adc.ctlr2.set_bits(CTLR2_CAL);
        while adc.ctlr2.is_set(CTLR2_CAL) {}
    }

    fn start(&mut self) {
        regs::adc1().ctlr2.set_bits(CTLR2_SWSTART);
    }

    fn stop(&mut self) {
        let adc = regs::adc1();
        adc.ctlr2.clear_bits(CTLR2_SWSTART | CTLR2_EXTTRIG);
        adc.ctlr2.clear_bits(CTLR2_ADON);
    }
}
