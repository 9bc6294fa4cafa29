//! DMA1 controller
//!
//! [`Dma1`] implements [`DmaController`] on the DMA1 registers. Channel
//! status and callbacks live in [`DMA_STATE`], shared with the channel
//! interrupts through [`on_interrupt`].

use simplehal::dma::{
    Channel, ChannelFlags, DataSize, Direction, DmaConfig, Mode, Peripheral, Priority, Request,
};
use simplehal::DmaController;
use simplehal_core::dma::{handle_interrupt, Dma, DmaState};

use crate::pfic::{self, Interrupt};
use crate::{rcc, regs};

/// Status and callback table of the seven channels
pub static DMA_STATE: DmaState = DmaState::new();

const CFGR_EN: u32 = 1 << 0;
const CFGR_TCIE: u32 = 1 << 1;
const CFGR_HTIE: u32 = 1 << 2;
const CFGR_TEIE: u32 = 1 << 3;
const CFGR_DIR: u32 = 1 << 4;
const CFGR_CIRC: u32 = 1 << 5;
const CFGR_PINC: u32 = 1 << 6;
const CFGR_MINC: u32 = 1 << 7;
const CFGR_PSIZE_SHIFT: u32 = 8;
const CFGR_MSIZE_SHIFT: u32 = 10;
const CFGR_PL_SHIFT: u32 = 12;
const CFGR_MEM2MEM: u32 = 1 << 14;

const CFGR_IRQ_MASK: u32 = CFGR_TCIE | CFGR_HTIE | CFGR_TEIE;

const FLAG_GIF: u32 = 1 << 0;
const FLAG_TCIF: u32 = 1 << 1;
const FLAG_HTIF: u32 = 1 << 2;
const FLAG_TEIF: u32 = 1 << 3;

// Peripheral DMA request enables
const ADC_CTLR2_DMA: u32 = 1 << 8;
const USART_CTLR3_DMAR: u32 = 1 << 6;
const USART_CTLR3_DMAT: u32 = 1 << 7;
const SPI_CTLR2_RXDMAEN: u32 = 1 << 0;
const SPI_CTLR2_TXDMAEN: u32 = 1 << 1;
const I2C_CTLR2_DMAEN: u32 = 1 << 11;
const TIM_DMAINTENR_UDE: u32 = 1 << 8;

/// CFGR value for `config`, interrupt enables and EN excluded
pub(crate) fn cfgr_bits(config: &DmaConfig) -> u32 {
    let mut bits = match config.direction {
        Direction::PeripheralToMemory => 0,
        Direction::MemoryToPeripheral => CFGR_DIR,
        Direction::MemoryToMemory => CFGR_MEM2MEM,
    };
    if config.mode == Mode::Circular {
        bits |= CFGR_CIRC;
    }
    if config.periph_increment {
        bits |= CFGR_PINC;
    }
    if config.mem_increment {
        bits |= CFGR_MINC;
    }

    let size = match config.data_size {
        DataSize::Byte => 0,
        DataSize::HalfWord => 1,
        DataSize::Word => 2,
    };
    let priority = match config.priority {
        Priority::Low => 0,
        Priority::Medium => 1,
        Priority::High => 2,
        Priority::VeryHigh => 3,
    };
    bits | (size << CFGR_PSIZE_SHIFT) | (size << CFGR_MSIZE_SHIFT) | (priority << CFGR_PL_SHIFT)
}

fn flag_shift(channel: Channel) -> u32 {
    4 * channel.index() as u32
}

/// Flags of `channel` from an INTFR value
pub(crate) fn decode_flags(intfr: u32, channel: Channel) -> ChannelFlags {
    let bits = intfr >> flag_shift(channel);
    ChannelFlags {
        complete: bits & FLAG_TCIF != 0,
        half: bits & FLAG_HTIF != 0,
        error: bits & FLAG_TEIF != 0,
    }
}

/// INTFCR value clearing `flags` of `channel`
///
/// Clearing every flag also clears the global flag.
pub(crate) fn encode_clear(channel: Channel, flags: ChannelFlags) -> u32 {
    let mut bits = 0;
    if flags.complete {
        bits |= FLAG_TCIF;
    }
    if flags.half {
        bits |= FLAG_HTIF;
    }
    if flags.error {
        bits |= FLAG_TEIF;
    }
    if flags == ChannelFlags::ALL {
        bits |= FLAG_GIF;
    }
    bits << flag_shift(channel)
}

/// DMA1 register interface
pub struct Dma1 {
    _private: (),
}

impl Dma1 {
    pub(crate) const fn new() -> Self {
        Self { _private: () }
    }

    /// Wrap in the channel engine, bound to [`DMA_STATE`]
    pub fn engine(self) -> Dma<'static, Dma1> {
        Dma::new(self, &DMA_STATE)
    }
}

impl DmaController for Dma1 {
    fn enable_clock(&mut self) {
        rcc::enable_dma1();
    }

    fn configure(&mut self, config: &DmaConfig) {
        let ch = &regs::dma1().ch[config.channel.index()];
        let irq = ch.cfgr.read() & CFGR_IRQ_MASK;
        ch.cfgr.write(irq);
        ch.cntr.write(config.buffer_size as u32);
        ch.paddr.write(config.periph_addr as u32);
        ch.maddr.write(config.mem_addr as u32);
        ch.cfgr.write(cfgr_bits(config) | irq);
        trace!(
            "DMA channel {} cfgr {=u32:#x}",
            config.channel.number(),
            ch.cfgr.read()
        );
    }

    fn set_enabled(&mut self, channel: Channel, enabled: bool) {
        regs::dma1().ch[channel.index()]
            .cfgr
            .write_bit(CFGR_EN, enabled);
    }

    fn set_transfer(&mut self, channel: Channel, mem_addr: usize, count: u16) {
        let ch = &regs::dma1().ch[channel.index()];
        ch.maddr.write(mem_addr as u32);
        ch.cntr.write(count as u32);
    }

    fn remaining(&self, channel: Channel) -> u16 {
        regs::dma1().ch[channel.index()].cntr.read() as u16
    }

    fn flags(&self, channel: Channel) -> ChannelFlags {
        decode_flags(regs::dma1().intfr.read(), channel)
    }

    fn clear_flags(&mut self, channel: Channel, flags: ChannelFlags) {
        regs::dma1().intfcr.write(encode_clear(channel, flags));
    }

    fn set_interrupts(&mut self, channel: Channel, complete: bool, error: bool) {
        let cfgr = &regs::dma1().ch[channel.index()].cfgr;
        cfgr.write_bit(CFGR_TCIE, complete);
        cfgr.write_bit(CFGR_TEIE, error);
    }

    fn set_irq_enabled(&mut self, channel: Channel, enabled: bool) {
        pfic::set_enabled(Interrupt::dma(channel), enabled);
    }

    fn peripheral_address(&self, peripheral: Peripheral) -> usize {
        match peripheral {
            Peripheral::Adc1 => regs::ADC1_RDATAR,
            Peripheral::Usart1 => regs::USART1_DATAR,
            Peripheral::Spi1 => regs::SPI1_DATAR,
            Peripheral::I2c1 => regs::I2C1_DATAR,
            Peripheral::Tim1 => regs::TIM1_CH1CVR,
            Peripheral::Tim2 => regs::TIM2_CH1CVR,
        }
    }

    fn set_peripheral_request(&mut self, peripheral: Peripheral, request: Request, enabled: bool) {
        match (peripheral, request) {
            (Peripheral::Adc1, _) => regs::adc1().ctlr2.write_bit(ADC_CTLR2_DMA, enabled),
            (Peripheral::Usart1, Request::Tx) => {
                regs::usart1().ctlr3.write_bit(USART_CTLR3_DMAT, enabled)
            }
            (Peripheral::Usart1, Request::Rx) => {
                regs::usart1().ctlr3.write_bit(USART_CTLR3_DMAR, enabled)
            }
            (Peripheral::Spi1, Request::Tx) => {
                regs::spi1().ctlr2.write_bit(SPI_CTLR2_TXDMAEN, enabled)
            }
            (Peripheral::Spi1, Request::Rx) => {
                regs::spi1().ctlr2.write_bit(SPI_CTLR2_RXDMAEN, enabled)
            }
            (Peripheral::I2c1, _) => regs::i2c1().ctlr2.write_bit(I2C_CTLR2_DMAEN, enabled),
            (Peripheral::Tim1, _) => regs::tim1().dmaintenr.write_bit(TIM_DMAINTENR_UDE, enabled),
            (Peripheral::Tim2, _) => regs::tim2().dmaintenr.write_bit(TIM_DMAINTENR_UDE, enabled),
        }
    }
}

/// Service a DMA1 channel interrupt
///
/// Call from the `DMA1_CHANNELx` handler of the application.
pub fn on_interrupt(channel: Channel) {
    handle_interrupt(&mut Dma1::new(), &DMA_STATE, channel);
}
