//! Programmable fast interrupt controller

use simplehal::dma::Channel;

use crate::regs;

/// Interrupt numbers used by the drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Interrupt {
    SysTick = 12,
    Wwdg = 16,
    Dma1Ch1 = 22,
    Dma1Ch2 = 23,
    Dma1Ch3 = 24,
    Dma1Ch4 = 25,
    Dma1Ch5 = 26,
    Dma1Ch6 = 27,
    Dma1Ch7 = 28,
    Adc = 29,
    Usart1 = 32,
    Spi1 = 33,
    Tim2 = 38,
}

impl Interrupt {
    /// Interrupt line of a DMA1 channel
    pub const fn dma(channel: Channel) -> Self {
        match channel {
            Channel::Ch1 => Interrupt::Dma1Ch1,
            Channel::Ch2 => Interrupt::Dma1Ch2,
            Channel::Ch3 => Interrupt::Dma1Ch3,
            Channel::Ch4 => Interrupt::Dma1Ch4,
            Channel::Ch5 => Interrupt::Dma1Ch5,
            Channel::Ch6 => Interrupt::Dma1Ch6,
            Channel::Ch7 => Interrupt::Dma1Ch7,
        }
    }

    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Register index and bit mask in IENR/IRER
    const fn position(self) -> (usize, u32) {
        let n = self.number() as usize;
        (n / 32, 1 << (n % 32))
    }
}

/// Enable an interrupt line
pub fn enable(irq: Interrupt) {
    let (index, mask) = irq.position();
    regs::pfic().ienr[index].write(mask);
}

/// Disable an interrupt line
pub fn disable(irq: Interrupt) {
    let (index, mask) = irq.position();
    regs::pfic().irer[index].write(mask);
}

/// Enable or disable an interrupt line
pub fn set_enabled(irq: Interrupt, enabled: bool) {
    if enabled {
        enable(irq)
    } else {
        disable(irq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dma_lines_are_consecutive() {
        for channel in Channel::ALL {
            assert_eq!(
                Interrupt::dma(channel).number(),
                Interrupt::Dma1Ch1.number() + channel.index() as u8
            );
        }
    }

    #[test]
    fn test_register_position() {
        assert_eq!(Interrupt::SysTick.position(), (0, 1 << 12));
        assert_eq!(Interrupt::Usart1.position(), (1, 1));
        assert_eq!(Interrupt::Tim2.position(), (1, 1 << 6));
    }
}
