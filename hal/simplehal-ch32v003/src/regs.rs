//! Memory-mapped register blocks
//!
//! Layouts follow the CH32V003 reference manual. Only the registers the
//! drivers touch are named; the rest are padding.

use core::mem::offset_of;

use vcell::VolatileCell;

/// One 32-bit register slot
#[repr(transparent)]
pub(crate) struct Reg(VolatileCell<u32>);

impl Reg {
    #[inline(always)]
    pub fn read(&self) -> u32 {
        self.0.get()
    }

    #[inline(always)]
    pub fn write(&self, value: u32) {
        self.0.set(value)
    }

    #[inline(always)]
    pub fn modify(&self, f: impl FnOnce(u32) -> u32) {
        self.write(f(self.read()))
    }

    #[inline(always)]
    pub fn set_bits(&self, mask: u32) {
        self.modify(|v| v | mask)
    }

    #[inline(always)]
    pub fn clear_bits(&self, mask: u32) {
        self.modify(|v| v & !mask)
    }

    /// Set or clear `mask` depending on `on`
    #[inline(always)]
    pub fn write_bit(&self, mask: u32, on: bool) {
        if on {
            self.set_bits(mask)
        } else {
            self.clear_bits(mask)
        }
    }

    /// Replace the `width`-bit field at `shift`
    #[inline(always)]
    pub fn write_field(&self, shift: u32, width: u32, value: u32) {
        let mask = ((1 << width) - 1) << shift;
        self.modify(|v| (v & !mask) | ((value << shift) & mask))
    }

    #[inline(always)]
    pub fn is_set(&self, mask: u32) -> bool {
        self.read() & mask != 0
    }
}

pub(crate) const RCC_BASE: usize = 0x4002_1000;
pub(crate) const DMA1_BASE: usize = 0x4002_0000;
pub(crate) const FLASH_R_BASE: usize = 0x4002_2000;
pub(crate) const ADC1_BASE: usize = 0x4001_2400;
pub(crate) const USART1_BASE: usize = 0x4001_3800;
pub(crate) const SPI1_BASE: usize = 0x4001_3000;
pub(crate) const I2C1_BASE: usize = 0x4000_5400;
pub(crate) const TIM1_BASE: usize = 0x4001_2C00;
pub(crate) const TIM2_BASE: usize = 0x4000_0000;
pub(crate) const IWDG_BASE: usize = 0x4000_3000;
pub(crate) const WWDG_BASE: usize = 0x4000_2C00;
pub(crate) const PFIC_BASE: usize = 0xE000_E000;
pub(crate) const SYSTICK_BASE: usize = 0xE000_F000;
pub(crate) const GPIOA_BASE: usize = 0x4001_0800;
pub(crate) const GPIOC_BASE: usize = 0x4001_1000;
pub(crate) const GPIOD_BASE: usize = 0x4001_1400;

#[repr(C)]
pub(crate) struct RccRegs {
    _ctlr: Reg,
    pub cfgr0: Reg,
    _intr: Reg,
    pub apb2prstr: Reg,
    pub apb1prstr: Reg,
    pub ahbpcenr: Reg,
    pub apb2pcenr: Reg,
    pub apb1pcenr: Reg,
    _reserved: Reg,
    pub rstsckr: Reg,
}

#[repr(C)]
pub(crate) struct DmaChannelRegs {
    pub cfgr: Reg,
    pub cntr: Reg,
    pub paddr: Reg,
    pub maddr: Reg,
    _reserved: Reg,
}

#[repr(C)]
pub(crate) struct DmaRegs {
    pub intfr: Reg,
    pub intfcr: Reg,
    pub ch: [DmaChannelRegs; 7],
}

#[repr(C)]
pub(crate) struct FlashRegs {
    pub actlr: Reg,
    pub keyr: Reg,
    _obkeyr: Reg,
    pub statr: Reg,
    pub ctlr: Reg,
    pub addr: Reg,
    _reserved: Reg,
    _obr: Reg,
    _wpr: Reg,
    pub modekeyr: Reg,
}

#[repr(C)]
pub(crate) struct AdcRegs {
    _statr: Reg,
    pub ctlr1: Reg,
    pub ctlr2: Reg,
    _samptr1: Reg,
    pub samptr2: Reg,
    _iofr: [Reg; 4],
    _wdtr: [Reg; 2],
    pub rsqr1: Reg,
    _rsqr2: Reg,
    pub rsqr3: Reg,
    _isqr: Reg,
    _idatar: [Reg; 4],
    pub rdatar: Reg,
}

#[repr(C)]
pub(crate) struct UsartRegs {
    _statr: Reg,
    pub datar: Reg,
    _brr: Reg,
    _ctlr1: Reg,
    _ctlr2: Reg,
    pub ctlr3: Reg,
}

#[repr(C)]
pub(crate) struct SpiRegs {
    _ctlr1: Reg,
    pub ctlr2: Reg,
    _statr: Reg,
    pub datar: Reg,
}

#[repr(C)]
pub(crate) struct I2cRegs {
    _ctlr1: Reg,
    pub ctlr2: Reg,
    _oaddr: [Reg; 2],
    pub datar: Reg,
}

#[repr(C)]
pub(crate) struct TimRegs {
    _ctlr: [Reg; 3],
    pub dmaintenr: Reg,
    _reserved: [Reg; 9],
    pub ch1cvr: Reg,
}

#[repr(C)]
pub(crate) struct IwdgRegs {
    pub ctlr: Reg,
    pub pscr: Reg,
    pub rldr: Reg,
    pub statr: Reg,
}

#[repr(C)]
pub(crate) struct WwdgRegs {
    pub ctlr: Reg,
    pub cfgr: Reg,
    pub statr: Reg,
}

#[repr(C)]
pub(crate) struct PficRegs {
    _status: [Reg; 64],
    pub ienr: [Reg; 4],
    _reserved: [Reg; 28],
    pub irer: [Reg; 4],
}

#[repr(C)]
pub(crate) struct SysTickRegs {
    pub ctlr: Reg,
    pub sr: Reg,
    pub cnt: Reg,
    _reserved: Reg,
    pub cmp: Reg,
}

#[repr(C)]
pub(crate) struct GpioRegs {
    pub cfglr: Reg,
}

macro_rules! register_block {
    ($fn:ident, $ty:ty, $base:expr) => {
        #[inline(always)]
        pub(crate) fn $fn() -> &'static $ty {
            // SAFETY: fixed MMIO address of this block; every access goes
            // through volatile cells
            unsafe { &*($base as *const $ty) }
        }
    };
}

register_block!(rcc, RccRegs, RCC_BASE);
register_block!(dma1, DmaRegs, DMA1_BASE);
register_block!(flash, FlashRegs, FLASH_R_BASE);
register_block!(adc1, AdcRegs, ADC1_BASE);
register_block!(usart1, UsartRegs, USART1_BASE);
register_block!(spi1, SpiRegs, SPI1_BASE);
register_block!(i2c1, I2cRegs, I2C1_BASE);
register_block!(tim1, TimRegs, TIM1_BASE);
register_block!(tim2, TimRegs, TIM2_BASE);
register_block!(iwdg, IwdgRegs, IWDG_BASE);
register_block!(wwdg, WwdgRegs, WWDG_BASE);
register_block!(pfic, PficRegs, PFIC_BASE);
register_block!(systick, SysTickRegs, SYSTICK_BASE);
register_block!(gpioa, GpioRegs, GPIOA_BASE);
register_block!(gpioc, GpioRegs, GPIOC_BASE);
register_block!(gpiod, GpioRegs, GPIOD_BASE);

/// Data register addresses the DMA controller targets
pub(crate) const ADC1_RDATAR: usize = ADC1_BASE + offset_of!(AdcRegs, rdatar);
pub(crate) const USART1_DATAR: usize = USART1_BASE + offset_of!(UsartRegs, datar);
pub(crate) const SPI1_DATAR: usize = SPI1_BASE + offset_of!(SpiRegs, datar);
pub(crate) const I2C1_DATAR: usize = I2C1_BASE + offset_of!(I2cRegs, datar);
pub(crate) const TIM1_CH1CVR: usize = TIM1_BASE + offset_of!(TimRegs, ch1cvr);
pub(crate) const TIM2_CH1CVR: usize = TIM2_BASE + offset_of!(TimRegs, ch1cvr);
