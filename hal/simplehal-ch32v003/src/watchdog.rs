//! IWDG and WWDG register interfaces

use simplehal::watchdog::{IwdgPrescaler, WwdgPrescaler};
use simplehal::{IwdgController, WwdgController};
use simplehal_core::config::ClockConfig;
use simplehal_core::watchdog::{wwdg, Iwdg, Wwdg, WwdgState};

use crate::pfic::{self, Interrupt};
use crate::{rcc, regs};

/// Early wakeup callback slot of the window watchdog
pub static WWDG_STATE: WwdgState = WwdgState::new();

const IWDG_KEY_RELOAD: u32 = 0xAAAA;
const IWDG_KEY_UNLOCK: u32 = 0x5555;
const IWDG_KEY_ENABLE: u32 = 0xCCCC;

const IWDG_STATR_PVU: u32 = 1 << 0;
const IWDG_STATR_RVU: u32 = 1 << 1;

const WWDG_CTLR_WDGA: u32 = 1 << 7;
const WWDG_CFGR_WDGTB_SHIFT: u32 = 7;
const WWDG_CFGR_EWI: u32 = 1 << 9;
const WWDG_STATR_EWIF: u32 = 1 << 0;
const WWDG_7BIT: u32 = 0x7F;

/// Independent watchdog registers
pub struct IwdgRegs {
    _private: (),
}

impl IwdgRegs {
    pub(crate) const fn new() -> Self {
        Self { _private: () }
    }

    /// Wrap in the timeout driver
    pub fn driver(self, clock: &ClockConfig) -> Iwdg<IwdgRegs> {
        Iwdg::new(self, clock)
    }
}

impl IwdgController for IwdgRegs {
    fn enable_lsi(&mut self) {
        rcc::enable_lsi();
    }

    fn unlock(&mut self) {
        regs::iwdg().ctlr.write(IWDG_KEY_UNLOCK);
    }

    fn set_prescaler(&mut self, prescaler: IwdgPrescaler) {
        regs::iwdg().pscr.write(prescaler.bits() as u32);
    }

    fn set_reload(&mut self, reload: u16) {
        regs::iwdg().rldr.write(reload as u32 & 0x0FFF);
    }

    fn is_updating(&self) -> bool {
        regs::iwdg().statr.is_set(IWDG_STATR_PVU | IWDG_STATR_RVU)
    }

    fn reload(&mut self) {
        regs::iwdg().ctlr.write(IWDG_KEY_RELOAD);
    }

    fn enable(&mut self) {
        regs::iwdg().ctlr.write(IWDG_KEY_ENABLE);
    }

    fn was_reset_cause(&self) -> bool {
        rcc::reset_flags().independent_watchdog
    }

    fn clear_reset_flags(&mut self) {
        rcc::clear_reset_flags();
    }
}

/// Window watchdog registers
pub struct WwdgRegs {
    _private: (),
}

impl WwdgRegs {
    pub(crate) const fn new() -> Self {
        Self { _private: () }
    }

    /// Wrap in the window driver, bound to [`WWDG_STATE`]
    pub fn driver(self, clock: &ClockConfig) -> Wwdg<'static, WwdgRegs> {
        Wwdg::new(self, &WWDG_STATE, clock)
    }
}

impl WwdgController for WwdgRegs {
    fn enable_clock(&mut self) {
        rcc::enable_wwdg();
    }

    fn set_prescaler(&mut self, prescaler: WwdgPrescaler) {
        regs::wwdg()
            .cfgr
            .write_field(WWDG_CFGR_WDGTB_SHIFT, 2, prescaler.bits() as u32);
    }

    fn set_window(&mut self, window: u8) {
        regs::wwdg().cfgr.write_field(0, 7, window as u32);
    }

    fn set_early_wakeup_interrupt(&mut self, enabled: bool) {
        // EWI is only cleared by a peripheral reset
        regs::wwdg().cfgr.write_bit(WWDG_CFGR_EWI, enabled);
    }

    fn set_irq_enabled(&mut self, enabled: bool) {
        pfic::set_enabled(Interrupt::Wwdg, enabled);
    }

    fn enable(&mut self, counter: u8) {
        regs::wwdg()
            .ctlr
            .write(WWDG_CTLR_WDGA | (counter as u32 & WWDG_7BIT));
    }

    fn set_counter(&mut self, counter: u8) {
        regs::wwdg().ctlr.write(counter as u32 & WWDG_7BIT);
    }

    fn early_wakeup_pending(&self) -> bool {
        regs::wwdg().statr.is_set(WWDG_STATR_EWIF)
    }

    fn clear_early_wakeup(&mut self) {
        regs::wwdg().statr.write(0);
    }

    fn reset(&mut self) {
        rcc::reset_wwdg();
    }

    fn was_reset_cause(&self) -> bool {
        rcc::reset_flags().window_watchdog
    }
}

/// Service the WWDG interrupt
///
/// Call from the `WWDG` handler of the application.
pub fn on_wwdg_interrupt() {
    wwdg::handle_interrupt(&mut WwdgRegs::new(), &WWDG_STATE);
}
