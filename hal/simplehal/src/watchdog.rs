//! Watchdog abstractions
//!
//! The independent watchdog (IWDG) runs from the LSI oscillator and cannot
//! be stopped once enabled. The window watchdog (WWDG) runs from PCLK1 and
//! must be refreshed inside a window.

/// IWDG prescaler divider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IwdgPrescaler {
    Div4 = 0,
    Div8 = 1,
    Div16 = 2,
    Div32 = 3,
    Div64 = 4,
    Div128 = 5,
    Div256 = 6,
}

impl IwdgPrescaler {
    /// All dividers, smallest first
    pub const ALL: [IwdgPrescaler; 7] = [
        IwdgPrescaler::Div4,
        IwdgPrescaler::Div8,
        IwdgPrescaler::Div16,
        IwdgPrescaler::Div32,
        IwdgPrescaler::Div64,
        IwdgPrescaler::Div128,
        IwdgPrescaler::Div256,
    ];

    /// Divider value
    pub const fn divider(self) -> u32 {
        4 << (self as u32)
    }

    /// Register encoding (PR field)
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// WWDG prescaler divider (applied after the fixed /4096)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum WwdgPrescaler {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
    #[default]
    Div8 = 3,
}

impl WwdgPrescaler {
    /// Divider value
    pub const fn divider(self) -> u32 {
        1 << (self as u32)
    }

    /// Register encoding (WDGTB field)
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// IWDG register access
pub trait IwdgController {
    /// Enable the LSI oscillator the IWDG counts on
    fn enable_lsi(&mut self);

    /// Allow writes to the prescaler and reload registers
    fn unlock(&mut self);

    /// Write the prescaler register
    fn set_prescaler(&mut self, prescaler: IwdgPrescaler);

    /// Write the 12-bit reload register
    fn set_reload(&mut self, reload: u16);

    /// Prescaler or reload update still in progress (PVU/RVU)
    fn is_updating(&self) -> bool;

    /// Reload the counter ("feed")
    fn reload(&mut self);

    /// Start the watchdog
    fn enable(&mut self);

    /// Whether the last reset was caused by the IWDG
    fn was_reset_cause(&self) -> bool;

    /// Clear all reset cause flags
    fn clear_reset_flags(&mut self);
}

/// WWDG register access
pub trait WwdgController {
    /// Enable the WWDG bus clock
    fn enable_clock(&mut self);

    /// Write the prescaler
    fn set_prescaler(&mut self, prescaler: WwdgPrescaler);

    /// Write the 7-bit window value
    fn set_window(&mut self, window: u8);

    /// Enable or disable the early wakeup interrupt
    fn set_early_wakeup_interrupt(&mut self, enabled: bool);

    /// Enable the WWDG interrupt line in the interrupt controller
    fn set_irq_enabled(&mut self, enabled: bool);

    /// Activate the watchdog with an initial counter
    fn enable(&mut self, counter: u8);

    /// Write the 7-bit counter
    fn set_counter(&mut self, counter: u8);

    /// Early wakeup flag pending
    fn early_wakeup_pending(&self) -> bool;

    /// Clear the early wakeup flag
    fn clear_early_wakeup(&mut self);

    /// Reset the peripheral, which disables it
    fn reset(&mut self);

    /// Whether the last reset was caused by the WWDG
    fn was_reset_cause(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iwdg_dividers() {
        let dividers: [u32; 7] = [4, 8, 16, 32, 64, 128, 256];
        for (p, d) in IwdgPrescaler::ALL.iter().zip(dividers.iter()) {
            assert_eq!(p.divider(), *d);
        }
    }

    #[test]
    fn test_wwdg_dividers() {
        assert_eq!(WwdgPrescaler::Div1.divider(), 1);
        assert_eq!(WwdgPrescaler::Div8.divider(), 8);
        assert_eq!(WwdgPrescaler::Div4.bits(), 2);
    }
}
