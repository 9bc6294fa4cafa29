//! Peripheral singletons

use core::cell::Cell;

use critical_section::Mutex;

use crate::adc::Adc;
use crate::dma::Dma1;
use crate::flash::Flash;
use crate::systick::SysTick;
use crate::watchdog::{IwdgRegs, WwdgRegs};

static TAKEN: Mutex<Cell<bool>> = Mutex::new(Cell::new(false));

/// Every controller the drivers need, handed out once
pub struct Peripherals {
    pub dma: Dma1,
    pub flash: Flash,
    pub adc: Adc,
    pub iwdg: IwdgRegs,
    pub wwdg: WwdgRegs,
    pub systick: SysTick,
}

impl Peripherals {
    /// Returns the peripherals on the first call, `None` afterwards
    pub fn take() -> Option<Self> {
        critical_section::with(|cs| {
            let taken = TAKEN.borrow(cs);
            if taken.get() {
                return None;
            }
            taken.set(true);
            // SAFETY: first and only hand-out
            Some(unsafe { Self::steal() })
        })
    }

    /// Create the peripherals regardless of earlier hand-outs
    ///
    /// # Safety
    ///
    /// The caller must not use two handles to the same controller at once.
    pub unsafe fn steal() -> Self {
        Self {
            dma: Dma1::new(),
            flash: Flash::new(),
            adc: Adc::new(),
            iwdg: IwdgRegs::new(),
            wwdg: WwdgRegs::new(),
            systick: SysTick::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_once() {
        assert!(Peripherals::take().is_some());
        assert!(Peripherals::take().is_none());
    }
}
