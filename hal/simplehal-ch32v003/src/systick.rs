//! SysTick millisecond clock

use core::cell::Cell;

use critical_section::Mutex;
use simplehal::Millis;
use simplehal_core::config::ClockConfig;

use crate::pfic::{self, Interrupt};
use crate::regs;

const CTLR_STE: u32 = 1 << 0;
const CTLR_STIE: u32 = 1 << 1;
/// Count on HCLK instead of HCLK/8
const CTLR_STCLK: u32 = 1 << 2;
const CTLR_STRE: u32 = 1 << 3;

static TICKS: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

/// Compare value for a 1 ms period on HCLK
pub const fn reload_for(hclk_hz: u32) -> u32 {
    (hclk_hz / 1000).saturating_sub(1)
}

/// Millisecond tick source
///
/// The counter advances in [`on_tick`], so it only moves once the SysTick
/// interrupt is routed there.
pub struct SysTick {
    _private: (),
}

impl SysTick {
    pub(crate) const fn new() -> Self {
        Self { _private: () }
    }

    /// Start the 1 ms interrupt
    pub fn start(&mut self, clock: &ClockConfig) {
        let st = regs::systick();
        st.ctlr.write(0);
        st.sr.write(0);
        st.cnt.write(0);
        st.cmp.write(reload_for(clock.hclk_hz));
        st.ctlr.write(CTLR_STE | CTLR_STIE | CTLR_STCLK | CTLR_STRE);
        pfic::enable(Interrupt::SysTick);
        debug!("SysTick started, compare {}", reload_for(clock.hclk_hz));
    }

    /// Stop counting
    pub fn stop(&mut self) {
        regs::systick().ctlr.write(0);
        pfic::disable(Interrupt::SysTick);
    }
}

impl Millis for SysTick {
    fn millis(&self) -> u32 {
        critical_section::with(|cs| TICKS.borrow(cs).get())
    }
}

fn advance() {
    critical_section::with(|cs| {
        let ticks = TICKS.borrow(cs);
        ticks.set(ticks.get().wrapping_add(1));
    });
}

/// Service the SysTick interrupt
///
/// Call from the `SysTick` handler of the application.
pub fn on_tick() {
    regs::systick().sr.write(0);
    advance();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_for() {
        assert_eq!(reload_for(24_000_000), 23_999);
        assert_eq!(reload_for(48_000_000), 47_999);
        assert_eq!(reload_for(500), 0);
    }

    #[test]
    fn test_ticks_advance() {
        let clock = SysTick::new();
        let before = clock.millis();
        advance();
        advance();
        assert_eq!(clock.millis(), before.wrapping_add(2));
    }
}
