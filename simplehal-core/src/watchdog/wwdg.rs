//! Window watchdog

use core::cell::Cell;

use critical_section::Mutex;
use simplehal::watchdog::WwdgPrescaler;
use simplehal::WwdgController;

use crate::config::{ClockConfig, WwdgConfig};

/// Lowest counter/window value; the reset fires when T6 clears below it
pub const WWDG_COUNTER_MIN: u8 = 0x40;

/// Highest counter/window value (7 bits)
pub const WWDG_COUNTER_MAX: u8 = 0x7F;

/// Early wakeup callback, invoked from interrupt context
pub type WwdgCallback = fn();

/// Clamp a counter or window value into 0x40..=0x7F
pub fn clamp(value: u8) -> u8 {
    value.clamp(WWDG_COUNTER_MIN, WWDG_COUNTER_MAX)
}

/// Time from `counter` down to the reset, in microseconds
pub fn timeout_us(prescaler: WwdgPrescaler, counter: u8, pclk1_hz: u32) -> u32 {
    if pclk1_hz == 0 {
        return 0;
    }
    let ticks = (clamp(counter) - (WWDG_COUNTER_MIN - 1)) as u64;
    (4096 * prescaler.divider() as u64 * ticks * 1_000_000 / pclk1_hz as u64) as u32
}

/// Time from `counter` down to the reset, in milliseconds
pub fn timeout_ms(prescaler: WwdgPrescaler, counter: u8, pclk1_hz: u32) -> u32 {
    timeout_us(prescaler, counter, pclk1_hz) / 1000
}

/// Early wakeup callback slot shared with the WWDG interrupt
pub struct WwdgState {
    callback: Mutex<Cell<Option<WwdgCallback>>>,
}

impl Default for WwdgState {
    fn default() -> Self {
        Self::new()
    }
}

impl WwdgState {
    /// Create an empty slot
    pub const fn new() -> Self {
        Self {
            callback: Mutex::new(Cell::new(None)),
        }
    }

    /// Register (or clear) the callback
    pub fn set_callback(&self, callback: Option<WwdgCallback>) {
        critical_section::with(|cs| self.callback.borrow(cs).set(callback));
    }

    fn callback(&self) -> Option<WwdgCallback> {
        critical_section::with(|cs| self.callback.borrow(cs).get())
    }
}

/// Service the WWDG interrupt: clear the early wakeup flag, run the callback
pub fn handle_interrupt<W>(regs: &mut W, state: &WwdgState)
where
    W: WwdgController + ?Sized,
{
    if !regs.early_wakeup_pending() {
        return;
    }
    regs.clear_early_wakeup();
    if let Some(callback) = state.callback() {
        callback();
    }
}

/// Window watchdog driver
pub struct Wwdg<'s, W: WwdgController> {
    regs: W,
    state: &'s WwdgState,
    pclk1_hz: u32,
    prescaler: Option<WwdgPrescaler>,
}

impl<'s, W: WwdgController> Wwdg<'s, W> {
    /// Create the driver; nothing is written until one of the init calls
    pub fn new(regs: W, state: &'s WwdgState, clock: &ClockConfig) -> Self {
        Self {
            regs,
            state,
            pclk1_hz: clock.pclk1_hz,
            prescaler: None,
        }
    }

    /// Give back the register interface
    pub fn free(self) -> W {
        self.regs
    }

    /// Start with `counter` and `window` (clamped) and the /8 prescaler
    pub fn init(&mut self, counter: u8, window: u8) {
        self.init_with_prescaler(counter, window, WwdgPrescaler::Div8);
    }

    /// Start with an explicit prescaler
    pub fn init_with_prescaler(&mut self, counter: u8, window: u8, prescaler: WwdgPrescaler) {
        self.configure(window, prescaler, false);
        self.activate(counter);
    }

    /// Start with the early wakeup interrupt enabled
    pub fn init_with_interrupt(&mut self, counter: u8, window: u8, prescaler: WwdgPrescaler) {
        self.configure(window, prescaler, true);
        self.activate(counter);
    }

    /// Start from a stored configuration
    pub fn init_from(&mut self, config: &WwdgConfig) {
        self.configure(config.window, config.prescaler, config.early_wakeup);
        self.activate(config.counter);
    }

    fn configure(&mut self, window: u8, prescaler: WwdgPrescaler, early_wakeup: bool) {
        self.regs.enable_clock();
        if early_wakeup {
            self.regs.set_irq_enabled(true);
        }
        self.regs.set_prescaler(prescaler);
        self.regs.set_window(clamp(window));
        if early_wakeup {
            self.regs.set_early_wakeup_interrupt(true);
        }
        self.prescaler = Some(prescaler);
    }

    fn activate(&mut self, counter: u8) {
        let counter = clamp(counter);
        self.regs.enable(counter);
        if let Some(prescaler) = self.prescaler {
            debug!(
                "WWDG enabled, counter {=u8:#x}, timeout {} us",
                counter,
                timeout_us(prescaler, counter, self.pclk1_hz)
            );
        }
    }

    /// Reload the counter (clamped); must happen inside the window
    pub fn refresh(&mut self, counter: u8) {
        self.regs.set_counter(clamp(counter));
    }

    /// Register the early wakeup callback
    pub fn set_callback(&mut self, callback: WwdgCallback) {
        self.state.set_callback(Some(callback));
    }

    /// Early wakeup flag pending
    pub fn interrupt_pending(&self) -> bool {
        self.regs.early_wakeup_pending()
    }

    /// Clear the early wakeup flag
    pub fn clear_interrupt_flag(&mut self) {
        self.regs.clear_early_wakeup();
    }

    /// Service the interrupt through this driver's registers
    pub fn on_interrupt(&mut self) {
        handle_interrupt(&mut self.regs, self.state);
    }

    /// Reset the peripheral, stopping the watchdog
    pub fn disable(&mut self) {
        self.regs.reset();
        self.prescaler = None;
    }

    /// Full-counter timeout for the active prescaler
    pub fn timeout_ms(&self, counter: u8) -> Option<u32> {
        self.prescaler
            .map(|prescaler| timeout_ms(prescaler, counter, self.pclk1_hz))
    }

    /// Whether the last reset came from this watchdog
    pub fn was_reset_cause(&self) -> bool {
        self.regs.was_reset_cause()
    }
}
