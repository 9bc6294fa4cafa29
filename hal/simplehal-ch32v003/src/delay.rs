//! Busy-wait delay

use embedded_hal::delay::DelayNs;
use simplehal_core::config::ClockConfig;

/// Core cycles one spin iteration takes (load, decrement, branch)
const CYCLES_PER_LOOP: u64 = 4;

/// Spin iterations for `ns` nanoseconds at `hclk_hz`, rounded up
pub const fn loops_for(ns: u32, hclk_hz: u32) -> u32 {
    let cycles = (ns as u64 * hclk_hz as u64).div_ceil(1_000_000_000);
    let loops = cycles.div_ceil(CYCLES_PER_LOOP);
    if loops > u32::MAX as u64 {
        u32::MAX
    } else {
        loops as u32
    }
}

/// Delay that counts core cycles
///
/// Accuracy depends on the loop compiling to the expected instruction
/// count; interrupts lengthen the wait.
#[derive(Debug, Clone, Copy)]
pub struct CycleDelay {
    hclk_hz: u32,
}

impl CycleDelay {
    pub fn new(clock: &ClockConfig) -> Self {
        Self {
            hclk_hz: clock.hclk_hz,
        }
    }
}

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        for _ in 0..loops_for(ns, self.hclk_hz) {
            core::hint::spin_loop();
        }
    }
}
