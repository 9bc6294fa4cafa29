//! Independent watchdog

use simplehal::watchdog::IwdgPrescaler;
use simplehal::IwdgController;

use crate::config::{ClockConfig, IwdgConfig};

/// Largest value of the 12-bit reload register
pub const IWDG_MAX_RELOAD: u16 = 0x0FFF;

/// Status polls allowed for a prescaler/reload update to land
///
/// An update takes a few LSI cycles, far below this budget at any HCLK.
pub const UPDATE_POLLS: u32 = 0x0001_0000;

/// Prescaler and reload pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IwdgTiming {
    pub prescaler: IwdgPrescaler,
    pub reload: u16,
}

impl IwdgTiming {
    /// Smallest prescaler whose reload for `timeout_ms` fits in 12 bits
    ///
    /// Timeouts beyond the range of /256 saturate at /256 with the
    /// maximum reload.
    pub fn for_timeout(timeout_ms: u32, lsi_hz: u32) -> Self {
        for prescaler in IwdgPrescaler::ALL {
            let reload =
                timeout_ms as u64 * lsi_hz as u64 / (prescaler.divider() as u64 * 1000);
            if reload <= IWDG_MAX_RELOAD as u64 {
                return Self {
                    prescaler,
                    reload: (reload as u16).max(1),
                };
            }
        }
        Self {
            prescaler: IwdgPrescaler::Div256,
            reload: IWDG_MAX_RELOAD,
        }
    }

    /// Timeout in milliseconds produced by this pair
    pub fn timeout_ms(&self, lsi_hz: u32) -> u32 {
        if lsi_hz == 0 {
            return 0;
        }
        (self.prescaler.divider() as u64 * self.reload as u64 * 1000 / lsi_hz as u64) as u32
    }
}

/// Independent watchdog driver
pub struct Iwdg<W: IwdgController> {
    regs: W,
    lsi_hz: u32,
    timing: Option<IwdgTiming>,
}

impl<W: IwdgController> Iwdg<W> {
    /// Create the driver; nothing is written until [`Iwdg::start`]
    pub fn new(regs: W, clock: &ClockConfig) -> Self {
        Self {
            regs,
            lsi_hz: clock.lsi_hz,
            timing: None,
        }
    }

    /// Give back the register interface
    pub fn free(self) -> W {
        self.regs
    }

    /// Start with the timeout closest to `timeout_ms`
    ///
    /// Once started the watchdog cannot be stopped.
    pub fn start(&mut self, timeout_ms: u32) -> IwdgTiming {
        let timing = IwdgTiming::for_timeout(timeout_ms, self.lsi_hz);
        self.start_with(timing);
        info!(
            "IWDG started, requested {} ms, effective {} ms",
            timeout_ms,
            timing.timeout_ms(self.lsi_hz)
        );
        timing
    }

    /// Start from a stored configuration
    pub fn start_from(&mut self, config: &IwdgConfig) -> IwdgTiming {
        self.start(config.timeout_ms)
    }

    /// Start with an explicit prescaler and reload (clamped to 12 bits)
    pub fn start_with(&mut self, timing: IwdgTiming) {
        let timing = IwdgTiming {
            reload: timing.reload.min(IWDG_MAX_RELOAD),
            ..timing
        };

        self.regs.enable_lsi();
        self.regs.unlock();
        self.regs.set_prescaler(timing.prescaler);
        self.regs.set_reload(timing.reload);
        let mut polls = UPDATE_POLLS;
        while self.regs.is_updating() {
            polls -= 1;
            if polls == 0 {
                warn!("IWDG update flags stuck, enabling anyway");
                break;
            }
            core::hint::spin_loop();
        }
        self.regs.reload();
        self.regs.enable();
        self.timing = Some(timing);
    }

    /// Reload the counter
    pub fn feed(&mut self) {
        self.regs.reload();
    }

    /// Prescaler or reload update still in progress
    pub fn is_busy(&self) -> bool {
        self.regs.is_updating()
    }

    /// Active timing, if started
    pub fn timing(&self) -> Option<IwdgTiming> {
        self.timing
    }

    /// Effective timeout, if started
    pub fn timeout_ms(&self) -> Option<u32> {
        self.timing.map(|t| t.timeout_ms(self.lsi_hz))
    }

    /// Whether the last reset came from this watchdog
    pub fn was_reset_cause(&self) -> bool {
        self.regs.was_reset_cause()
    }

    /// Clear the reset cause flags
    pub fn clear_reset_flags(&mut self) {
        self.regs.clear_reset_flags();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockIwdg;
    use proptest::prelude::*;

    const LSI: u32 = 128_000;

    #[test]
    fn test_picks_smallest_prescaler() {
        // 4096 * 4 / 128 kHz = 128 ms is the /4 limit
        let t = IwdgTiming::for_timeout(100, LSI);
        assert_eq!(t.prescaler, IwdgPrescaler::Div4);
        assert_eq!(t.reload, 3200);

        let t = IwdgTiming::for_timeout(1000, LSI);
        assert_eq!(t.prescaler, IwdgPrescaler::Div32);
        assert_eq!(t.reload, 4000);
        assert_eq!(t.timeout_ms(LSI), 1000);
    }

    #[test]
    fn test_legacy_lsi_rate() {
        let t = IwdgTiming::for_timeout(1000, 40_000);
        assert_eq!(t.prescaler, IwdgPrescaler::Div16);
        assert_eq!(t.reload, 2500);
    }

    #[test]
    fn test_saturates_at_largest_prescaler() {
        let t = IwdgTiming::for_timeout(60_000, LSI);
        assert_eq!(t.prescaler, IwdgPrescaler::Div256);
        assert_eq!(t.reload, IWDG_MAX_RELOAD);
    }

    #[test]
    fn test_tiny_timeout_keeps_nonzero_reload() {
        let t = IwdgTiming::for_timeout(0, LSI);
        assert_eq!(t.prescaler, IwdgPrescaler::Div4);
        assert_eq!(t.reload, 1);
    }

    #[test]
    fn test_start_sequence() {
        let mut iwdg = Iwdg::new(MockIwdg::with_update_polls(3), &ClockConfig::default());
        let timing = iwdg.start(500);

        let regs = iwdg.free();
        assert!(regs.lsi_enabled);
        assert_eq!(regs.prescaler, Some(timing.prescaler));
        assert_eq!(regs.reload_value, Some(timing.reload));
        assert_eq!(regs.update_polls.get(), 0);
        assert_eq!(regs.reloads, 1);
        assert!(regs.enabled);
        assert_eq!(
            regs.log.as_slice(),
            &["unlock", "prescaler", "reload_value", "reload", "enable"]
        );
    }

    #[test]
    fn test_stuck_update_flags_bounded() {
        let mut iwdg = Iwdg::new(
            MockIwdg::with_update_polls(u32::MAX),
            &ClockConfig::default(),
        );
        iwdg.start(1000);

        let regs = iwdg.free();
        assert_eq!(regs.update_polls.get(), u32::MAX - UPDATE_POLLS);
        assert!(regs.enabled);
        assert_eq!(regs.log.last(), Some(&"enable"));
    }

    #[test]
    fn test_explicit_reload_clamped() {
        let mut iwdg = Iwdg::new(MockIwdg::default(), &ClockConfig::default());
        iwdg.start_with(IwdgTiming {
            prescaler: IwdgPrescaler::Div8,
            reload: 0xFFFF,
        });
        assert_eq!(iwdg.timing().map(|t| t.reload), Some(IWDG_MAX_RELOAD));
    }

    #[test]
    fn test_feed_and_reset_cause() {
        let mut iwdg = Iwdg::new(MockIwdg::default(), &ClockConfig::default());
        assert_eq!(iwdg.timeout_ms(), None);
        iwdg.start_from(&IwdgConfig::default());
        assert_eq!(iwdg.timeout_ms(), Some(1000));

        iwdg.feed();
        iwdg.feed();
        assert!(!iwdg.is_busy());

        let mut regs = iwdg.free();
        assert_eq!(regs.reloads, 3);
        regs.reset_flag = true;
        let mut iwdg = Iwdg::new(regs, &ClockConfig::default());
        assert!(iwdg.was_reset_cause());
        iwdg.clear_reset_flags();
        assert!(!iwdg.was_reset_cause());
    }

    proptest! {
        #[test]
        fn test_timing_never_exceeds_request(timeout_ms in 1u32..32_000) {
            let t = IwdgTiming::for_timeout(timeout_ms, LSI);
            prop_assert!(t.reload <= IWDG_MAX_RELOAD);
            prop_assert!(t.timeout_ms(LSI) <= timeout_ms);
        }
    }
}
