//! Configuration type definitions
//!
//! Every structure derives serde so it can be stored in a flash record
//! with [`crate::flash::SimpleFlash::save`].

use serde::{Deserialize, Serialize};
use simplehal::flash::{FLASH_BASE, PAGE_SIZE, TOTAL_PAGES};
use simplehal::watchdog::WwdgPrescaler;

/// Maximum length of a stored string, excluding the terminator
pub const MAX_STRING_LEN: usize = 60;

/// Default system clock (HSI)
pub const DEFAULT_HCLK_HZ: u32 = 24_000_000;

/// Default LSI frequency
pub const DEFAULT_LSI_HZ: u32 = 128_000;

/// Flash storage region layout
///
/// The storage region is the config page followed by the data page, at
/// the very end of code flash by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StorageLayout {
    /// Start of code flash
    pub flash_base: u32,
    /// Total number of pages
    pub total_pages: u16,
    /// Page holding the configuration record
    pub config_page: u16,
    /// Page holding general data (or wear-levelled slots)
    pub data_page: u16,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            flash_base: FLASH_BASE,
            total_pages: TOTAL_PAGES,
            config_page: TOTAL_PAGES - 2,
            data_page: TOTAL_PAGES - 1,
        }
    }
}

impl StorageLayout {
    /// Absolute address of a page, `None` past the end of the address space
    pub const fn page_address(&self, page: u16) -> Option<u32> {
        match (page as u32).checked_mul(PAGE_SIZE as u32) {
            Some(offset) => self.flash_base.checked_add(offset),
            None => None,
        }
    }

    /// One past the last address of code flash
    pub const fn flash_end(&self) -> Option<u32> {
        match (self.total_pages as u32).checked_mul(PAGE_SIZE as u32) {
            Some(size) => self.flash_base.checked_add(size),
            None => None,
        }
    }

    /// First page of the storage region
    pub fn first_page(&self) -> u16 {
        self.config_page.min(self.data_page)
    }

    /// Last page of the storage region
    pub fn last_page(&self) -> u16 {
        self.config_page.max(self.data_page)
    }

    /// First address of the storage region
    ///
    /// Saturates to `u32::MAX` for a layout that fails [`Self::is_valid`].
    pub fn start(&self) -> u32 {
        self.page_address(self.first_page()).unwrap_or(u32::MAX)
    }

    /// One past the last address of the storage region
    ///
    /// Saturates to `u32::MAX` for a layout that fails [`Self::is_valid`].
    pub fn end(&self) -> u32 {
        self.page_address(self.last_page())
            .and_then(|addr| addr.checked_add(PAGE_SIZE as u32))
            .unwrap_or(u32::MAX)
    }

    /// Whether `page` is one of the storage pages
    pub fn is_storage_page(&self, page: u16) -> bool {
        page == self.config_page || page == self.data_page
    }

    /// Whether `len` bytes starting at `addr` fit in the region
    pub fn contains(&self, addr: u32, len: usize) -> bool {
        let Ok(len) = u32::try_from(len) else {
            return false;
        };
        match addr.checked_add(len) {
            Some(end) => addr >= self.start() && end <= self.end(),
            None => false,
        }
    }

    /// Check the layout describes two distinct pages inside flash
    ///
    /// Flash must also end within the 32-bit address space.
    pub fn is_valid(&self) -> bool {
        self.flash_end().is_some()
            && self.config_page != self.data_page
            && self.config_page < self.total_pages
            && self.data_page < self.total_pages
            && self.config_page.abs_diff(self.data_page) == 1
    }
}

/// Clock tree frequencies used for timing calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Core and AHB clock
    pub hclk_hz: u32,
    /// APB1 clock (WWDG time base)
    pub pclk1_hz: u32,
    /// Internal low speed oscillator (IWDG time base)
    pub lsi_hz: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            hclk_hz: DEFAULT_HCLK_HZ,
            pclk1_hz: DEFAULT_HCLK_HZ,
            lsi_hz: DEFAULT_LSI_HZ,
        }
    }
}

impl ClockConfig {
    /// Flash wait states required for `hclk_hz`
    pub fn flash_latency(&self) -> u8 {
        match self.hclk_hz {
            0..=24_000_000 => 0,
            _ => 1,
        }
    }
}

/// Independent watchdog settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IwdgConfig {
    /// Requested timeout
    pub timeout_ms: u32,
}

impl Default for IwdgConfig {
    fn default() -> Self {
        Self { timeout_ms: 1000 }
    }
}

/// Window watchdog settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WwdgConfig {
    /// Initial counter value (0x40..=0x7F)
    pub counter: u8,
    /// Window value (0x40..=0x7F)
    pub window: u8,
    /// Prescaler applied after the fixed /4096
    pub prescaler: WwdgPrescaler,
    /// Raise the early wakeup interrupt at counter 0x40
    pub early_wakeup: bool,
}

impl Default for WwdgConfig {
    fn default() -> Self {
        Self {
            counter: 0x7F,
            window: 0x5F,
            prescaler: WwdgPrescaler::Div8,
            early_wakeup: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = StorageLayout::default();
        assert!(layout.is_valid());
        assert_eq!(layout.page_address(layout.config_page), Some(0x0800_3F80));
        assert_eq!(layout.page_address(layout.data_page), Some(0x0800_3FC0));
        assert_eq!(layout.start(), 0x0800_3F80);
        assert_eq!(layout.end(), 0x0800_4000);
        assert_eq!(layout.flash_end(), Some(0x0800_4000));
    }

    #[test]
    fn test_layout_past_address_space() {
        let layout = StorageLayout {
            flash_base: 0xFFFF_FF00,
            ..StorageLayout::default()
        };
        assert!(!layout.is_valid());
        assert_eq!(layout.flash_end(), None);
        assert_eq!(layout.page_address(layout.config_page), None);
        assert_eq!(layout.start(), u32::MAX);
        assert_eq!(layout.end(), u32::MAX);
        assert!(!layout.contains(0x0800_3F80, 1));
        assert!(!layout.contains(u32::MAX, 1));

        // Last page ending exactly at the top of the address space
        let top = StorageLayout {
            flash_base: 0u32.wrapping_sub(TOTAL_PAGES as u32 * PAGE_SIZE as u32),
            ..StorageLayout::default()
        };
        assert_eq!(top.flash_end(), None);
        assert!(!top.is_valid());
    }

    #[test]
    fn test_layout_contains() {
        let layout = StorageLayout::default();
        assert!(layout.contains(0x0800_3F80, 128));
        assert!(layout.contains(0x0800_3FFF, 1));
        assert!(!layout.contains(0x0800_3FFF, 2));
        assert!(!layout.contains(0x0800_3F7F, 1));
        assert!(!layout.contains(u32::MAX, 2));
    }

    #[test]
    fn test_layout_rejects_same_page() {
        let layout = StorageLayout {
            data_page: 254,
            ..StorageLayout::default()
        };
        assert!(!layout.is_valid());
    }

    #[test]
    fn test_config_roundtrip_postcard() {
        let config = WwdgConfig {
            counter: 0x70,
            early_wakeup: true,
            ..WwdgConfig::default()
        };
        let mut buf = [0u8; 16];
        let bytes = postcard::to_slice(&config, &mut buf).unwrap();
        let decoded: WwdgConfig = postcard::from_bytes(bytes).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_flash_latency() {
        assert_eq!(ClockConfig::default().flash_latency(), 0);
        let fast = ClockConfig {
            hclk_hz: 48_000_000,
            ..ClockConfig::default()
        };
        assert_eq!(fast.flash_latency(), 1);
    }
}
