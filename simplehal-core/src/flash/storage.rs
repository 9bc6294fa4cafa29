//! Raw storage-region access

use heapless::{String, Vec};
use simplehal::flash::{FlashError, PAGE_SIZE};
use simplehal::FlashController;

use crate::config::{ClockConfig, StorageLayout, MAX_STRING_LEN};

/// Flash storage wrapper
///
/// Reads outside the storage region (or misaligned multi-byte reads)
/// return 0. Writes are range and alignment checked, bracketed by
/// unlock/lock and verified by reading back.
pub struct SimpleFlash<F: FlashController> {
    pub(super) flash: F,
    pub(super) layout: StorageLayout,
    latency: u8,
    initialized: bool,
}

impl<F: FlashController> SimpleFlash<F> {
    /// Wrap a flash controller using the default CH32V003 layout
    pub fn new(flash: F) -> Self {
        Self {
            flash,
            layout: StorageLayout::default(),
            latency: ClockConfig::default().flash_latency(),
            initialized: false,
        }
    }

    /// Wrap a flash controller with a custom layout
    pub fn with_layout(flash: F, layout: StorageLayout) -> Result<Self, FlashError> {
        if !layout.is_valid() {
            return Err(FlashError::Invalid);
        }
        Ok(Self {
            layout,
            ..Self::new(flash)
        })
    }

    /// Use the flash wait states required by `clock`
    pub fn with_clock(mut self, clock: &ClockConfig) -> Self {
        self.latency = clock.flash_latency();
        self
    }

    /// Give back the flash controller
    pub fn free(self) -> F {
        self.flash
    }

    /// Storage region layout
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Set up the flash interface; repeated calls do nothing
    pub fn init(&mut self) {
        if self.initialized {
            return;
        }
        self.flash.set_latency(self.latency);
        self.initialized = true;
        debug!(
            "flash storage at {=u32:#x}..{=u32:#x}",
            self.layout.start(),
            self.layout.end()
        );
    }

    /// Run `op` with the controller unlocked, locking it again afterwards
    pub(super) fn with_unlocked<R>(
        &mut self,
        op: impl FnOnce(&mut F) -> Result<R, FlashError>,
    ) -> Result<R, FlashError> {
        self.flash.unlock()?;
        let result = op(&mut self.flash);
        self.flash.lock();
        result
    }

    /// Whether `addr` lies in the storage region
    pub fn is_address_valid(&self, addr: u32) -> bool {
        self.layout.contains(addr, 1)
    }

    /// Address of a storage page
    pub fn page_address(&self, page: u16) -> Result<u32, FlashError> {
        if !self.layout.is_storage_page(page) {
            return Err(FlashError::Range);
        }
        self.layout.page_address(page).ok_or(FlashError::Range)
    }

    fn page_of(&self, addr: u32) -> u16 {
        ((addr - self.layout.flash_base) / PAGE_SIZE as u32) as u16
    }

    fn check(&self, addr: u32, len: usize, align: u32) -> Result<(), FlashError> {
        if !self.layout.contains(addr, len) {
            return Err(FlashError::Range);
        }
        if addr % align != 0 {
            return Err(FlashError::Align);
        }
        Ok(())
    }

    /// Erase one storage page
    pub fn erase_page(&mut self, page: u16) -> Result<(), FlashError> {
        let addr = self.page_address(page)?;
        self.with_unlocked(|flash| flash.erase_page(addr))?;
        debug!("erased flash page {}", page);
        Ok(())
    }

    /// Erase the config page, then the data page
    pub fn erase_all(&mut self) -> Result<(), FlashError> {
        self.erase_page(self.layout.config_page)?;
        self.erase_page(self.layout.data_page)
    }

    /// Read a byte (0 outside the region)
    pub fn read_u8(&self, addr: u32) -> u8 {
        let mut buf = [0u8; 1];
        if self.check(addr, 1, 1).is_ok() {
            self.flash.read(addr, &mut buf);
        }
        buf[0]
    }

    /// Read a half-word (0 outside the region or when misaligned)
    pub fn read_u16(&self, addr: u32) -> u16 {
        let mut buf = [0u8; 2];
        if self.check(addr, 2, 2).is_ok() {
            self.flash.read(addr, &mut buf);
        }
        u16::from_le_bytes(buf)
    }

    /// Read a word (0 outside the region or when misaligned)
    pub fn read_u32(&self, addr: u32) -> u32 {
        let mut buf = [0u8; 4];
        if self.check(addr, 4, 4).is_ok() {
            self.flash.read(addr, &mut buf);
        }
        u32::from_le_bytes(buf)
    }

    /// Program a byte
    ///
    /// The byte is merged with its neighbour into one half-word program;
    /// the neighbour is written back unchanged.
    pub fn write_u8(&mut self, addr: u32, value: u8) -> Result<(), FlashError> {
        self.check(addr, 1, 1)?;
        let half_addr = addr & !1;
        let current = self.read_u16(half_addr);
        let merged = if addr & 1 == 0 {
            (current & 0xFF00) | value as u16
        } else {
            (current & 0x00FF) | (value as u16) << 8
        };
        self.with_unlocked(|flash| flash.program_half_word(half_addr, merged))?;
        verify(self.read_u8(addr) == value)
    }

    /// Program a half-word at an even address
    pub fn write_u16(&mut self, addr: u32, value: u16) -> Result<(), FlashError> {
        self.check(addr, 2, 2)?;
        self.with_unlocked(|flash| flash.program_half_word(addr, value))?;
        verify(self.read_u16(addr) == value)
    }

    /// Program a word at a word-aligned address
    pub fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), FlashError> {
        self.check(addr, 4, 4)?;
        self.with_unlocked(|flash| flash.program_word(addr, value))?;
        verify(self.read_u32(addr) == value)
    }

    fn check_span(&self, addr: u32, len: usize) -> Result<(), FlashError> {
        if len == 0 {
            return Err(FlashError::Invalid);
        }
        if len > PAGE_SIZE {
            return Err(FlashError::Range);
        }
        self.check(addr, len, 1)
    }

    /// Program up to one page of bytes
    ///
    /// Unaligned edges are merged with the bytes already in flash so every
    /// half-word is programmed exactly once.
    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashError> {
        self.check_span(addr, data.len())?;

        let start = addr & !1;
        let end = (addr + data.len() as u32 + 1) & !1;
        let mut image = [0u8; PAGE_SIZE + 2];
        let image = &mut image[..(end - start) as usize];
        self.flash.read(start, image);
        let offset = (addr - start) as usize;
        image[offset..offset + data.len()].copy_from_slice(data);

        self.with_unlocked(|flash| {
            for (i, pair) in image.chunks_exact(2).enumerate() {
                let half = u16::from_le_bytes([pair[0], pair[1]]);
                flash.program_half_word(start + 2 * i as u32, half)?;
            }
            Ok(())
        })?;

        let mut readback = [0u8; PAGE_SIZE];
        let readback = &mut readback[..data.len()];
        self.flash.read(addr, readback);
        verify(readback == data)
    }

    /// Read up to one page of bytes
    pub fn read_bytes(&self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        self.check_span(addr, buf.len())?;
        self.flash.read(addr, buf);
        Ok(())
    }

    /// Store a string followed by a NUL terminator
    pub fn write_string(&mut self, addr: u32, value: &str) -> Result<(), FlashError> {
        if value.len() > MAX_STRING_LEN {
            return Err(FlashError::Range);
        }
        let mut bytes: Vec<u8, { MAX_STRING_LEN + 1 }> = Vec::new();
        bytes
            .extend_from_slice(value.as_bytes())
            .map_err(|_| FlashError::Range)?;
        bytes.push(0).map_err(|_| FlashError::Range)?;
        self.write_bytes(addr, &bytes)
    }

    /// Read a NUL-terminated string
    ///
    /// Stops at the terminator, at `N` bytes, at the maximum string length
    /// or at the end of the region, whichever comes first.
    pub fn read_string<const N: usize>(&self, addr: u32) -> Result<String<N>, FlashError> {
        if !self.is_address_valid(addr) {
            return Err(FlashError::Range);
        }
        let available = (self.layout.end() - addr) as usize;
        let limit = N.min(MAX_STRING_LEN).min(available);

        let mut raw = [0u8; MAX_STRING_LEN];
        let raw = &mut raw[..limit];
        self.flash.read(addr, raw);
        let len = raw.iter().position(|&b| b == 0).unwrap_or(limit);

        let text = core::str::from_utf8(&raw[..len]).map_err(|_| FlashError::Invalid)?;
        let mut out = String::new();
        out.push_str(text).map_err(|_| FlashError::BufferTooSmall)?;
        Ok(out)
    }

    /// Rewrite the page holding `addr` with `bytes` patched in at `addr`
    fn patch_page(&mut self, addr: u32, bytes: &[u8]) -> Result<(), FlashError> {
        let page = self.page_of(addr);
        let page_addr = self.page_address(page)?;

        let mut image = [0u8; PAGE_SIZE];
        self.flash.read(page_addr, &mut image);
        let offset = (addr - page_addr) as usize;
        image[offset..offset + bytes.len()].copy_from_slice(bytes);

        self.erase_page(page)?;
        self.write_bytes(page_addr, &image)
    }

    /// Read-modify-erase-write a byte
    pub fn write_u8_with_erase(&mut self, addr: u32, value: u8) -> Result<(), FlashError> {
        self.check(addr, 1, 1)?;
        self.patch_page(addr, &[value])
    }

    /// Read-modify-erase-write a half-word
    pub fn write_u16_with_erase(&mut self, addr: u32, value: u16) -> Result<(), FlashError> {
        self.check(addr, 2, 2)?;
        self.patch_page(addr, &value.to_le_bytes())
    }

    /// Read-modify-erase-write a word
    pub fn write_u32_with_erase(&mut self, addr: u32, value: u32) -> Result<(), FlashError> {
        self.check(addr, 4, 4)?;
        self.patch_page(addr, &value.to_le_bytes())
    }
}

fn verify(ok: bool) -> Result<(), FlashError> {
    if ok {
        Ok(())
    } else {
        warn!("flash verify failed");
        Err(FlashError::Verify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFlash;

    const CONFIG: u32 = 0x0800_3F80;
    const DATA: u32 = 0x0800_3FC0;

    fn erased() -> SimpleFlash<MockFlash> {
        let mut flash = SimpleFlash::new(MockFlash::new());
        flash.init();
        flash.erase_all().unwrap();
        flash
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut flash = SimpleFlash::new(MockFlash::new());
        flash.init();
        flash.init();
        assert_eq!(flash.flash.latency_writes, 1);
        assert_eq!(flash.flash.latency, Some(0));
    }

    #[test]
    fn test_custom_layout_must_be_valid() {
        let layout = StorageLayout {
            config_page: 10,
            data_page: 10,
            ..StorageLayout::default()
        };
        assert!(matches!(
            SimpleFlash::with_layout(MockFlash::new(), layout),
            Err(FlashError::Invalid)
        ));
    }

    #[test]
    fn test_layout_beyond_address_space_rejected() {
        let layout = StorageLayout {
            flash_base: 0xFFFF_FF00,
            ..StorageLayout::default()
        };
        assert!(matches!(
            SimpleFlash::with_layout(MockFlash::new(), layout),
            Err(FlashError::Invalid)
        ));

        // A default instance still answers address queries normally
        let flash = SimpleFlash::new(MockFlash::new());
        assert!(flash.is_address_valid(CONFIG));
        assert!(!flash.is_address_valid(0xFFFF_FF00));
    }

    #[test]
    fn test_page_address() {
        let flash = SimpleFlash::new(MockFlash::new());
        assert_eq!(flash.page_address(254), Ok(CONFIG));
        assert_eq!(flash.page_address(255), Ok(DATA));
        assert_eq!(flash.page_address(0), Err(FlashError::Range));
        assert!(flash.is_address_valid(CONFIG));
        assert!(flash.is_address_valid(0x0800_3FFF));
        assert!(!flash.is_address_valid(0x0800_4000));
        assert!(!flash.is_address_valid(0x0800_0000));
    }

    #[test]
    fn test_erase_only_storage_pages() {
        let mut flash = erased();
        assert_eq!(flash.erase_page(3), Err(FlashError::Range));
        assert_eq!(flash.read_u32(CONFIG), 0xFFFF_FFFF);
        assert!(flash.flash.locked);
    }

    #[test]
    fn test_word_round_trip() {
        let mut flash = erased();
        flash.write_u32(DATA, 0xDEAD_BEEF).unwrap();
        flash.write_u16(DATA + 4, 0x1234).unwrap();
        flash.write_u8(DATA + 7, 0x56).unwrap();

        assert_eq!(flash.read_u32(DATA), 0xDEAD_BEEF);
        assert_eq!(flash.read_u16(DATA + 4), 0x1234);
        assert_eq!(flash.read_u8(DATA + 7), 0x56);
        assert_eq!(flash.read_u8(DATA + 6), 0xFF);
        assert!(flash.flash.locked);
    }

    #[test]
    fn test_adjacent_bytes_merge() {
        let mut flash = erased();
        flash.write_u8(DATA + 10, 0x11).unwrap();
        flash.write_u8(DATA + 11, 0x22).unwrap();
        assert_eq!(flash.read_u16(DATA + 10), 0x2211);
    }

    #[test]
    fn test_reads_outside_region_are_zero() {
        let flash = erased();
        assert_eq!(flash.read_u8(0x0800_0000), 0);
        assert_eq!(flash.read_u16(DATA + 1), 0);
        assert_eq!(flash.read_u32(DATA + 2), 0);
        assert_eq!(flash.read_u32(0x0800_3FFE), 0);
    }

    #[test]
    fn test_write_checks() {
        let mut flash = erased();
        assert_eq!(flash.write_u16(DATA + 1, 1), Err(FlashError::Align));
        assert_eq!(flash.write_u32(DATA + 2, 1), Err(FlashError::Align));
        assert_eq!(flash.write_u8(0x0800_0100, 1), Err(FlashError::Range));
        assert_eq!(flash.write_u32(0x0800_3FFC + 4, 1), Err(FlashError::Range));
    }

    #[test]
    fn test_overwrite_without_erase_fails_verify() {
        let mut flash = erased();
        flash.write_u16(DATA, 0x00F0).unwrap();
        assert_eq!(flash.write_u16(DATA, 0x0F0F), Err(FlashError::Verify));
    }

    #[test]
    fn test_bytes_unaligned() {
        let mut flash = erased();
        flash.write_u8(CONFIG, 0xAA).unwrap();
        flash.write_bytes(CONFIG + 1, &[1, 2, 3]).unwrap();

        let mut buf = [0u8; 5];
        flash.read_bytes(CONFIG, &mut buf).unwrap();
        assert_eq!(buf, [0xAA, 1, 2, 3, 0xFF]);
    }

    #[test]
    fn test_bytes_limits() {
        let mut flash = erased();
        let mut empty: [u8; 0] = [];
        assert_eq!(flash.write_bytes(DATA, &[]), Err(FlashError::Invalid));
        assert_eq!(flash.read_bytes(DATA, &mut empty), Err(FlashError::Invalid));
        assert_eq!(flash.write_bytes(CONFIG, &[0; 65]), Err(FlashError::Range));
        assert_eq!(flash.write_bytes(DATA + 60, &[0; 8]), Err(FlashError::Range));

        // A full page spanning both storage pages is fine
        flash.write_bytes(CONFIG + 32, &[0x42; 64]).unwrap();
        assert_eq!(flash.read_u8(DATA + 31), 0x42);
    }

    #[test]
    fn test_string_round_trip() {
        let mut flash = erased();
        flash.write_string(CONFIG, "CH32V003").unwrap();

        let text: String<32> = flash.read_string(CONFIG).unwrap();
        assert_eq!(text.as_str(), "CH32V003");
        assert_eq!(flash.read_u8(CONFIG + 8), 0);
    }

    #[test]
    fn test_string_limits() {
        let mut flash = erased();
        let long = "x".repeat(61);
        assert_eq!(flash.write_string(CONFIG, &long), Err(FlashError::Range));

        let max = "y".repeat(60);
        flash.write_string(CONFIG, &max).unwrap();
        let text: String<64> = flash.read_string(CONFIG).unwrap();
        assert_eq!(text.len(), 60);

        let short: String<4> = flash.read_string(CONFIG).unwrap();
        assert_eq!(short.as_str(), "yyyy");
    }

    #[test]
    fn test_string_from_erased_flash_is_invalid() {
        let flash = erased();
        assert!(matches!(
            flash.read_string::<16>(DATA),
            Err(FlashError::Invalid)
        ));
        assert!(matches!(
            flash.read_string::<16>(0x0800_0000),
            Err(FlashError::Range)
        ));
    }

    #[test]
    fn test_string_stops_at_region_end() {
        let mut flash = erased();
        flash.write_bytes(0x0800_3FFC, b"abcd").unwrap();
        let text: String<16> = flash.read_string(0x0800_3FFC).unwrap();
        assert_eq!(text.as_str(), "abcd");
    }

    #[test]
    fn test_write_with_erase_preserves_page() {
        let mut flash = erased();
        flash.write_u32(DATA, 0x0102_0304).unwrap();
        flash.write_u16(DATA + 4, 0x0000).unwrap();

        flash.write_u16_with_erase(DATA + 4, 0xBEEF).unwrap();
        flash.write_u8_with_erase(DATA + 63, 0x7E).unwrap();
        flash.write_u32_with_erase(DATA + 8, 0xCAFE_F00D).unwrap();

        assert_eq!(flash.read_u32(DATA), 0x0102_0304);
        assert_eq!(flash.read_u16(DATA + 4), 0xBEEF);
        assert_eq!(flash.read_u8(DATA + 63), 0x7E);
        assert_eq!(flash.read_u32(DATA + 8), 0xCAFE_F00D);
        assert_eq!(flash.read_u32(CONFIG), 0xFFFF_FFFF);
    }

    #[test]
    fn test_locked_controller_errors_propagate() {
        let mut flash = erased();
        flash.flash.refuse_unlock = true;
        assert_eq!(flash.write_u16(DATA, 1), Err(FlashError::Locked));
        assert_eq!(flash.erase_page(255), Err(FlashError::Locked));
    }
}
