//! Flash storage abstractions
//!
//! Two layers: [`FlashController`] is the raw erase/program interface a
//! chip backend provides, [`FlashStorage`] is the keyed, CRC-checked store
//! built on top of it in `simplehal-core`.

use embedded_storage::nor_flash::{NorFlashError, NorFlashErrorKind};

/// Flash page size in bytes (CH32V003 fast-erase page)
pub const PAGE_SIZE: usize = 64;

/// Number of 64-byte pages in the 16 KB code flash
pub const TOTAL_PAGES: u16 = 256;

/// Start of code flash in the memory map
pub const FLASH_BASE: u32 = 0x0800_0000;

/// Value of an erased byte
pub const ERASED_BYTE: u8 = 0xFF;

/// Storage keys
///
/// Each key owns one page of the storage region. The store keeps a
/// length-prefixed, CRC-checked record at the start of that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageKey {
    /// Application configuration (config page)
    Config = 0,
    /// General data (data page)
    Data = 1,
}

impl StorageKey {
    /// Get the key as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a key from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StorageKey::Config),
            1 => Some(StorageKey::Data),
            _ => None,
        }
    }
}

/// Errors from flash operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Controller still busy with a previous operation
    Busy,
    /// Operation did not finish in time
    Timeout,
    /// Programming failed
    Write,
    /// Target is write protected
    WriteProtected,
    /// Erase failed
    Erase,
    /// Read-back differs from what was written
    Verify,
    /// Address not aligned for the access width
    Align,
    /// Address or page outside the storage region
    Range,
    /// Stored checksum does not match
    Crc,
    /// Invalid argument (empty buffer, bad UTF-8, ...)
    Invalid,
    /// Flash is locked
    Locked,
    /// Key not found (page erased or never written)
    NotFound,
    /// Buffer too small for the data
    BufferTooSmall,
    /// Typed value could not be encoded or decoded
    Serialization,
}

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            FlashError::Align => NorFlashErrorKind::NotAligned,
            FlashError::Range => NorFlashErrorKind::OutOfBounds,
            _ => NorFlashErrorKind::Other,
        }
    }
}

/// Raw flash controller
///
/// Addresses are absolute (`FLASH_BASE`-relative memory map). The caller
/// is responsible for range checks; implementations only report what the
/// hardware reports.
pub trait FlashController {
    /// Set the number of wait states (0 for HCLK <= 24 MHz)
    fn set_latency(&mut self, wait_states: u8);

    /// Unlock the program/erase controller
    fn unlock(&mut self) -> Result<(), FlashError>;

    /// Lock the program/erase controller
    fn lock(&mut self);

    /// Erase the 64-byte page starting at `page_addr`
    fn erase_page(&mut self, page_addr: u32) -> Result<(), FlashError>;

    /// Program one half-word at a half-word aligned address
    fn program_half_word(&mut self, addr: u32, data: u16) -> Result<(), FlashError>;

    /// Program one word as two half-word operations
    fn program_word(&mut self, addr: u32, data: u32) -> Result<(), FlashError> {
        self.program_half_word(addr, data as u16)?;
        self.program_half_word(addr + 2, (data >> 16) as u16)
    }

    /// Read bytes starting at `addr`
    fn read(&self, addr: u32, buf: &mut [u8]);
}

/// Flash storage trait
///
/// Provides small keyed records for configuration data.
/// Implementations should handle:
/// - Data integrity (CRC)
/// - Erase-before-write of the owning page
pub trait FlashStorage {
    /// Read a value by key into the provided buffer
    ///
    /// # Returns
    /// The number of bytes read, or an error.
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError>;

    /// Write a value by key
    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError>;

    /// Check if a valid record exists for a key
    fn exists(&mut self, key: StorageKey) -> bool;

    /// Erase all stored data
    ///
    /// This erases every page of the storage region.
    fn erase_all(&mut self) -> Result<(), FlashError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_round_trip() {
        for key in [StorageKey::Config, StorageKey::Data] {
            assert_eq!(StorageKey::from_u8(key.as_u8()), Some(key));
        }
        assert_eq!(StorageKey::from_u8(2), None);
    }

    #[test]
    fn test_nor_flash_error_kind() {
        assert_eq!(FlashError::Align.kind(), NorFlashErrorKind::NotAligned);
        assert_eq!(FlashError::Range.kind(), NorFlashErrorKind::OutOfBounds);
        assert_eq!(FlashError::Locked.kind(), NorFlashErrorKind::Other);
    }
}
