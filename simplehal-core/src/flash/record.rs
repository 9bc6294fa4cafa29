//! CRC-checked records and keyed storage

use serde::de::DeserializeOwned;
use serde::Serialize;
use simplehal::flash::{FlashError, FlashStorage, StorageKey, PAGE_SIZE};
use simplehal::FlashController;

use super::crc::crc16;
use super::storage::SimpleFlash;

/// Length prefix plus trailing CRC
pub const RECORD_OVERHEAD: usize = 4;

/// Largest payload a record can hold
pub const MAX_RECORD_PAYLOAD: usize = PAGE_SIZE - RECORD_OVERHEAD;

const ERASED_LEN: u16 = 0xFFFF;

impl<F: FlashController> SimpleFlash<F> {
    fn key_page(&self, key: StorageKey) -> u16 {
        match key {
            StorageKey::Config => self.layout.config_page,
            StorageKey::Data => self.layout.data_page,
        }
    }

    /// Erase `page` and write a record holding `payload`
    fn write_record(&mut self, page: u16, payload: &[u8]) -> Result<(), FlashError> {
        if payload.is_empty() {
            return Err(FlashError::Invalid);
        }
        if payload.len() > MAX_RECORD_PAYLOAD {
            return Err(FlashError::Range);
        }
        let addr = self.page_address(page)?;

        let len = payload.len();
        let mut image = [0u8; PAGE_SIZE];
        image[..2].copy_from_slice(&(len as u16).to_le_bytes());
        image[2..2 + len].copy_from_slice(payload);
        image[2 + len..RECORD_OVERHEAD + len].copy_from_slice(&crc16(payload).to_le_bytes());

        self.erase_page(page)?;
        self.write_bytes(addr, &image[..RECORD_OVERHEAD + len])?;
        debug!("record of {} bytes written to page {}", len, page);
        Ok(())
    }

    /// Validate the record on `page` and copy its payload into `buf`
    fn read_record(&self, page: u16, buf: &mut [u8]) -> Result<usize, FlashError> {
        let addr = self.page_address(page)?;

        let mut image = [0u8; PAGE_SIZE];
        self.read_bytes(addr, &mut image)?;

        let len = u16::from_le_bytes([image[0], image[1]]);
        if len == ERASED_LEN {
            return Err(FlashError::NotFound);
        }
        let len = len as usize;
        if len == 0 || len > MAX_RECORD_PAYLOAD {
            warn!("corrupt record header on page {}", page);
            return Err(FlashError::Crc);
        }

        let payload = &image[2..2 + len];
        let stored = u16::from_le_bytes([image[2 + len], image[3 + len]]);
        if stored != crc16(payload) {
            warn!("record CRC mismatch on page {}", page);
            return Err(FlashError::Crc);
        }

        let out = buf.get_mut(..len).ok_or(FlashError::BufferTooSmall)?;
        out.copy_from_slice(payload);
        Ok(len)
    }

    /// Replace the configuration record
    pub fn save_config(&mut self, config: &[u8]) -> Result<(), FlashError> {
        self.write_record(self.layout.config_page, config)
    }

    /// Load the configuration record into `buf`, returning its length
    pub fn load_config(&self, buf: &mut [u8]) -> Result<usize, FlashError> {
        self.read_record(self.layout.config_page, buf)
    }

    /// Whether the configuration record is present and its CRC matches
    pub fn is_config_valid(&self) -> bool {
        let mut scratch = [0u8; MAX_RECORD_PAYLOAD];
        self.load_config(&mut scratch).is_ok()
    }

    /// Serialize `value` with postcard and store it under `key`
    pub fn save<T: Serialize>(&mut self, key: StorageKey, value: &T) -> Result<(), FlashError> {
        let mut buf = [0u8; MAX_RECORD_PAYLOAD];
        let bytes = postcard::to_slice(value, &mut buf).map_err(|_| FlashError::Serialization)?;
        self.write_record(self.key_page(key), bytes)
    }

    /// Load and deserialize the value stored under `key`
    pub fn load<T: DeserializeOwned>(&self, key: StorageKey) -> Result<T, FlashError> {
        let mut buf = [0u8; MAX_RECORD_PAYLOAD];
        let len = self.read_record(self.key_page(key), &mut buf)?;
        postcard::from_bytes(&buf[..len]).map_err(|_| FlashError::Serialization)
    }
}

impl<F: FlashController> FlashStorage for SimpleFlash<F> {
    fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        self.read_record(self.key_page(key), buffer)
    }

    fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        self.write_record(self.key_page(key), data)
    }

    fn exists(&mut self, key: StorageKey) -> bool {
        let mut scratch = [0u8; MAX_RECORD_PAYLOAD];
        self.read_record(self.key_page(key), &mut scratch).is_ok()
    }

    fn erase_all(&mut self) -> Result<(), FlashError> {
        SimpleFlash::erase_all(self)
    }
}
