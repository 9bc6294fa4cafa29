//! Wear-levelled counter on the data page
//!
//! The data page is split into eight 8-byte slots. Each write goes to the
//! slot after the newest valid one, so a page erase is only needed once
//! every slot has been used.

use simplehal::flash::{FlashError, ERASED_BYTE, PAGE_SIZE};
use simplehal::FlashController;

use super::crc::crc16;
use super::storage::SimpleFlash;

/// Bytes per slot: sequence u32, value u16, crc u16
pub const SLOT_SIZE: usize = 8;

/// Slots per data page
pub const SLOT_COUNT: usize = PAGE_SIZE / SLOT_SIZE;

const BLANK_SEQUENCE: u32 = 0xFFFF_FFFF;

/// One decoded slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WearSlot {
    /// Write sequence number, higher is newer
    pub sequence: u32,
    /// Stored value
    pub value: u16,
    /// Checksum of sequence and value
    pub crc: u16,
}

impl WearSlot {
    fn new(sequence: u32, value: u16) -> Self {
        let mut slot = Self {
            sequence,
            value,
            crc: 0,
        };
        slot.crc = slot.checksum();
        slot
    }

    fn checksum(&self) -> u16 {
        let bytes = self.to_bytes();
        crc16(&bytes[..6])
    }

    fn from_bytes(bytes: &[u8; SLOT_SIZE]) -> Self {
        Self {
            sequence: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            value: u16::from_le_bytes([bytes[4], bytes[5]]),
            crc: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    fn to_bytes(self) -> [u8; SLOT_SIZE] {
        let mut bytes = [0u8; SLOT_SIZE];
        bytes[..4].copy_from_slice(&self.sequence.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.value.to_le_bytes());
        bytes[6..].copy_from_slice(&self.crc.to_le_bytes());
        bytes
    }

    /// Slot never written since the last erase
    pub fn is_blank(&self) -> bool {
        self.sequence == BLANK_SEQUENCE
    }

    /// Written and checksum intact
    pub fn is_valid(&self) -> bool {
        !self.is_blank() && self.crc == self.checksum()
    }
}

/// Slot usage summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WearStats {
    /// Slots holding data (valid or not)
    pub used: usize,
    /// Blank slots
    pub empty: usize,
    /// Oldest valid sequence number
    pub oldest: Option<u32>,
    /// Newest valid sequence number
    pub newest: Option<u32>,
}

impl<F: FlashController> SimpleFlash<F> {
    fn slot_address(&self, index: usize) -> Result<u32, FlashError> {
        let page = self.page_address(self.layout.data_page)?;
        Ok(page + (index * SLOT_SIZE) as u32)
    }

    /// Decode slot `index` of the data page
    pub fn wear_slot(&self, index: usize) -> Option<WearSlot> {
        if index >= SLOT_COUNT {
            return None;
        }
        let mut bytes = [0u8; SLOT_SIZE];
        self.read_bytes(self.slot_address(index).ok()?, &mut bytes).ok()?;
        Some(WearSlot::from_bytes(&bytes))
    }

    fn latest_slot(&self) -> Option<(usize, WearSlot)> {
        (0..SLOT_COUNT)
            .filter_map(|i| self.wear_slot(i).map(|slot| (i, slot)))
            .filter(|(_, slot)| slot.is_valid())
            .max_by_key(|(_, slot)| slot.sequence)
    }

    /// Most recently written value
    pub fn read_leveled(&self) -> Result<u16, FlashError> {
        self.latest_slot()
            .map(|(_, slot)| slot.value)
            .ok_or(FlashError::NotFound)
    }

    /// Append `value` in the next slot
    ///
    /// The page is erased first when that slot is not blank.
    pub fn write_leveled(&mut self, value: u16) -> Result<(), FlashError> {
        let (next, sequence) = match self.latest_slot() {
            Some((index, slot)) => (
                (index + 1) % SLOT_COUNT,
                slot.sequence.saturating_add(1).min(BLANK_SEQUENCE - 1),
            ),
            None => (0, 0),
        };

        let blank = self
            .wear_slot(next)
            .is_some_and(|slot| slot.to_bytes().iter().all(|&b| b == ERASED_BYTE));
        if !blank {
            debug!("wear slot {} in use, erasing data page", next);
            self.erase_page(self.layout.data_page)?;
        }

        let slot = WearSlot::new(sequence, value);
        self.write_bytes(self.slot_address(next)?, &slot.to_bytes())
    }

    /// Summarize slot usage on the data page
    pub fn wear_stats(&self) -> WearStats {
        let mut stats = WearStats::default();
        for slot in (0..SLOT_COUNT).filter_map(|i| self.wear_slot(i)) {
            if slot.is_blank() {
                stats.empty += 1;
                continue;
            }
            stats.used += 1;
            if slot.is_valid() {
                let seq = slot.sequence;
                stats.oldest = Some(stats.oldest.map_or(seq, |s| s.min(seq)));
                stats.newest = Some(stats.newest.map_or(seq, |s| s.max(seq)));
            }
        }
        stats
    }
}
