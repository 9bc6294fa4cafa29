//! Flash program/erase controller
//!
//! Pages are erased with the 64-byte fast erase, data is programmed one
//! half-word at a time in standard mode. [`Flash`] implements both the
//! SimpleHAL [`FlashController`] and the `embedded-storage` NOR flash traits
//! over the whole 16 KB array.

use embedded_storage::nor_flash::{ErrorType, NorFlash, ReadNorFlash};
use simplehal::flash::{FlashError, FLASH_BASE, PAGE_SIZE, TOTAL_PAGES};
use simplehal::FlashController;

use crate::regs;

/// Code flash size in bytes
pub const FLASH_SIZE: usize = PAGE_SIZE * TOTAL_PAGES as usize;

/// Program granularity
pub const WRITE_SIZE: usize = 2;

const KEY1: u32 = 0x4567_0123;
const KEY2: u32 = 0xCDEF_89AB;

const STATR_BSY: u32 = 1 << 0;
const STATR_WRPRTERR: u32 = 1 << 4;
const STATR_EOP: u32 = 1 << 5;

const CTLR_PG: u32 = 1 << 0;
const CTLR_STRT: u32 = 1 << 6;
const CTLR_LOCK: u32 = 1 << 7;
const CTLR_FLOCK: u32 = 1 << 15;
const CTLR_FTER: u32 = 1 << 17;

const ACTLR_LATENCY_SHIFT: u32 = 0;
const ACTLR_LATENCY_WIDTH: u32 = 2;

/// Busy polls before an operation counts as hung
const BUSY_POLLS: u32 = 0x0010_0000;

/// Flash controller
pub struct Flash {
    _private: (),
}

impl Flash {
    pub(crate) const fn new() -> Self {
        Self { _private: () }
    }

    fn wait_ready(&self) -> Result<(), FlashError> {
        let flash = regs::flash();
        let mut polls = BUSY_POLLS;
        while flash.statr.is_set(STATR_BSY) {
            polls -= 1;
            if polls == 0 {
                return Err(FlashError::Timeout);
            }
        }

        let status = flash.statr.read();
        // Status flags are write-1-to-clear
        flash.statr.write(status & (STATR_WRPRTERR | STATR_EOP));
        if status & STATR_WRPRTERR != 0 {
            warn!("flash write protection error");
            return Err(FlashError::WriteProtected);
        }
        Ok(())
    }

    fn check_range(offset: u32, len: usize, align: usize) -> Result<(), FlashError> {
        let offset = offset as usize;
        if offset % align != 0 || len % align != 0 {
            return Err(FlashError::Align);
        }
        if offset.checked_add(len).map_or(true, |end| end > FLASH_SIZE) {
            return Err(FlashError::Range);
        }
        Ok(())
    }
}

impl FlashController for Flash {
    fn set_latency(&mut self, wait_states: u8) {
        regs::flash().actlr.write_field(
            ACTLR_LATENCY_SHIFT,
            ACTLR_LATENCY_WIDTH,
            wait_states as u32,
        );
    }

    fn unlock(&mut self) -> Result<(), FlashError> {
        let flash = regs::flash();
        if flash.ctlr.is_set(CTLR_LOCK) {
            flash.keyr.write(KEY1);
            flash.keyr.write(KEY2);
        }
        // Fast page erase has its own lock
        if flash.ctlr.is_set(CTLR_FLOCK) {
            flash.modekeyr.write(KEY1);
            flash.modekeyr.write(KEY2);
        }
        if flash.ctlr.is_set(CTLR_LOCK | CTLR_FLOCK) {
            return Err(FlashError::Locked);
        }
        Ok(())
    }

    fn lock(&mut self) {
        regs::flash().ctlr.set_bits(CTLR_LOCK | CTLR_FLOCK);
    }

    fn erase_page(&mut self, page_addr: u32) -> Result<(), FlashError> {
        let flash = regs::flash();
        self.wait_ready()?;
        flash.ctlr.set_bits(CTLR_FTER);
        flash.addr.write(page_addr);
        flash.ctlr.set_bits(CTLR_STRT);
        let result = self.wait_ready();
        flash.ctlr.clear_bits(CTLR_FTER);
        result.map_err(|e| match e {
            FlashError::Timeout => FlashError::Erase,
            other => other,
        })
    }

    fn program_half_word(&mut self, addr: u32, data: u16) -> Result<(), FlashError> {
        if addr % 2 != 0 {
            return Err(FlashError::Align);
        }
        let flash = regs::flash();
        self.wait_ready()?;
        flash.ctlr.set_bits(CTLR_PG);
        // SAFETY: half-word aligned address inside code flash, PG is set
        unsafe { core::ptr::write_volatile(addr as *mut u16, data) };
        let result = self.wait_ready();
        flash.ctlr.clear_bits(CTLR_PG);
        result.map_err(|e| match e {
            FlashError::Timeout => FlashError::Write,
            other => other,
        })
    }

    fn read(&self, addr: u32, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            // SAFETY: code flash is always readable
            *byte = unsafe { core::ptr::read_volatile((addr as usize + i) as *const u8) };
        }
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        Self::check_range(offset, bytes.len(), 1)?;
        FlashController::read(self, FLASH_BASE + offset, bytes);
        Ok(())
    }

    fn capacity(&self) -> usize {
        FLASH_SIZE
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WRITE_SIZE;
    const ERASE_SIZE: usize = PAGE_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if to < from {
            return Err(FlashError::Range);
        }
        Self::check_range(from, (to - from) as usize, PAGE_SIZE)?;

        self.unlock()?;
        let result = (from..to)
            .step_by(PAGE_SIZE)
            .try_for_each(|offset| self.erase_page(FLASH_BASE + offset));
        self.lock();
        result
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        Self::check_range(offset, bytes.len(), WRITE_SIZE)?;

        self.unlock()?;
        let result = bytes
            .chunks_exact(WRITE_SIZE)
            .zip((offset..).step_by(WRITE_SIZE))
            .try_for_each(|(chunk, at)| {
                self.program_half_word(FLASH_BASE + at, u16::from_le_bytes([chunk[0], chunk[1]]))
            });
        self.lock();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry() {
        assert_eq!(FLASH_SIZE, 16 * 1024);
        assert_eq!(<Flash as NorFlash>::ERASE_SIZE, 64);
    }

    #[test]
    fn test_range_checks() {
        assert_eq!(Flash::check_range(0, 64, PAGE_SIZE), Ok(()));
        assert_eq!(Flash::check_range(0x3FC0, 64, PAGE_SIZE), Ok(()));
        assert_eq!(Flash::check_range(0x3FC0, 128, PAGE_SIZE), Err(FlashError::Range));
        assert_eq!(Flash::check_range(32, 64, PAGE_SIZE), Err(FlashError::Align));
        assert_eq!(Flash::check_range(1, 2, WRITE_SIZE), Err(FlashError::Align));
        assert_eq!(Flash::check_range(2, 3, WRITE_SIZE), Err(FlashError::Align));
        assert_eq!(Flash::check_range(0x3FFF, 1, 1), Ok(()));
        assert_eq!(Flash::check_range(0x4000, 1, 1), Err(FlashError::Range));
    }
}
