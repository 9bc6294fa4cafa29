//! Flash storage
//!
//! [`SimpleFlash`] wraps a [`simplehal::FlashController`] and confines
//! every access to the storage region described by a
//! [`StorageLayout`](crate::config::StorageLayout): by default the last two
//! 64-byte pages, the first holding the configuration record and the second
//! general data.
//!
//! # Record format
//!
//! Keyed records (configuration, typed values) start at the page address:
//!
//! ```text
//! +---------+-------------------+--------------+
//! | len u16 | payload (len B)   | crc16 u16    |
//! +---------+-------------------+--------------+
//! ```
//!
//! Both integers are little endian and the CRC covers the payload only.

mod crc;
mod record;
mod storage;
mod wear;

pub use self::crc::crc16;
pub use record::{MAX_RECORD_PAYLOAD, RECORD_OVERHEAD};
pub use storage::SimpleFlash;
pub use wear::{WearSlot, WearStats, SLOT_COUNT, SLOT_SIZE};

pub use simplehal::flash::{FlashError, StorageKey, PAGE_SIZE};
