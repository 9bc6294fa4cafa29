//! Register-independent logic for the SimpleHAL CH32V003 wrappers
//!
//! Everything here is written against the `simplehal` controller traits,
//! so it runs unchanged on the chip and on the host:
//!
//! - DMA engine with a per-channel status and callback table
//! - Flash storage (raw access, strings, CRC-checked records, wear levelling)
//! - ADC conversion helpers
//! - Watchdog timing and control
//! - Periodic task timers
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

// Must come first so the logging macros are visible to the other modules
#[macro_use]
mod fmt;

pub mod adc;
pub mod config;
pub mod dma;
pub mod flash;
pub mod task;
pub mod watchdog;

#[cfg(test)]
pub(crate) mod mock;
