//! CH32V003 backend for SimpleHAL
//!
//! Implements the `simplehal` controller traits on the CH32V003 registers
//! and owns the interrupt-shared state the `simplehal-core` drivers use.
//!
//! # Usage
//!
//! ```ignore
//! let p = simplehal_ch32v003::Peripherals::take().unwrap();
//! let mut dma = p.dma.engine();
//! let mut storage = SimpleFlash::new(p.flash);
//! ```
//!
//! The application's interrupt handlers forward to [`dma::on_interrupt`],
//! [`watchdog::on_wwdg_interrupt`] and [`systick::on_tick`].
//!
//! # Features
//!
//! - `defmt` - Enable debug formatting and logging
//! - `critical-section-impl` - Provide the `critical-section` implementation
//!   (global interrupt enable in `mstatus`)

#![no_std]

// Must come first so the logging macros are visible to the other modules
#[macro_use]
mod fmt;

pub mod adc;
pub mod delay;
pub mod dma;
pub mod flash;
pub mod peripherals;
pub mod pfic;
pub mod rcc;
mod regs;
pub mod systick;
pub mod watchdog;

#[cfg(all(feature = "critical-section-impl", target_arch = "riscv32"))]
mod critical_section_impl;

pub use adc::Adc;
pub use delay::CycleDelay;
pub use dma::Dma1;
pub use flash::Flash;
pub use peripherals::Peripherals;
pub use systick::SysTick;
pub use watchdog::{IwdgRegs, WwdgRegs};

// Re-export shared types
pub use simplehal::flash::StorageKey;
