//! SimpleHAL hardware abstraction layer
//!
//! This crate defines the types shared by every SimpleHAL crate and the
//! traits a chip backend implements. The register-independent logic in
//! `simplehal-core` is written against these traits only, so it can be
//! exercised on the host with mock controllers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application                            │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  simplehal-core (DMA engine, storage)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  simplehal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  simplehal-ch32v003 (registers)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`dma::DmaController`] - DMA1 channel registers
//! - [`flash::FlashController`] - Flash erase/program primitives
//! - [`flash::FlashStorage`] - Keyed persistent storage
//! - [`adc::AdcController`] - ADC1 continuous conversion
//! - [`watchdog::IwdgController`], [`watchdog::WwdgController`] - Watchdogs
//! - [`time::Millis`] - Millisecond tick source

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod dma;
pub mod flash;
pub mod gpio;
pub mod time;
pub mod watchdog;

// Re-export key traits at crate root for convenience
pub use adc::AdcController;
pub use dma::DmaController;
pub use flash::{FlashController, FlashStorage, StorageKey};
pub use gpio::Pin;
pub use time::Millis;
pub use watchdog::{IwdgController, WwdgController};
