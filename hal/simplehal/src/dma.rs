//! DMA abstractions
//!
//! The CH32V003 has a single DMA controller (DMA1) with seven channels.
//! Each channel is wired to a fixed set of peripheral requests; memory to
//! memory transfers can use any channel.

/// Number of DMA1 channels
pub const CHANNEL_COUNT: usize = 7;

/// Largest transfer the 16-bit counter can hold
pub const MAX_TRANSFER: usize = u16::MAX as usize;

/// DMA1 channel
///
/// With equal software priority the lower channel number wins arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Channel {
    Ch1 = 1,
    Ch2 = 2,
    Ch3 = 3,
    Ch4 = 4,
    Ch5 = 5,
    Ch6 = 6,
    Ch7 = 7,
}

impl Channel {
    /// All channels in arbitration order
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Ch1,
        Channel::Ch2,
        Channel::Ch3,
        Channel::Ch4,
        Channel::Ch5,
        Channel::Ch6,
        Channel::Ch7,
    ];

    /// Channel number as printed in the reference manual (1-7)
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Zero-based index for per-channel tables
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Create a channel from its number (1-7)
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1..=7 => Some(Self::ALL[number as usize - 1]),
            _ => None,
        }
    }
}

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Peripheral register into memory
    #[default]
    PeripheralToMemory,
    /// Memory into a peripheral register
    MemoryToPeripheral,
    /// Memory to memory; the "peripheral" address is the source
    MemoryToMemory,
}

/// Software channel priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

/// Width of each transferred item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataSize {
    /// 8-bit
    #[default]
    Byte,
    /// 16-bit
    HalfWord,
    /// 32-bit
    Word,
}

/// Channel operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Transfer once, then stop
    #[default]
    Normal,
    /// Reload the counter and wrap (ring buffer)
    Circular,
}

impl Mode {
    /// Normal or circular from a "keep running" flag
    pub const fn from_circular(circular: bool) -> Self {
        if circular {
            Mode::Circular
        } else {
            Mode::Normal
        }
    }
}

/// Software view of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Not in use
    #[default]
    Idle,
    /// Transfer running
    Busy,
    /// Transfer complete
    Complete,
    /// Transfer error
    Error,
}

/// Peripherals with a DMA request line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    Adc1,
    Usart1,
    Spi1,
    I2c1,
    Tim1,
    Tim2,
}

/// Which request of a peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// Memory to peripheral (TX, compare update)
    Tx,
    /// Peripheral to memory (RX, conversion result)
    Rx,
}

/// Hard-wired request to channel mapping of DMA1
///
/// Returns the channel the peripheral request is routed to.
pub const fn request_channel(peripheral: Peripheral, request: Request) -> Channel {
    match (peripheral, request) {
        (Peripheral::Adc1, _) => Channel::Ch1,
        (Peripheral::Spi1, Request::Rx) => Channel::Ch2,
        (Peripheral::Spi1, Request::Tx) => Channel::Ch3,
        (Peripheral::Usart1, Request::Tx) => Channel::Ch4,
        (Peripheral::Usart1, Request::Rx) => Channel::Ch5,
        (Peripheral::I2c1, Request::Tx) => Channel::Ch6,
        (Peripheral::I2c1, Request::Rx) => Channel::Ch7,
        // TIM1_UP and TIM2_UP
        (Peripheral::Tim1, _) => Channel::Ch5,
        (Peripheral::Tim2, _) => Channel::Ch2,
    }
}

/// Complete configuration of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaConfig {
    /// Channel to program
    pub channel: Channel,
    /// Transfer direction
    pub direction: Direction,
    /// Arbitration priority
    pub priority: Priority,
    /// Item width (peripheral and memory side)
    pub data_size: DataSize,
    /// Normal or circular
    pub mode: Mode,
    /// Increment the memory address after each item
    pub mem_increment: bool,
    /// Increment the peripheral address after each item
    pub periph_increment: bool,
    /// Peripheral (or source, for memory to memory) address
    pub periph_addr: usize,
    /// Memory (or destination, for memory to memory) address
    pub mem_addr: usize,
    /// Number of items to transfer
    pub buffer_size: u16,
}

impl DmaConfig {
    /// Memory to memory byte copy with both addresses incrementing
    pub const fn mem_to_mem(channel: Channel, src: usize, dst: usize, len: u16) -> Self {
        Self {
            channel,
            direction: Direction::MemoryToMemory,
            priority: Priority::High,
            data_size: DataSize::Byte,
            mode: Mode::Normal,
            mem_increment: true,
            periph_increment: true,
            periph_addr: src,
            mem_addr: dst,
            buffer_size: len,
        }
    }
}

impl Default for DmaConfig {
    fn default() -> Self {
        Self {
            channel: Channel::Ch1,
            direction: Direction::PeripheralToMemory,
            priority: Priority::Medium,
            data_size: DataSize::Byte,
            mode: Mode::Normal,
            mem_increment: true,
            periph_increment: false,
            periph_addr: 0,
            mem_addr: 0,
            buffer_size: 0,
        }
    }
}

/// Pending interrupt flags of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelFlags {
    /// Transfer complete (TCIF)
    pub complete: bool,
    /// Half transfer (HTIF)
    pub half: bool,
    /// Transfer error (TEIF)
    pub error: bool,
}

impl ChannelFlags {
    /// No flags
    pub const NONE: Self = Self {
        complete: false,
        half: false,
        error: false,
    };

    /// Every flag, used to clear the global flag of a channel
    pub const ALL: Self = Self {
        complete: true,
        half: true,
        error: true,
    };

    /// Complete and error flags only
    pub const COMPLETE_AND_ERROR: Self = Self {
        complete: true,
        half: false,
        error: true,
    };

    /// Check whether any flag is set
    pub const fn any(&self) -> bool {
        self.complete || self.half || self.error
    }
}

/// DMA1 register access
///
/// Implemented by the chip backend. Every method maps onto a handful of
/// register writes; the software state machine lives in `simplehal-core`.
pub trait DmaController {
    /// Enable the DMA1 bus clock
    fn enable_clock(&mut self);

    /// Program a channel from `config`
    ///
    /// The channel is left disabled.
    fn configure(&mut self, config: &DmaConfig);

    /// Enable or disable a channel (EN bit)
    fn set_enabled(&mut self, channel: Channel, enabled: bool);

    /// Reprogram memory address and item count
    ///
    /// Only valid while the channel is disabled.
    fn set_transfer(&mut self, channel: Channel, mem_addr: usize, count: u16);

    /// Items left in the current pass
    fn remaining(&self, channel: Channel) -> u16;

    /// Pending flags of a channel
    fn flags(&self, channel: Channel) -> ChannelFlags;

    /// Clear the given flags of a channel
    fn clear_flags(&mut self, channel: Channel, flags: ChannelFlags);

    /// Enable the transfer complete and/or transfer error interrupts
    fn set_interrupts(&mut self, channel: Channel, complete: bool, error: bool);

    /// Enable or disable the channel interrupt line in the interrupt controller
    fn set_irq_enabled(&mut self, channel: Channel, enabled: bool);

    /// Address of the data register a peripheral exposes to DMA
    fn peripheral_address(&self, peripheral: Peripheral) -> usize;

    /// Enable or disable a peripheral's DMA request
    fn set_peripheral_request(&mut self, peripheral: Peripheral, request: Request, enabled: bool);
}
