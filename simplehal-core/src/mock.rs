//! Host stand-ins for the controller traits

use core::cell::Cell;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use simplehal::adc::{AdcChannel, SampleTime};
use simplehal::dma::{Channel, ChannelFlags, DmaConfig, Peripheral, Request, CHANNEL_COUNT};
use simplehal::flash::{FlashError, ERASED_BYTE, FLASH_BASE, PAGE_SIZE, TOTAL_PAGES};
use simplehal::watchdog::{IwdgPrescaler, WwdgPrescaler};
use simplehal::{AdcController, DmaController, FlashController, IwdgController, Millis, WwdgController};

fn peripheral_index(peripheral: Peripheral) -> usize {
    match peripheral {
        Peripheral::Adc1 => 0,
        Peripheral::Usart1 => 1,
        Peripheral::Spi1 => 2,
        Peripheral::I2c1 => 3,
        Peripheral::Tim1 => 4,
        Peripheral::Tim2 => 5,
    }
}

fn request_index(request: Request) -> usize {
    match request {
        Request::Tx => 0,
        Request::Rx => 1,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct MockChannel {
    config: Option<DmaConfig>,
    enabled: bool,
    mem_addr: usize,
    count: u16,
    remaining: u16,
    flags: ChannelFlags,
    complete_irq: bool,
    error_irq: bool,
    irq: bool,
}

/// DMA1 emulation
///
/// Enabling a channel completes it at once while `auto_complete` is set,
/// or raises the error flag on `fail_channel`.
pub struct MockDma {
    pub clock_enabled: bool,
    pub auto_complete: bool,
    pub fail_channel: Option<Channel>,
    channels: [MockChannel; CHANNEL_COUNT],
    requests: [[bool; 2]; 6],
    enables: Vec<Channel>,
}

impl MockDma {
    pub fn new() -> Self {
        Self {
            clock_enabled: false,
            auto_complete: true,
            fail_channel: None,
            channels: [MockChannel::default(); CHANNEL_COUNT],
            requests: [[false; 2]; 6],
            enables: Vec::new(),
        }
    }

    fn channel(&self, channel: Channel) -> &MockChannel {
        &self.channels[channel.index()]
    }

    fn channel_mut(&mut self, channel: Channel) -> &mut MockChannel {
        &mut self.channels[channel.index()]
    }

    /// Set flags as the hardware would
    pub fn raise(&mut self, channel: Channel, flags: ChannelFlags) {
        let current = self.flags(channel);
        self.channel_mut(channel).flags = ChannelFlags {
            complete: current.complete || flags.complete,
            half: current.half || flags.half,
            error: current.error || flags.error,
        };
    }

    /// Drain a channel and raise its complete flag
    pub fn finish(&mut self, channel: Channel) {
        self.channel_mut(channel).remaining = 0;
        self.raise(
            channel,
            ChannelFlags {
                complete: true,
                ..ChannelFlags::NONE
            },
        );
    }

    pub fn config(&self, channel: Channel) -> Option<DmaConfig> {
        self.channel(channel).config
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        self.channel(channel).enabled
    }

    /// (complete, error) interrupt enables
    pub fn interrupts(&self, channel: Channel) -> (bool, bool) {
        let ch = self.channel(channel);
        (ch.complete_irq, ch.error_irq)
    }

    pub fn irq_enabled(&self, channel: Channel) -> bool {
        self.channel(channel).irq
    }

    pub fn request_enabled(&self, peripheral: Peripheral, request: Request) -> bool {
        self.requests[peripheral_index(peripheral)][request_index(request)]
    }

    /// Memory address and count of the last programmed transfer
    pub fn transfer(&self, channel: Channel) -> (usize, u16) {
        let ch = self.channel(channel);
        (ch.mem_addr, ch.count)
    }

    pub fn set_remaining(&mut self, channel: Channel, remaining: u16) {
        self.channel_mut(channel).remaining = remaining;
    }

    /// Channels in the order they were enabled
    pub fn enable_order(&self) -> &[Channel] {
        &self.enables
    }
}

impl DmaController for MockDma {
    fn enable_clock(&mut self) {
        self.clock_enabled = true;
    }

    fn configure(&mut self, config: &DmaConfig) {
        let ch = self.channel_mut(config.channel);
        ch.config = Some(*config);
        ch.enabled = false;
        ch.mem_addr = config.mem_addr;
        ch.count = config.buffer_size;
        ch.remaining = config.buffer_size;
    }

    fn set_enabled(&mut self, channel: Channel, enabled: bool) {
        self.channel_mut(channel).enabled = enabled;
        if !enabled {
            return;
        }
        self.enables.push(channel);
        if self.fail_channel == Some(channel) {
            self.raise(
                channel,
                ChannelFlags {
                    error: true,
                    ..ChannelFlags::NONE
                },
            );
        } else if self.auto_complete {
            self.finish(channel);
        }
    }

    fn set_transfer(&mut self, channel: Channel, mem_addr: usize, count: u16) {
        let ch = self.channel_mut(channel);
        ch.mem_addr = mem_addr;
        ch.count = count;
        ch.remaining = count;
    }

    fn remaining(&self, channel: Channel) -> u16 {
        self.channel(channel).remaining
    }

    fn flags(&self, channel: Channel) -> ChannelFlags {
        self.channel(channel).flags
    }

    fn clear_flags(&mut self, channel: Channel, flags: ChannelFlags) {
        let current = self.flags(channel);
        self.channel_mut(channel).flags = ChannelFlags {
            complete: current.complete && !flags.complete,
            half: current.half && !flags.half,
            error: current.error && !flags.error,
        };
    }

    fn set_interrupts(&mut self, channel: Channel, complete: bool, error: bool) {
        let ch = self.channel_mut(channel);
        ch.complete_irq = complete;
        ch.error_irq = error;
    }

    fn set_irq_enabled(&mut self, channel: Channel, enabled: bool) {
        self.channel_mut(channel).irq = enabled;
    }

    fn peripheral_address(&self, peripheral: Peripheral) -> usize {
        match peripheral {
            Peripheral::Adc1 => 0x4001_244C,
            Peripheral::Usart1 => 0x4001_3804,
            Peripheral::Spi1 => 0x4001_300C,
            Peripheral::I2c1 => 0x4000_5410,
            Peripheral::Tim1 => 0x4001_2C34,
            Peripheral::Tim2 => 0x4000_0034,
        }
    }

    fn set_peripheral_request(&mut self, peripheral: Peripheral, request: Request, enabled: bool) {
        self.requests[peripheral_index(peripheral)][request_index(request)] = enabled;
    }
}

/// Delay that only adds up the requested time
#[derive(Debug, Default)]
pub struct MockDelay {
    pub total_ms: u32,
    pub total_ns: u64,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ms += ms;
        self.total_ns += ms as u64 * 1_000_000;
    }
}

#[derive(Debug, Default)]
pub struct MockAdc {
    pub channel: Option<AdcChannel>,
    pub sample_time: Option<SampleTime>,
    pub calibrated: bool,
    pub running: bool,
}

impl AdcController for MockAdc {
    fn configure_continuous(&mut self, channel: AdcChannel, sample_time: SampleTime) {
        self.channel = Some(channel);
        self.sample_time = Some(sample_time);
    }

    fn calibrate(&mut self) {
        self.calibrated = true;
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

const FLASH_SIZE: usize = PAGE_SIZE * TOTAL_PAGES as usize;

/// NOR flash emulation: erase sets 0xFF, programming can only clear bits
pub struct MockFlash {
    memory: Vec<u8>,
    pub locked: bool,
    pub refuse_unlock: bool,
    pub latency: Option<u8>,
    pub latency_writes: u32,
    pub erase_count: u32,
}

impl MockFlash {
    pub fn new() -> Self {
        Self {
            memory: std::vec![ERASED_BYTE; FLASH_SIZE],
            locked: true,
            refuse_unlock: false,
            latency: None,
            latency_writes: 0,
            erase_count: 0,
        }
    }

    fn offset(addr: u32, len: usize) -> Option<usize> {
        let offset = addr.checked_sub(FLASH_BASE)? as usize;
        (offset + len <= FLASH_SIZE).then_some(offset)
    }
}

impl FlashController for MockFlash {
    fn set_latency(&mut self, wait_states: u8) {
        self.latency = Some(wait_states);
        self.latency_writes += 1;
    }

    fn unlock(&mut self) -> Result<(), FlashError> {
        if self.refuse_unlock {
            return Err(FlashError::Locked);
        }
        self.locked = false;
        Ok(())
    }

    fn lock(&mut self) {
        self.locked = true;
    }

    fn erase_page(&mut self, page_addr: u32) -> Result<(), FlashError> {
        if self.locked {
            return Err(FlashError::Locked);
        }
        if page_addr.wrapping_sub(FLASH_BASE) % PAGE_SIZE as u32 != 0 {
            return Err(FlashError::Align);
        }
        let offset = Self::offset(page_addr, PAGE_SIZE).ok_or(FlashError::Range)?;
        self.memory[offset..offset + PAGE_SIZE].fill(ERASED_BYTE);
        self.erase_count += 1;
        Ok(())
    }

    fn program_half_word(&mut self, addr: u32, data: u16) -> Result<(), FlashError> {
        if self.locked {
            return Err(FlashError::Locked);
        }
        if addr % 2 != 0 {
            return Err(FlashError::Align);
        }
        let offset = Self::offset(addr, 2).ok_or(FlashError::Range)?;
        for (cell, byte) in self.memory[offset..offset + 2].iter_mut().zip(data.to_le_bytes()) {
            *cell &= byte;
        }
        Ok(())
    }

    fn read(&self, addr: u32, buf: &mut [u8]) {
        match Self::offset(addr, buf.len()) {
            Some(offset) => buf.copy_from_slice(&self.memory[offset..offset + buf.len()]),
            None => buf.fill(0),
        }
    }
}

/// IWDG emulation that records the register write sequence
#[derive(Debug, Default)]
pub struct MockIwdg {
    pub lsi_enabled: bool,
    pub prescaler: Option<IwdgPrescaler>,
    pub reload_value: Option<u16>,
    /// Polls of the update flags left before they clear
    pub update_polls: Cell<u32>,
    pub reloads: u32,
    pub enabled: bool,
    pub reset_flag: bool,
    pub log: Vec<&'static str>,
}

impl MockIwdg {
    pub fn with_update_polls(polls: u32) -> Self {
        Self {
            update_polls: Cell::new(polls),
            ..Self::default()
        }
    }
}

impl IwdgController for MockIwdg {
    fn enable_lsi(&mut self) {
        self.lsi_enabled = true;
    }

    fn unlock(&mut self) {
        self.log.push("unlock");
    }

    fn set_prescaler(&mut self, prescaler: IwdgPrescaler) {
        self.prescaler = Some(prescaler);
        self.log.push("prescaler");
    }

    fn set_reload(&mut self, reload: u16) {
        self.reload_value = Some(reload);
        self.log.push("reload_value");
    }

    fn is_updating(&self) -> bool {
        let left = self.update_polls.get();
        if left == 0 {
            return false;
        }
        self.update_polls.set(left - 1);
        true
    }

    fn reload(&mut self) {
        self.reloads += 1;
        self.log.push("reload");
    }

    fn enable(&mut self) {
        self.enabled = true;
        self.log.push("enable");
    }

    fn was_reset_cause(&self) -> bool {
        self.reset_flag
    }

    fn clear_reset_flags(&mut self) {
        self.reset_flag = false;
    }
}

#[derive(Debug, Default)]
pub struct MockWwdg {
    pub clock_enabled: bool,
    pub prescaler: Option<WwdgPrescaler>,
    pub window: Option<u8>,
    pub counter: Option<u8>,
    pub ewi_enabled: bool,
    pub irq_enabled: bool,
    /// Early wakeup flag
    pub ewif: bool,
    pub resets: u32,
    pub reset_flag: bool,
}

impl WwdgController for MockWwdg {
    fn enable_clock(&mut self) {
        self.clock_enabled = true;
    }

    fn set_prescaler(&mut self, prescaler: WwdgPrescaler) {
        self.prescaler = Some(prescaler);
    }

    fn set_window(&mut self, window: u8) {
        self.window = Some(window);
    }

    fn set_early_wakeup_interrupt(&mut self, enabled: bool) {
        self.ewi_enabled = enabled;
    }

    fn set_irq_enabled(&mut self, enabled: bool) {
        self.irq_enabled = enabled;
    }

    fn enable(&mut self, counter: u8) {
        self.counter = Some(counter);
    }

    fn set_counter(&mut self, counter: u8) {
        self.counter = Some(counter);
    }

    fn early_wakeup_pending(&self) -> bool {
        self.ewif
    }

    fn clear_early_wakeup(&mut self) {
        self.ewif = false;
    }

    fn reset(&mut self) {
        *self = Self {
            clock_enabled: self.clock_enabled,
            irq_enabled: self.irq_enabled,
            resets: self.resets + 1,
            reset_flag: self.reset_flag,
            ..Self::default()
        };
    }

    fn was_reset_cause(&self) -> bool {
        self.reset_flag
    }
}

/// Settable millisecond clock
pub struct MockMillis {
    now: Cell<u32>,
}

impl MockMillis {
    pub fn new(now: u32) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: u32) {
        self.now.set(now);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Millis for MockMillis {
    fn millis(&self) -> u32 {
        self.now.get()
    }
}
