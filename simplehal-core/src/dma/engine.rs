//! Channel-level DMA operations

use core::sync::atomic::{compiler_fence, Ordering};

use embedded_hal::delay::DelayNs;
use simplehal::dma::{Channel, ChannelFlags, DmaConfig, Status};
use simplehal::DmaController;

use super::peripheral::ANALOG_READ_CHANNEL;
use super::state::DmaState;
use super::transfer::Transfer;
use super::{transfer_len, Callback, DmaError};

/// Channel used by the blocking memory operations
pub const BLOCKING_CHANNEL: Channel = Channel::Ch1;

/// DMA engine
///
/// Owns the register interface and shares the channel table with the
/// interrupt handlers.
pub struct Dma<'s, C: DmaController> {
    pub(super) regs: C,
    pub(super) state: &'s DmaState,
    pub(super) analog_active: bool,
}

impl<'s, C: DmaController> Dma<'s, C> {
    /// Create the engine
    pub fn new(regs: C, state: &'s DmaState) -> Self {
        Self {
            regs,
            state,
            analog_active: false,
        }
    }

    /// Give back the register interface
    pub fn free(self) -> C {
        self.regs
    }

    /// The shared channel table
    pub fn state(&self) -> &'s DmaState {
        self.state
    }

    /// Program a channel
    ///
    /// Enables the DMA clock, resets the channel and writes the
    /// configuration. The channel is left disabled and idle.
    pub fn init(&mut self, config: &DmaConfig) {
        self.regs.enable_clock();
        self.reset(config.channel);
        self.regs.configure(config);
        self.state.set_status(config.channel, Status::Idle);
        debug!(
            "DMA channel {} configured, {} items",
            config.channel.number(),
            config.buffer_size
        );
    }

    /// Start a configured channel
    pub fn start(&mut self, channel: Channel) {
        self.regs.clear_flags(channel, ChannelFlags::COMPLETE_AND_ERROR);
        self.state.set_status(channel, Status::Busy);
        self.regs.set_enabled(channel, true);
    }

    /// Stop a channel
    pub fn stop(&mut self, channel: Channel) {
        self.regs.set_enabled(channel, false);
        self.state.set_status(channel, Status::Idle);
    }

    /// Current status of a channel
    ///
    /// Pending hardware flags update the recorded status first; an error
    /// flag takes precedence over a complete flag.
    pub fn status(&self, channel: Channel) -> Status {
        let flags = self.regs.flags(channel);
        if flags.complete {
            self.state.set_status(channel, Status::Complete);
        }
        if flags.error {
            self.state.set_status(channel, Status::Error);
        }
        self.state.status(channel)
    }

    /// Wait for a channel to finish
    ///
    /// `timeout_ms == 0` waits forever.
    pub fn wait_complete<D: DelayNs>(
        &self,
        channel: Channel,
        timeout_ms: u32,
        delay: &mut D,
    ) -> Result<(), DmaError> {
        let mut waited_ms = 0;
        loop {
            match self.status(channel) {
                Status::Complete => {
                    compiler_fence(Ordering::Acquire);
                    return Ok(());
                }
                Status::Error => return Err(DmaError::Transfer),
                Status::Idle => return Err(DmaError::NotStarted),
                Status::Busy => {}
            }

            if timeout_ms == 0 {
                core::hint::spin_loop();
                continue;
            }
            if waited_ms >= timeout_ms {
                warn!("DMA channel {} timed out", channel.number());
                return Err(DmaError::Timeout);
            }
            delay.delay_ms(1);
            waited_ms += 1;
        }
    }

    /// Spin until a channel finishes; memory transfers always terminate
    pub(super) fn block_until_done(&self, channel: Channel) -> Result<(), DmaError> {
        loop {
            match self.status(channel) {
                Status::Complete => {
                    compiler_fence(Ordering::Acquire);
                    return Ok(());
                }
                Status::Error => return Err(DmaError::Transfer),
                Status::Idle => return Err(DmaError::NotStarted),
                Status::Busy => core::hint::spin_loop(),
            }
        }
    }

    /// Register a transfer complete callback
    ///
    /// Enables the channel's complete interrupt and its interrupt line.
    pub fn set_transfer_complete_callback(&mut self, channel: Channel, callback: Callback) {
        self.state.set_complete_callback(channel, Some(callback));
        self.regs.set_interrupts(channel, true, self.error_interrupt(channel));
        self.regs.set_irq_enabled(channel, true);
    }

    /// Register a transfer error callback
    ///
    /// Enables the channel's error interrupt and its interrupt line.
    pub fn set_error_callback(&mut self, channel: Channel, callback: Callback) {
        self.state.set_error_callback(channel, Some(callback));
        self.regs.set_interrupts(channel, self.complete_interrupt(channel), true);
        self.regs.set_irq_enabled(channel, true);
    }

    fn complete_interrupt(&self, channel: Channel) -> bool {
        self.state.has_complete_callback(channel)
    }

    fn error_interrupt(&self, channel: Channel) -> bool {
        self.state.has_error_callback(channel)
    }

    /// Disable a channel, clear all its flags and mark it idle
    pub fn reset(&mut self, channel: Channel) {
        self.regs.set_enabled(channel, false);
        self.regs.clear_flags(channel, ChannelFlags::ALL);
        self.state.set_status(channel, Status::Idle);
    }

    /// Items left in the current pass
    pub fn remaining(&self, channel: Channel) -> u16 {
        self.regs.remaining(channel)
    }

    /// Enable or disable the channel interrupt line
    pub fn enable_interrupt(&mut self, channel: Channel, enable: bool) {
        self.regs.set_irq_enabled(channel, enable);
    }

    /// Service a channel interrupt through this engine's registers
    pub fn on_interrupt(&mut self, channel: Channel) {
        super::handle_interrupt(&mut self.regs, self.state, channel);
    }

    /// Refuse to reprogram the blocking channel under an analogRead stream
    fn claim_blocking_channel(&self) -> Result<(), DmaError> {
        if self.analog_active && BLOCKING_CHANNEL == ANALOG_READ_CHANNEL {
            warn!(
                "DMA channel {} is streaming analogRead samples",
                BLOCKING_CHANNEL.number()
            );
            return Err(DmaError::ChannelInUse);
        }
        Ok(())
    }

    /// Copy `src` into `dst` on [`BLOCKING_CHANNEL`] and wait
    pub fn mem_copy(&mut self, dst: &mut [u8], src: &[u8]) -> Result<(), DmaError> {
        self.claim_blocking_channel()?;
        if dst.len() != src.len() {
            return Err(DmaError::LengthMismatch);
        }
        let len = transfer_len(src.len())?;

        let config = DmaConfig::mem_to_mem(
            BLOCKING_CHANNEL,
            src.as_ptr() as usize,
            dst.as_mut_ptr() as usize,
            len,
        );
        self.run_blocking(&config)
    }

    /// Start copying `src` into `dst` on `channel` and return at once
    pub fn mem_copy_async(
        &mut self,
        channel: Channel,
        dst: &'static mut [u8],
        src: &'static [u8],
    ) -> Result<Transfer<(&'static mut [u8], &'static [u8])>, DmaError> {
        if dst.len() != src.len() {
            return Err(DmaError::LengthMismatch);
        }
        let len = transfer_len(src.len())?;

        let config = DmaConfig::mem_to_mem(
            channel,
            src.as_ptr() as usize,
            dst.as_mut_ptr() as usize,
            len,
        );
        self.init(&config);
        compiler_fence(Ordering::Release);
        self.start(channel);
        Ok(Transfer::new(channel, (dst, src)))
    }

    /// Fill `dst` with `value` on [`BLOCKING_CHANNEL`] and wait
    pub fn mem_set(&mut self, dst: &mut [u8], value: u8) -> Result<(), DmaError> {
        self.claim_blocking_channel()?;
        let len = transfer_len(dst.len())?;
        let fill = value;

        let config = DmaConfig {
            periph_increment: false,
            ..DmaConfig::mem_to_mem(
                BLOCKING_CHANNEL,
                &fill as *const u8 as usize,
                dst.as_mut_ptr() as usize,
                len,
            )
        };
        self.run_blocking(&config)
    }

    fn run_blocking(&mut self, config: &DmaConfig) -> Result<(), DmaError> {
        self.init(config);
        compiler_fence(Ordering::Release);
        self.start(config.channel);
        let result = self.block_until_done(config.channel);
        // Buffers are only borrowed for this call
        self.regs.set_enabled(config.channel, false);
        result
    }
}
