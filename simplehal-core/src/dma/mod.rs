//! DMA engine
//!
//! [`Dma`] wraps a [`DmaController`] and keeps a software status per
//! channel in a [`DmaState`] table shared with the DMA interrupt. The
//! interrupt side is [`handle_interrupt`], called from the chip crate's
//! channel interrupt handlers.
//!
//! Transfers that outlive the call that started them hand their buffers
//! to a [`Transfer`], which gives them back once the channel is stopped.

mod engine;
mod peripheral;
mod state;
mod transfer;

pub use engine::{Dma, BLOCKING_CHANNEL};
pub use peripheral::{analog_read_average, ANALOG_READ_CHANNEL, SPI_TIMEOUT_MS};
pub use state::DmaState;
pub use transfer::Transfer;

pub use simplehal::dma::{
    Channel, ChannelFlags, DataSize, Direction, DmaConfig, Mode, Peripheral, Priority, Request,
    Status,
};

use simplehal::dma::MAX_TRANSFER;
use simplehal::DmaController;

/// Transfer complete / error callback, invoked from interrupt context
pub type Callback = fn(Channel);

/// DMA errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Zero length or longer than the 16-bit transfer counter
    InvalidLength,
    /// Source and destination lengths differ
    LengthMismatch,
    /// Channel is idle, nothing to wait for
    NotStarted,
    /// Hardware reported a transfer error
    Transfer,
    /// Transfer did not complete in time
    Timeout,
    /// Pin has no ADC input
    NotAnalogPin,
    /// Channel is carrying a running analogRead stream
    ChannelInUse,
}

/// Service a channel interrupt
///
/// Clears the pending transfer complete / transfer error flag, records the
/// new status and invokes the registered callback. Callbacks run after the
/// state table is released, so they may call back into the engine.
pub fn handle_interrupt<C>(regs: &mut C, state: &DmaState, channel: Channel)
where
    C: DmaController + ?Sized,
{
    let flags = regs.flags(channel);

    if flags.complete {
        regs.clear_flags(
            channel,
            ChannelFlags {
                complete: true,
                ..ChannelFlags::NONE
            },
        );
        if let Some(callback) = state.finish(channel, Status::Complete) {
            callback(channel);
        }
    }

    if flags.error {
        regs.clear_flags(
            channel,
            ChannelFlags {
                error: true,
                ..ChannelFlags::NONE
            },
        );
        warn!("DMA channel {} transfer error", channel.number());
        if let Some(callback) = state.finish(channel, Status::Error) {
            callback(channel);
        }
    }
}

/// Validate a buffer length against the 16-bit transfer counter
pub(crate) fn transfer_len(len: usize) -> Result<u16, DmaError> {
    if len == 0 || len > MAX_TRANSFER {
        return Err(DmaError::InvalidLength);
    }
    Ok(len as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDma;
    use core::sync::atomic::{AtomicU8, Ordering};

    #[test]
    fn test_transfer_len() {
        assert_eq!(transfer_len(0), Err(DmaError::InvalidLength));
        assert_eq!(transfer_len(1), Ok(1));
        assert_eq!(transfer_len(MAX_TRANSFER), Ok(u16::MAX));
        assert_eq!(transfer_len(MAX_TRANSFER + 1), Err(DmaError::InvalidLength));
    }

    #[test]
    fn test_interrupt_complete_runs_callback() {
        static STATE: DmaState = DmaState::new();
        static LAST: AtomicU8 = AtomicU8::new(0);

        fn on_done(channel: Channel) {
            LAST.store(channel.number(), Ordering::SeqCst);
        }

        let mut regs = MockDma::new();
        STATE.set_complete_callback(Channel::Ch4, Some(on_done));
        STATE.set_status(Channel::Ch4, Status::Busy);
        regs.raise(
            Channel::Ch4,
            ChannelFlags {
                complete: true,
                ..ChannelFlags::NONE
            },
        );

        handle_interrupt(&mut regs, &STATE, Channel::Ch4);

        assert_eq!(STATE.status(Channel::Ch4), Status::Complete);
        assert_eq!(LAST.load(Ordering::SeqCst), 4);
        assert!(!regs.flags(Channel::Ch4).complete);
    }

    #[test]
    fn test_interrupt_error_wins() {
        static STATE: DmaState = DmaState::new();
        static ERRORS: AtomicU8 = AtomicU8::new(0);

        fn on_error(_: Channel) {
            ERRORS.fetch_add(1, Ordering::SeqCst);
        }

        let mut regs = MockDma::new();
        STATE.set_error_callback(Channel::Ch2, Some(on_error));
        regs.raise(Channel::Ch2, ChannelFlags::COMPLETE_AND_ERROR);

        handle_interrupt(&mut regs, &STATE, Channel::Ch2);

        assert_eq!(STATE.status(Channel::Ch2), Status::Error);
        assert_eq!(ERRORS.load(Ordering::SeqCst), 1);
        assert!(!regs.flags(Channel::Ch2).any());
    }

    #[test]
    fn test_interrupt_without_flags_is_noop() {
        let state = DmaState::new();
        let mut regs = MockDma::new();
        state.set_status(Channel::Ch1, Status::Busy);

        handle_interrupt(&mut regs, &state, Channel::Ch1);

        assert_eq!(state.status(Channel::Ch1), Status::Busy);
    }
}
