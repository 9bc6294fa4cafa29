//! Per-channel status and callback table

use core::cell::RefCell;

use critical_section::Mutex;
use simplehal::dma::{Channel, Status, CHANNEL_COUNT};

use super::Callback;

#[derive(Clone, Copy)]
struct Slot {
    status: Status,
    on_complete: Option<Callback>,
    on_error: Option<Callback>,
}

impl Slot {
    const IDLE: Self = Self {
        status: Status::Idle,
        on_complete: None,
        on_error: None,
    };
}

/// Channel table shared between thread mode and the DMA interrupts
///
/// Every access runs inside a critical section. Place one instance in a
/// `static` and hand a reference to both the engine and the interrupt
/// handlers.
pub struct DmaState {
    slots: Mutex<RefCell<[Slot; CHANNEL_COUNT]>>,
}

impl Default for DmaState {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaState {
    /// Create a table with every channel idle and no callbacks
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new([Slot::IDLE; CHANNEL_COUNT])),
        }
    }

    fn with<R>(&self, channel: Channel, f: impl FnOnce(&mut Slot) -> R) -> R {
        critical_section::with(|cs| {
            let mut slots = self.slots.borrow_ref_mut(cs);
            f(&mut slots[channel.index()])
        })
    }

    /// Recorded status of a channel
    pub fn status(&self, channel: Channel) -> Status {
        self.with(channel, |slot| slot.status)
    }

    /// Record a new status
    pub fn set_status(&self, channel: Channel, status: Status) {
        self.with(channel, |slot| slot.status = status);
    }

    /// Register (or clear) the transfer complete callback
    pub fn set_complete_callback(&self, channel: Channel, callback: Option<Callback>) {
        self.with(channel, |slot| slot.on_complete = callback);
    }

    /// Register (or clear) the transfer error callback
    pub fn set_error_callback(&self, channel: Channel, callback: Option<Callback>) {
        self.with(channel, |slot| slot.on_error = callback);
    }

    /// Whether a transfer complete callback is registered
    pub fn has_complete_callback(&self, channel: Channel) -> bool {
        self.with(channel, |slot| slot.on_complete.is_some())
    }

    /// Whether a transfer error callback is registered
    pub fn has_error_callback(&self, channel: Channel) -> bool {
        self.with(channel, |slot| slot.on_error.is_some())
    }

    /// Record a terminal status and fetch the matching callback
    pub(crate) fn finish(&self, channel: Channel, status: Status) -> Option<Callback> {
        self.with(channel, |slot| {
            slot.status = status;
            match status {
                Status::Complete => slot.on_complete,
                Status::Error => slot.on_error,
                _ => None,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: Channel) {}

    #[test]
    fn test_channels_start_idle() {
        let state = DmaState::new();
        for channel in Channel::ALL {
            assert_eq!(state.status(channel), Status::Idle);
        }
    }

    #[test]
    fn test_channels_are_independent() {
        let state = DmaState::new();
        state.set_status(Channel::Ch3, Status::Busy);
        assert_eq!(state.status(Channel::Ch3), Status::Busy);
        assert_eq!(state.status(Channel::Ch2), Status::Idle);
        assert_eq!(state.status(Channel::Ch4), Status::Idle);
    }

    #[test]
    fn test_finish_returns_matching_callback() {
        let state = DmaState::new();
        state.set_complete_callback(Channel::Ch7, Some(noop));

        assert!(state.finish(Channel::Ch7, Status::Complete).is_some());
        assert!(state.finish(Channel::Ch7, Status::Error).is_none());
        assert_eq!(state.status(Channel::Ch7), Status::Error);

        state.set_complete_callback(Channel::Ch7, None);
        assert!(state.finish(Channel::Ch7, Status::Complete).is_none());
    }
}
