//! Handles for transfers that outlive the call that started them

use core::sync::atomic::{compiler_fence, Ordering};

use embedded_hal::delay::DelayNs;
use simplehal::dma::{Channel, Status};
use simplehal::DmaController;

use super::engine::Dma;
use super::DmaError;

/// A running transfer holding its buffers
///
/// The buffers are returned by [`Transfer::stop`], which disables the
/// channel first. Dropping the handle leaves the channel running and the
/// `'static` buffers borrowed by the hardware.
#[must_use = "dropping a transfer leaks its buffers to the DMA channel"]
pub struct Transfer<B> {
    channel: Channel,
    buffers: B,
}

impl<B> Transfer<B> {
    pub(super) fn new(channel: Channel, buffers: B) -> Self {
        Self { channel, buffers }
    }

    /// Channel running this transfer
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Whether the channel reported transfer complete
    pub fn is_complete<C: DmaController>(&self, dma: &Dma<'_, C>) -> bool {
        dma.status(self.channel) == Status::Complete
    }

    /// Wait for the transfer to complete (`timeout_ms == 0` waits forever)
    pub fn wait<C: DmaController, D: DelayNs>(
        &self,
        dma: &Dma<'_, C>,
        timeout_ms: u32,
        delay: &mut D,
    ) -> Result<(), DmaError> {
        dma.wait_complete(self.channel, timeout_ms, delay)
    }

    /// Borrow the buffers
    ///
    /// In circular mode the hardware keeps writing while this borrow is
    /// held; the values are a snapshot at best.
    pub fn buffers(&self) -> &B {
        compiler_fence(Ordering::Acquire);
        &self.buffers
    }

    /// Stop the channel and take the buffers back
    pub fn stop<C: DmaController>(self, dma: &mut Dma<'_, C>) -> B {
        dma.stop(self.channel);
        compiler_fence(Ordering::SeqCst);
        self.buffers
    }
}
