//! Peripheral transfers: ADC, USART1, SPI1 and the analogRead helpers

use core::sync::atomic::{compiler_fence, Ordering};

use embedded_hal::delay::DelayNs;
use simplehal::adc::SampleTime;
use simplehal::dma::{
    request_channel, Channel, DataSize, Direction, DmaConfig, Mode, Peripheral, Priority, Request,
    Status,
};
use simplehal::gpio::Pin;
use simplehal::{AdcController, DmaController};

use super::engine::Dma;
use super::transfer::Transfer;
use super::{transfer_len, DmaError};

/// Channel used by the analogRead helpers (hard-wired ADC1 request)
pub const ANALOG_READ_CHANNEL: Channel = Channel::Ch1;

/// Per-direction budget for a blocking SPI transfer
pub const SPI_TIMEOUT_MS: u32 = 1000;

/// Budget for the previous USART1 transmission to drain
pub const USART_TX_TIMEOUT_MS: u32 = 1000;

impl<'s, C: DmaController> Dma<'s, C> {
    fn check_routing(&self, channel: Channel, peripheral: Peripheral, request: Request) {
        let wired = request_channel(peripheral, request);
        if wired != channel {
            warn!(
                "DMA channel {} is not wired to this request, expected channel {}",
                channel.number(),
                wired.number()
            );
        }
    }

    fn peripheral_config(
        &self,
        channel: Channel,
        peripheral: Peripheral,
        direction: Direction,
        priority: Priority,
        data_size: DataSize,
        mode: Mode,
    ) -> DmaConfig {
        DmaConfig {
            channel,
            direction,
            priority,
            data_size,
            mode,
            mem_increment: true,
            periph_increment: false,
            periph_addr: self.regs.peripheral_address(peripheral),
            mem_addr: 0,
            buffer_size: 0,
        }
    }

    /// Stream ADC1 conversion results into `buffer`
    ///
    /// Half-word transfers from the ADC data register, high priority. The
    /// ADC DMA request is enabled and the channel started; the converter
    /// itself is left to the caller.
    pub fn adc_init(
        &mut self,
        channel: Channel,
        buffer: &'static mut [u16],
        mode: Mode,
    ) -> Result<Transfer<&'static mut [u16]>, DmaError> {
        let len = transfer_len(buffer.len())?;
        self.check_routing(channel, Peripheral::Adc1, Request::Rx);

        let config = DmaConfig {
            mem_addr: buffer.as_mut_ptr() as usize,
            buffer_size: len,
            ..self.peripheral_config(
                channel,
                Peripheral::Adc1,
                Direction::PeripheralToMemory,
                Priority::High,
                DataSize::HalfWord,
                mode,
            )
        };
        self.init(&config);
        self.regs.set_peripheral_request(Peripheral::Adc1, Request::Rx, true);

        compiler_fence(Ordering::Release);
        self.start(channel);
        Ok(Transfer::new(channel, buffer))
    }

    /// Circular ADC stream for a scan of `channels` inputs
    ///
    /// Uses the first `channels * samples_per_channel` entries of `buffer`.
    pub fn adc_init_multi(
        &mut self,
        channel: Channel,
        buffer: &'static mut [u16],
        channels: u8,
        samples_per_channel: u16,
    ) -> Result<Transfer<&'static mut [u16]>, DmaError> {
        let total = channels as usize * samples_per_channel as usize;
        if total > buffer.len() {
            return Err(DmaError::LengthMismatch);
        }
        let buffer: &'static mut [u16] = &mut buffer[..total];
        self.adc_init(channel, buffer, Mode::Circular)
    }

    /// Prepare `channel` for USART1 transmission
    ///
    /// Byte transfers into the USART data register, medium priority.
    /// Buffers are supplied per call to [`Dma::usart_transmit`].
    pub fn usart_init_tx(&mut self, channel: Channel) {
        self.check_routing(channel, Peripheral::Usart1, Request::Tx);

        let config = self.peripheral_config(
            channel,
            Peripheral::Usart1,
            Direction::MemoryToPeripheral,
            Priority::Medium,
            DataSize::Byte,
            Mode::Normal,
        );
        self.init(&config);
        self.regs.set_peripheral_request(Peripheral::Usart1, Request::Tx, true);
    }

    /// Receive USART1 bytes into `buffer`
    pub fn usart_init_rx(
        &mut self,
        channel: Channel,
        buffer: &'static mut [u8],
        mode: Mode,
    ) -> Result<Transfer<&'static mut [u8]>, DmaError> {
        let len = transfer_len(buffer.len())?;
        self.check_routing(channel, Peripheral::Usart1, Request::Rx);

        let config = DmaConfig {
            mem_addr: buffer.as_mut_ptr() as usize,
            buffer_size: len,
            ..self.peripheral_config(
                channel,
                Peripheral::Usart1,
                Direction::PeripheralToMemory,
                Priority::Medium,
                DataSize::Byte,
                mode,
            )
        };
        self.init(&config);
        self.regs.set_peripheral_request(Peripheral::Usart1, Request::Rx, true);

        compiler_fence(Ordering::Release);
        self.start(channel);
        Ok(Transfer::new(channel, buffer))
    }

    /// Send `data` on a channel prepared by [`Dma::usart_init_tx`]
    ///
    /// Waits up to [`USART_TX_TIMEOUT_MS`] for the previous transmission,
    /// then reprograms the channel and starts it.
    pub fn usart_transmit<D: DelayNs>(
        &mut self,
        channel: Channel,
        data: &'static [u8],
        delay: &mut D,
    ) -> Result<(), DmaError> {
        let len = transfer_len(data.len())?;

        let mut waited_ms = 0;
        while self.status(channel) == Status::Busy {
            if waited_ms >= USART_TX_TIMEOUT_MS {
                warn!("USART1 DMA channel {} still busy", channel.number());
                return Err(DmaError::Timeout);
            }
            delay.delay_ms(1);
            waited_ms += 1;
        }

        self.regs.set_enabled(channel, false);
        self.regs.set_transfer(channel, data.as_ptr() as usize, len);
        compiler_fence(Ordering::Release);
        self.start(channel);
        Ok(())
    }

    /// Bytes received so far into a buffer of `buffer_size` bytes
    pub fn usart_received_count(&self, channel: Channel, buffer_size: u16) -> u16 {
        buffer_size.saturating_sub(self.remaining(channel))
    }

    /// Prepare a TX and an RX channel for SPI1
    pub fn spi_init(&mut self, tx_channel: Channel, rx_channel: Channel) {
        self.check_routing(tx_channel, Peripheral::Spi1, Request::Tx);
        self.check_routing(rx_channel, Peripheral::Spi1, Request::Rx);

        let tx = self.peripheral_config(
            tx_channel,
            Peripheral::Spi1,
            Direction::MemoryToPeripheral,
            Priority::High,
            DataSize::Byte,
            Mode::Normal,
        );
        self.init(&tx);

        let rx = self.peripheral_config(
            rx_channel,
            Peripheral::Spi1,
            Direction::PeripheralToMemory,
            Priority::High,
            DataSize::Byte,
            Mode::Normal,
        );
        self.init(&rx);

        self.regs.set_peripheral_request(Peripheral::Spi1, Request::Tx, true);
        self.regs.set_peripheral_request(Peripheral::Spi1, Request::Rx, true);
    }

    /// Full-duplex SPI1 transfer, blocking
    ///
    /// RX is started before TX so no received byte is missed.
    pub fn spi_transfer<D: DelayNs>(
        &mut self,
        tx_channel: Channel,
        rx_channel: Channel,
        tx_data: &[u8],
        rx_data: &mut [u8],
        delay: &mut D,
    ) -> Result<(), DmaError> {
        if tx_data.len() != rx_data.len() {
            return Err(DmaError::LengthMismatch);
        }
        let len = transfer_len(tx_data.len())?;

        self.regs.set_enabled(rx_channel, false);
        self.regs.set_transfer(rx_channel, rx_data.as_mut_ptr() as usize, len);
        self.regs.set_enabled(tx_channel, false);
        self.regs.set_transfer(tx_channel, tx_data.as_ptr() as usize, len);

        compiler_fence(Ordering::Release);
        self.start(rx_channel);
        self.start(tx_channel);

        let result = self
            .wait_complete(tx_channel, SPI_TIMEOUT_MS, delay)
            .and_then(|()| self.wait_complete(rx_channel, SPI_TIMEOUT_MS, delay));

        // Buffers are only borrowed for this call
        self.regs.set_enabled(tx_channel, false);
        self.regs.set_enabled(rx_channel, false);
        result
    }

    /// Sample `pin` continuously into `buffer` through DMA
    ///
    /// Configures ADC1 for single-channel continuous conversion with the
    /// longest sample time, calibrates it, arms [`ANALOG_READ_CHANNEL`]
    /// (circular when `continuous`) and starts converting.
    pub fn analog_read_start<A: AdcController>(
        &mut self,
        adc: &mut A,
        pin: Pin,
        buffer: &'static mut [u16],
        continuous: bool,
    ) -> Result<Transfer<&'static mut [u16]>, DmaError> {
        let Some(input) = pin.adc_channel() else {
            warn!("pin has no ADC input");
            return Err(DmaError::NotAnalogPin);
        };
        transfer_len(buffer.len())?;

        adc.configure_continuous(input, SampleTime::Cycles241);
        adc.calibrate();

        let transfer =
            self.adc_init(ANALOG_READ_CHANNEL, buffer, Mode::from_circular(continuous))?;
        adc.start();
        self.analog_active = true;

        info!("analogRead DMA started on ADC channel {}", input.number());
        Ok(transfer)
    }

    /// Stop the converter and the channel, returning the buffer
    pub fn analog_read_stop<A: AdcController>(
        &mut self,
        adc: &mut A,
        transfer: Transfer<&'static mut [u16]>,
    ) -> &'static mut [u16] {
        if self.analog_active {
            adc.stop();
            self.analog_active = false;
        }
        transfer.stop(self)
    }

    /// Whether an analogRead stream is running
    pub fn analog_read_busy(&self) -> bool {
        self.analog_active
    }
}

/// Mean of the samples in an analogRead buffer (0 when empty)
pub fn analog_read_average(buffer: &[u16]) -> u16 {
    crate::adc::average(buffer)
}
