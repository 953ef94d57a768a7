//! Peripheral abstraction layer
//!
//! Register-level I2C controller access and the serial telemetry sink.
//! The I2C controller is polled: the sensor protocol drives its FIFOs and
//! bus status directly and applies its own timeouts.

/// Transfer direction for [`I2cController::start_transfer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferDirection {
    /// Controller transmits from the TX FIFO
    Write,
    /// Controller receives into the RX FIFO
    Read,
}

/// Polled I2C controller with hardware TX/RX FIFOs.
pub trait I2cController {
    /// Discard any bytes waiting in the transmit FIFO.
    fn flush_tx(&mut self);

    /// Discard any bytes waiting in the receive FIFO.
    fn flush_rx(&mut self);

    /// Queue bytes for transmission. Returns how many were accepted.
    fn fill_tx(&mut self, bytes: &[u8]) -> usize;

    /// Start a transfer of `len` bytes to or from the 7-bit `address`.
    fn start_transfer(&mut self, address: u8, direction: TransferDirection, len: u16);

    /// `true` while the controller is driving a transfer.
    fn is_bus_busy(&self) -> bool;

    /// Pop one received byte, if any has arrived.
    fn receive(&mut self) -> Option<u8>;
}

/// Line-oriented serial output (telemetry).
///
/// The core hands over complete lines including their terminator; the
/// transport and its buffering live behind this trait.
pub trait SerialSink {
    /// Queue a string for transmission.
    fn send_str(&mut self, line: &str);
}

impl<T: SerialSink + ?Sized> SerialSink for &mut T {
    fn send_str(&mut self, line: &str) {
        (**self).send_str(line);
    }
}
