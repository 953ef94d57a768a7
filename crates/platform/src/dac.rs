//! Digital-to-analog converter access
//!
//! Models a 12-bit DAC with a small output FIFO drained by a hardware
//! sample-time generator. A threshold interrupt fires when the FIFO falls
//! to a quarter full.

/// FIFO-fed DAC channel.
pub trait DacPeripheral {
    /// Push one code into the output FIFO (or the output latch when the
    /// sample-time generator is off).
    fn output(&mut self, code: u16);

    /// `true` when no more codes can be queued.
    fn is_fifo_full(&self) -> bool;

    /// `true` while a FIFO-threshold interrupt status is pending.
    fn threshold_pending(&self) -> bool;

    /// Acknowledge the FIFO-threshold status.
    fn clear_threshold(&mut self);

    /// Unmask or mask the FIFO-threshold interrupt.
    fn set_threshold_interrupt(&mut self, enabled: bool);

    /// Whether the FIFO-threshold interrupt is unmasked.
    fn threshold_interrupt_enabled(&self) -> bool;

    /// Start or stop the autonomous sample-time generator.
    fn set_sample_timer(&mut self, enabled: bool);

    /// Whether the sample-time generator is running.
    fn sample_timer_enabled(&self) -> bool;
}
