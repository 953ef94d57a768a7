//! Analog-to-digital converter access
//!
//! The conversion-complete interrupt is wired by the board layer; this trait
//! only covers the register operations the sampler performs from the main
//! loop.

/// Single-shot ADC channel.
pub trait AdcPeripheral {
    /// Clear a pending result-loaded status (MEM0).
    fn clear_complete(&mut self);

    /// Arm the converter for a new conversion.
    fn enable_conversions(&mut self);

    /// Software-trigger one conversion.
    fn start_conversion(&mut self);

    /// Raw (unmasked) result-loaded status, for polled reads.
    fn is_result_loaded(&self) -> bool;

    /// Read the MEM0 result register.
    fn result(&mut self) -> u16;
}
