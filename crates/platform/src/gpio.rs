//! GPIO interrupt abstraction
//!
//! Pin levels are read through [`embedded_hal::digital::InputPin`]; this
//! module adds the edge-interrupt controls that embedded-hal leaves out.

/// External interrupt configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptMode {
    /// Trigger on rising edge
    RisingEdge,
    /// Trigger on falling edge
    FallingEdge,
    /// Trigger on both edges
    BothEdges,
}

/// A GPIO line that can raise an edge interrupt.
pub trait EdgeInterrupt {
    /// Enable interrupt
    fn enable_interrupt(&mut self, mode: InterruptMode);

    /// Disable interrupt
    fn disable_interrupt(&mut self);

    /// Clear interrupt flag
    fn clear_interrupt(&mut self);
}
