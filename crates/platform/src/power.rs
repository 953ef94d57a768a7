//! Low-power wait abstraction
//!
//! The main loop never spins on a flag that an interrupt will set; it parks
//! the core instead. Callers must re-check their condition after every
//! return since wake-ups may be spurious.

/// Core sleep primitives.
pub trait WaitForInterrupt {
    /// Sleep until any interrupt is taken (`wfi`).
    fn wait_for_interrupt(&mut self);

    /// Sleep until an event or interrupt is signalled (`wfe`).
    fn wait_for_event(&mut self);
}

impl<T: WaitForInterrupt + ?Sized> WaitForInterrupt for &mut T {
    fn wait_for_interrupt(&mut self) {
        (**self).wait_for_interrupt();
    }

    fn wait_for_event(&mut self) {
        (**self).wait_for_event();
    }
}

/// Cortex-M implementation using the `wfi`/`wfe` instructions.
#[cfg(feature = "hardware")]
#[derive(Debug, Default, Clone, Copy)]
pub struct CortexM;

#[cfg(feature = "hardware")]
impl WaitForInterrupt for CortexM {
    fn wait_for_interrupt(&mut self) {
        cortex_m::asm::wfi();
    }

    fn wait_for_event(&mut self) {
        cortex_m::asm::wfe();
    }
}
