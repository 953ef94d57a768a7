//! State shared between interrupt handlers and the main loop
//!
//! Every field here has exactly one producer and one consumer. Interrupt
//! handlers only set or update; the main loop reads and, for event flags,
//! clears. The Cortex-M0+ has no atomic read-modify-write, so anything that
//! needs test-and-clear goes through a critical section.
//!
//! # Usage Pattern
//!
//! ```rust,ignore
//! static SHARED: Shared = Shared::new();
//!
//! #[exception]
//! fn SysTick() {
//!     SHARED.time.on_tick();
//! }
//!
//! #[interrupt]
//! fn ADC0() {
//!     if adc_mem0_loaded() {
//!         SHARED.conversion.signal();
//!     }
//! }
//! ```

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::encoder::EncoderCell;
use crate::time_base::TimeBase;

/// One-shot event raised by an interrupt and consumed by the main loop.
pub struct EventFlag {
    raised: Mutex<CriticalSectionRawMutex, Cell<bool>>,
}

impl EventFlag {
    /// Create a lowered flag.
    pub const fn new() -> Self {
        Self {
            raised: Mutex::new(Cell::new(false)),
        }
    }

    /// Raise the flag (producer side).
    pub fn signal(&self) {
        self.raised.lock(|raised| raised.set(true));
    }

    /// Peek without consuming.
    pub fn is_set(&self) -> bool {
        self.raised.lock(Cell::get)
    }

    /// Lower the flag without reading it.
    pub fn clear(&self) {
        self.raised.lock(|raised| raised.set(false));
    }

    /// Return whether the flag was raised and lower it, atomically.
    pub fn take(&self) -> bool {
        self.raised.lock(|raised| raised.replace(false))
    }
}

impl Default for EventFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the interrupt handlers write.
///
/// Intended to live in a `static` and be passed by reference to both the
/// handlers and the drivers that consume it.
pub struct Shared {
    /// Millisecond counter and delay countdown (SysTick).
    pub time: TimeBase,
    /// Encoder position and derived output (GPIO edge on phase A).
    pub encoder: EncoderCell,
    /// ADC MEM0 result loaded (ADC0 interrupt).
    pub conversion: EventFlag,
    /// User key pressed (GPIO group interrupt).
    pub key: EventFlag,
}

impl Shared {
    /// Boot state: clock at zero, encoder at its default position.
    pub const fn new() -> Self {
        Self {
            time: TimeBase::new(),
            encoder: EncoderCell::new(),
            conversion: EventFlag::new(),
            key: EventFlag::new(),
        }
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}
