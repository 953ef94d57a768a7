//! Millisecond time source and bounded waits
//!
//! Every timed wait in the firmware is expressed against a [`Clock`], so the
//! timeouts can be driven deterministically from a fake clock on the host.
//! There is no cancellation: a wait runs until its condition holds or its
//! budget is spent.

/// Monotonic millisecond time source.
pub trait Clock {
    /// Milliseconds since boot. Wraps at `u32::MAX`.
    fn now_ms(&self) -> u32;

    /// Block the calling context for `ms` milliseconds.
    ///
    /// Not valid from interrupt context. `delay_ms(0)` returns immediately.
    fn delay_ms(&self, ms: u32);
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }

    fn delay_ms(&self, ms: u32) {
        (**self).delay_ms(ms);
    }
}

/// A wait budget anchored at the moment it was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deadline {
    start: u32,
    budget_ms: u32,
}

impl Deadline {
    /// Start a budget of `budget_ms` at the clock's current time.
    pub fn after<C: Clock + ?Sized>(clock: &C, budget_ms: u32) -> Self {
        Self {
            start: clock.now_ms(),
            budget_ms,
        }
    }

    /// Milliseconds since the deadline was started (wrap-safe).
    pub fn elapsed<C: Clock + ?Sized>(&self, clock: &C) -> u32 {
        clock.now_ms().wrapping_sub(self.start)
    }

    /// `true` once strictly more than the budget has elapsed.
    pub fn expired<C: Clock + ?Sized>(&self, clock: &C) -> bool {
        self.elapsed(clock) > self.budget_ms
    }

    /// Busy-wait until `ready` returns `true` or the budget is spent.
    ///
    /// `ready` is always evaluated at least once, and once more after the
    /// clock is read, so a condition that becomes true on the last poll wins.
    pub fn wait<C: Clock + ?Sized>(&self, clock: &C, mut ready: impl FnMut() -> bool) -> bool {
        loop {
            if ready() {
                return true;
            }
            if self.expired(clock) {
                return ready();
            }
        }
    }
}

/// Wait up to `budget_ms` for `ready` to return `true`.
pub fn wait_until<C: Clock + ?Sized>(clock: &C, budget_ms: u32, ready: impl FnMut() -> bool) -> bool {
    Deadline::after(clock, budget_ms).wait(clock, ready)
}

/// Poll `ready` at most `iterations` times without consulting a clock.
///
/// Used on paths that must not depend on the tick interrupt (for example a
/// conversion poll with interrupts masked).
pub fn poll_bounded(iterations: u32, mut ready: impl FnMut() -> bool) -> bool {
    (0..iterations).any(|_| ready())
}
