//! Millisecond time base driven by SysTick
//!
//! The 1 ms tick interrupt is the only writer of the millisecond counter
//! and the only decrementer of the delay countdown. The main loop reads
//! the counter and arms the countdown. Cortex-M0+ atomics are load/store
//! only; with a single writer per word that is sufficient.

use core::sync::atomic::{AtomicU32, Ordering};

use embedded_hal::delay::DelayNs;
use platform::config::CYCLES_PER_US;
use platform::{Clock, WaitForInterrupt};

/// Monotonic millisecond counter plus blocking-delay countdown.
pub struct TimeBase {
    ticks: AtomicU32,
    countdown: AtomicU32,
}

impl TimeBase {
    /// Counter at zero, no delay pending.
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
            countdown: AtomicU32::new(0),
        }
    }

    /// SysTick handler body. Call once per millisecond.
    pub fn on_tick(&self) {
        let remaining = self.countdown.load(Ordering::Acquire);
        if remaining != 0 {
            self.countdown
                .store(remaining.wrapping_sub(1), Ordering::Release);
        }
        let now = self.ticks.load(Ordering::Relaxed);
        self.ticks.store(now.wrapping_add(1), Ordering::Release);
    }

    /// Milliseconds since boot. Wraps after ~49.7 days.
    pub fn now(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Block for `ms` milliseconds, sleeping between ticks.
    ///
    /// Must not be called from interrupt context: the countdown only moves
    /// while SysTick can preempt the caller.
    pub fn delay<W: WaitForInterrupt + ?Sized>(&self, ms: u32, wait: &mut W) {
        if ms == 0 {
            return;
        }
        self.countdown.store(ms, Ordering::Release);
        while self.countdown.load(Ordering::Acquire) != 0 {
            wait.wait_for_interrupt();
        }
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Clock`] view of a [`TimeBase`], sleeping with `W` while delaying.
///
/// `W` is copied for each delay; on hardware it is the zero-sized
/// [`platform::CortexM`].
#[derive(Clone, Copy)]
pub struct TickClock<'a, W> {
    base: &'a TimeBase,
    wait: W,
}

impl<'a, W: WaitForInterrupt + Copy> TickClock<'a, W> {
    /// Wrap `base`.
    pub const fn new(base: &'a TimeBase, wait: W) -> Self {
        Self { base, wait }
    }
}

impl<W: WaitForInterrupt + Copy> Clock for TickClock<'_, W> {
    fn now_ms(&self) -> u32 {
        self.base.now()
    }

    fn delay_ms(&self, ms: u32) {
        let mut wait = self.wait;
        self.base.delay(ms, &mut wait);
    }
}

/// Calibrated busy-wait for sub-millisecond delays.
///
/// Spins for roughly the requested number of core cycles; the loop body is
/// about four cycles on the M0+.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleDelay;

impl CycleDelay {
    const CYCLES_PER_SPIN: u32 = 4;
}

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = u64::from(ns).saturating_mul(u64::from(CYCLES_PER_US)) / 1000;
        let spins = u32::try_from(cycles / u64::from(Self::CYCLES_PER_SPIN)).unwrap_or(u32::MAX);
        for _ in 0..spins {
            core::hint::spin_loop();
        }
    }

    fn delay_us(&mut self, us: u32) {
        let spins = us.saturating_mul(CYCLES_PER_US) / Self::CYCLES_PER_SPIN;
        for _ in 0..spins {
            core::hint::spin_loop();
        }
    }
}
