//! Cooperative main-loop scheduler
//!
//! Tasks are plain functions run from the main loop when their interval has
//! elapsed. There is no preemption: a slow task delays every task after it
//! in the same pass, and intervals are minimums, not guarantees.
//!
//! ```rust,ignore
//! let mut sched = Scheduler::new([ENCODER_TASK_MS, ADC_TASK_MS]);
//! loop {
//!     sched.run_pass(&clock, |task| match task {
//!         0 => encoder_task(),
//!         _ => adc_task(),
//!     });
//! }
//! ```

use platform::Clock;

/// One periodic task's timing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeriodicTask {
    interval_ms: u32,
    last_run_ms: u32,
}

impl PeriodicTask {
    /// Task first due `interval_ms` after time zero.
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_run_ms: 0,
        }
    }

    /// Whether `interval_ms` has elapsed since the last run (wrap-safe).
    pub fn is_due(&self, now_ms: u32) -> bool {
        now_ms.wrapping_sub(self.last_run_ms) >= self.interval_ms
    }

    /// If due, record `now_ms` as the last run and return `true`.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        if !self.is_due(now_ms) {
            return false;
        }
        self.last_run_ms = now_ms;
        true
    }

    /// Count the next interval from `now_ms` without running.
    pub fn restart(&mut self, now_ms: u32) {
        self.last_run_ms = now_ms;
    }

    /// Configured interval.
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Timestamp of the last run.
    pub fn last_run_ms(&self) -> u32 {
        self.last_run_ms
    }
}

/// Fixed set of periodic tasks, run in index order.
#[derive(Debug, Clone)]
pub struct Scheduler<const N: usize> {
    tasks: [PeriodicTask; N],
}

impl<const N: usize> Scheduler<N> {
    /// One task per interval.
    pub fn new(intervals_ms: [u32; N]) -> Self {
        Self {
            tasks: intervals_ms.map(PeriodicTask::new),
        }
    }

    /// Read the clock once and run every due task.
    ///
    /// Returns the time used for the pass.
    pub fn run_pass<C: Clock + ?Sized>(&mut self, clock: &C, mut run: impl FnMut(usize)) -> u32 {
        let now = clock.now_ms();
        for (index, task) in self.tasks.iter_mut().enumerate() {
            if task.poll(now) {
                run(index);
            }
        }
        now
    }

    /// Timing state of task `index`.
    pub fn task(&self, index: usize) -> Option<&PeriodicTask> {
        self.tasks.get(index)
    }
}

/// Round-robin step counter for work split across passes.
///
/// The display task uses it to push one field per refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rotation<const STEPS: u8> {
    step: u8,
}

impl<const STEPS: u8> Rotation<STEPS> {
    /// Start at step 0.
    pub const fn new() -> Self {
        Self { step: 0 }
    }

    /// Current step, then advance (wrapping at `STEPS`).
    pub fn advance(&mut self) -> u8 {
        let current = self.step;
        let next = current.wrapping_add(1);
        self.step = if next >= STEPS { 0 } else { next };
        current
    }
}
