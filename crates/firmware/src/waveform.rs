//! DAC waveform streaming
//!
//! A precomputed sine table is fed into the DAC output FIFO from the FIFO
//! threshold interrupt while the sample-time generator clocks codes out.
//!
//! ```text
//! begin ──► mid-scale check ──► (settle 10 ms) ──► arm: prime FIFO,
//!                                                  enable IRQ + generator
//!                                                    │
//!                     threshold IRQ ◄────────────────┘
//!                     └─ refill until full, wrap cursor mod N
//! ```
//!
//! The streamer owns the DAC exclusively while running; the static-level
//! path ([`WaveformStreamer::set_level`]) is refused until it stops.
//!
//! # Sharing with the threshold interrupt
//!
//! The interrupt and the main loop both drive the streamer, so a board keeps
//! it in a critical-section mutex. The 10 ms settle needs SysTick and must
//! run with interrupts enabled, so the start sequence is split around it:
//!
//! ```rust,ignore
//! static STREAMER: Mutex<CriticalSectionRawMutex, RefCell<Option<Streamer>>> = ...;
//!
//! let begun = STREAMER.lock(|s| s.borrow_mut().as_mut().is_some_and(|s| s.begin()));
//! if begun {
//!     clock.delay_ms(WAVE_START_SETTLE_MS); // outside the lock
//!     STREAMER.lock(|s| s.borrow_mut().as_mut().map(|s| s.arm()));
//! }
//! ```
//!
//! [`WaveformStreamer::start`] performs the same sequence for callers that
//! own the streamer outright.

use platform::config::DAC_CODE_MAX;
use platform::{Clock, DacPeripheral};

use crate::config::{
    WAVE_DRAIN_SPINS, WAVE_MIDSCALE, WAVE_PRIME_COUNT, WAVE_START_SETTLE_MS, WAVE_TABLE_LEN,
};

/// One period of a full-scale sine, offset to the unipolar DAC range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveTable<const N: usize> {
    samples: [u16; N],
}

impl<const N: usize> WaveTable<N> {
    /// `floor(((sin(2πi/N) + 1) / 2) * 4095)` for each index.
    pub fn sine() -> Self {
        let mut samples = [0u16; N];
        #[allow(clippy::cast_precision_loss)] // N is a small table length
        let n = N as f32;
        for (i, slot) in samples.iter_mut().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let phase = 2.0 * core::f32::consts::PI * i as f32 / n;
            let unit = (libm::sinf(phase) + 1.0) / 2.0;
            *slot = (unit * f32::from(DAC_CODE_MAX)) as u16;
        }
        Self { samples }
    }

    /// Entry at `index` modulo N; 0 for an empty table.
    pub fn at(&self, index: usize) -> u16 {
        index
            .checked_rem(N)
            .and_then(|i| self.samples.get(i))
            .copied()
            .unwrap_or(0)
    }

    /// Table length.
    pub const fn len(&self) -> usize {
        N
    }

    /// Whether the table has no entries.
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Raw entries.
    pub fn as_slice(&self) -> &[u16] {
        &self.samples
    }
}

/// Snapshot returned by [`WaveformStreamer::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamStatus {
    /// Streaming is active
    pub running: bool,
    /// Output FIFO currently full
    pub fifo_full: bool,
    /// Sample-time generator enabled
    pub timer_enabled: bool,
    /// Threshold interrupts taken since boot
    pub interrupt_count: u32,
}

/// Table-driven DAC streamer.
pub struct WaveformStreamer<D> {
    dac: D,
    table: WaveTable<WAVE_TABLE_LEN>,
    cursor: usize,
    running: bool,
    interrupts: u32,
}

impl<D: DacPeripheral> WaveformStreamer<D> {
    /// Build the sine table and take the DAC. Nothing is output yet.
    pub fn new(dac: D) -> Self {
        Self {
            dac,
            table: WaveTable::sine(),
            cursor: 0,
            running: false,
            interrupts: 0,
        }
    }

    /// Start streaming from the top of the table.
    ///
    /// Writes mid-scale once and holds it for 10 ms so a scope shows the
    /// output stage is alive before the sine starts. No-op while running.
    ///
    /// Must not be called with interrupts masked: the hold waits on the
    /// tick. A streamer shared with its interrupt uses [`begin`](Self::begin)
    /// and [`arm`](Self::arm) instead.
    pub fn start<C: Clock + ?Sized>(&mut self, clock: &C) {
        if self.begin() {
            clock.delay_ms(WAVE_START_SETTLE_MS);
            self.arm();
        }
    }

    /// First half of a start: write the mid-scale check level.
    ///
    /// Returns `false` (and does nothing) while running. The caller holds
    /// [`WAVE_START_SETTLE_MS`] before [`arm`](Self::arm).
    pub fn begin(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.dac.output(WAVE_MIDSCALE);
        true
    }

    /// Second half of a start: prime the FIFO from the top of the table and
    /// enable the threshold interrupt and the generator. Never waits.
    ///
    /// No-op while running.
    pub fn arm(&mut self) {
        if self.running {
            return;
        }
        self.cursor = 0;
        self.running = true;
        self.dac.clear_threshold();
        for _ in 0..WAVE_PRIME_COUNT {
            if self.dac.is_fifo_full() {
                break;
            }
            self.push_next();
        }
        self.dac.set_threshold_interrupt(true);
        self.dac.set_sample_timer(true);
        #[cfg(feature = "defmt")]
        defmt::info!("wave: streaming {} samples/period", WAVE_TABLE_LEN);
    }

    /// FIFO threshold interrupt body.
    ///
    /// Entries with no threshold status pending (spurious or shared-vector
    /// wakes) are ignored.
    pub fn on_fifo_threshold(&mut self) {
        if !self.dac.threshold_pending() {
            return;
        }
        self.interrupts = self.interrupts.wrapping_add(1);
        if self.running {
            self.fill();
        }
        self.dac.clear_threshold();
    }

    /// Refill from the main loop, for when the interrupt is unavailable.
    pub fn manual_refill(&mut self) {
        if self.running {
            self.fill();
        }
    }

    /// Stop the generator and park the output at 0. No-op when stopped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.dac.set_sample_timer(false);
        self.dac.set_threshold_interrupt(false);
        for _ in 0..WAVE_DRAIN_SPINS {
            core::hint::spin_loop();
        }
        self.dac.output(0);
        self.running = false;
        #[cfg(feature = "defmt")]
        defmt::info!("wave: stopped after {} refills", self.interrupts);
    }

    /// Drive a static code. Refused (returns `false`) while streaming.
    pub fn set_level(&mut self, code: u16) -> bool {
        if self.running {
            return false;
        }
        self.dac.output(code.min(DAC_CODE_MAX));
        true
    }

    /// Running state, FIFO, generator and interrupt counters.
    pub fn status(&self) -> StreamStatus {
        StreamStatus {
            running: self.running,
            fifo_full: self.dac.is_fifo_full(),
            timer_enabled: self.dac.sample_timer_enabled(),
            interrupt_count: self.interrupts,
        }
    }

    /// Whether streaming is active.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Next table index to be pushed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The table being streamed.
    pub fn table(&self) -> &WaveTable<WAVE_TABLE_LEN> {
        &self.table
    }

    /// Direct DAC access (for the static-output path when idle).
    pub fn dac_mut(&mut self) -> &mut D {
        &mut self.dac
    }

    fn fill(&mut self) {
        while !self.dac.is_fifo_full() {
            self.push_next();
        }
    }

    fn push_next(&mut self) {
        self.dac.output(self.table.at(self.cursor));
        self.cursor = self.cursor.wrapping_add(1).checked_rem(WAVE_TABLE_LEN).unwrap_or(0);
    }
}
