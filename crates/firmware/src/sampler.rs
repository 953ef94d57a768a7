//! Analog sampler
//!
//! Single-shot conversions on ADC0 channel 0, in three flavours:
//!
//! - [`Sampler::read_raw`] suspends with `wfe` until the conversion-complete
//!   interrupt raises the shared flag. Cheapest on power, needs the ADC
//!   interrupt wired.
//! - [`Sampler::read_raw_polling`] polls the raw result-loaded status for a
//!   bounded number of iterations. Works with the interrupt masked.
//! - [`Sampler::read_raw_fast`] is the polling path without the initial
//!   status clear and with a tighter budget, for back-to-back batch sampling.
//!
//! [`BatchSampler`] builds a high-rate stream on top of the fast path and
//! flushes fixed-size batches to telemetry.

use heapless::Vec;
use platform::config::{ADC_CODE_MAX, VREF_MILLIVOLTS, VREF_VOLTS};
use platform::{poll_bounded, AdcPeripheral, Clock, SerialSink, WaitForInterrupt};

use crate::config::{
    ADC_AVERAGE_GAP_MS, ADC_BATCH_CAPACITY, ADC_DEFAULT_BATCH, ADC_DEFAULT_SAMPLE_RATE_HZ,
    ADC_FAST_POLL_BUDGET, ADC_MAX_SAMPLE_RATE_HZ, ADC_POLL_BUDGET,
};
use crate::context::EventFlag;
use crate::telemetry;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Analog read failures. Never fatal; the caller decides whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError {
    /// The conversion did not complete within its polling budget.
    Timeout,
    /// An average was requested over zero samples, or every read failed.
    NoValidSamples,
}

impl core::fmt::Display for AdcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => write!(f, "ADC conversion timed out"),
            Self::NoValidSamples => write!(f, "no valid ADC samples"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AdcError {}

/// Rejected batch configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatchError {
    /// Batch size outside `1..=ADC_BATCH_CAPACITY`.
    InvalidSize(u8),
}

impl core::fmt::Display for BatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSize(n) => {
                write!(f, "batch size {n} outside 1..={ADC_BATCH_CAPACITY}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BatchError {}

// ─── Conversions ─────────────────────────────────────────────────────────────

/// Integer millivolts: `raw * 3300 / 4095`.
pub fn raw_to_millivolts(raw: u16) -> u16 {
    let mv = u32::from(raw).saturating_mul(VREF_MILLIVOLTS) / u32::from(ADC_CODE_MAX);
    u16::try_from(mv).unwrap_or(u16::MAX)
}

/// Volts: `raw * 3.3 / 4095`.
pub fn raw_to_voltage(raw: u16) -> f32 {
    f32::from(raw) * VREF_VOLTS / f32::from(ADC_CODE_MAX)
}

/// Which single-shot path [`Sampler::read_voltage_average`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadMode {
    /// Suspend until the conversion interrupt fires.
    #[default]
    Interrupt,
    /// Poll the raw status with a budget.
    Polling,
}

// ─── Sampler ─────────────────────────────────────────────────────────────────

/// Owner of the ADC in the main-loop context.
///
/// `ready` is raised by the ADC0 interrupt handler when MEM0 loads.
pub struct Sampler<'a, A, W> {
    adc: A,
    ready: &'a EventFlag,
    wait: W,
    mode: ReadMode,
}

impl<'a, A, W> Sampler<'a, A, W>
where
    A: AdcPeripheral,
    W: WaitForInterrupt,
{
    /// Take ownership of the ADC.
    pub fn new(adc: A, ready: &'a EventFlag, wait: W) -> Self {
        Self {
            adc,
            ready,
            wait,
            mode: ReadMode::default(),
        }
    }

    /// Drop any stale completion and arm the converter.
    pub fn init(&mut self) {
        self.ready.clear();
        self.adc.clear_complete();
        self.adc.enable_conversions();
        #[cfg(feature = "defmt")]
        defmt::info!("adc: ready");
    }

    /// Select the path used for averaging.
    pub fn set_read_mode(&mut self, mode: ReadMode) {
        self.mode = mode;
    }

    /// Path used for averaging.
    pub fn read_mode(&self) -> ReadMode {
        self.mode
    }

    /// Conversion-complete flag, without consuming it.
    pub fn is_ready(&self) -> bool {
        self.ready.is_set()
    }

    /// Blocking single conversion.
    ///
    /// Sleeps with `wfe` until the interrupt raises the completion flag and
    /// re-checks the flag after every wake.
    pub fn read_raw(&mut self) -> u16 {
        self.adc.clear_complete();
        self.ready.clear();
        self.adc.enable_conversions();
        self.adc.start_conversion();
        while !self.ready.is_set() {
            self.wait.wait_for_event();
        }
        let raw = self.adc.result();
        self.ready.clear();
        raw
    }

    /// Polled single conversion with a 100 000-iteration budget.
    pub fn read_raw_polling(&mut self) -> Result<u16, AdcError> {
        self.adc.clear_complete();
        self.adc.enable_conversions();
        self.adc.start_conversion();
        self.collect(ADC_POLL_BUDGET)
    }

    /// Polled conversion for batch sampling: no initial clear, tighter budget.
    pub fn read_raw_fast(&mut self) -> Result<u16, AdcError> {
        self.adc.enable_conversions();
        self.adc.start_conversion();
        self.collect(ADC_FAST_POLL_BUDGET)
    }

    fn collect(&mut self, budget: u32) -> Result<u16, AdcError> {
        let adc = &self.adc;
        if !poll_bounded(budget, || adc.is_result_loaded()) {
            #[cfg(feature = "defmt")]
            defmt::debug!("adc: no result after {} polls", budget);
            return Err(AdcError::Timeout);
        }
        self.adc.clear_complete();
        Ok(self.adc.result())
    }

    /// Blocking conversion scaled to volts.
    pub fn read_voltage(&mut self) -> f32 {
        raw_to_voltage(self.read_raw())
    }

    /// Mean voltage over `samples` reads, 1 ms apart.
    ///
    /// Failed reads are skipped. The raw codes of the successful reads are
    /// summed and divided by their count with integer truncation, then the
    /// truncated mean code is scaled to volts.
    pub fn read_voltage_average<C: Clock + ?Sized>(
        &mut self,
        clock: &C,
        samples: u8,
    ) -> Result<f32, AdcError> {
        self.read_raw_average(clock, samples).map(raw_to_voltage)
    }

    /// Truncated mean code over `samples` reads, 1 ms apart, skipping failed
    /// reads.
    pub fn read_raw_average<C: Clock + ?Sized>(
        &mut self,
        clock: &C,
        samples: u8,
    ) -> Result<u16, AdcError> {
        if samples == 0 {
            return Err(AdcError::NoValidSamples);
        }
        let mut sum: u32 = 0;
        let mut valid: u8 = 0;
        for _ in 0..samples {
            let read = match self.mode {
                ReadMode::Interrupt => Ok(self.read_raw()),
                ReadMode::Polling => self.read_raw_polling(),
            };
            if let Ok(raw) = read {
                sum = sum.saturating_add(u32::from(raw));
                valid = valid.saturating_add(1);
            }
            clock.delay_ms(ADC_AVERAGE_GAP_MS);
        }
        let mean = sum
            .checked_div(u32::from(valid))
            .ok_or(AdcError::NoValidSamples)?;
        Ok(u16::try_from(mean).unwrap_or(u16::MAX))
    }

    /// Check that the conversion interrupt path is alive.
    ///
    /// Starts one conversion and spins up to `spins` iterations for the
    /// completion flag. On failure the hardware status is cleared so the
    /// next read starts clean.
    pub fn test_interrupt(&mut self, spins: u32) -> bool {
        self.adc.clear_complete();
        self.ready.clear();
        self.adc.enable_conversions();
        self.adc.start_conversion();
        let ready = self.ready;
        let fired = poll_bounded(spins, || ready.is_set());
        if fired {
            // Consume the result so the next conversion starts clean.
            let _ = self.adc.result();
            self.ready.clear();
        } else {
            self.adc.clear_complete();
        }
        fired
    }

    /// Hand the ADC back.
    pub fn release(self) -> A {
        self.adc
    }
}

// ─── High-speed batches ──────────────────────────────────────────────────────

/// Batch sampling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatchConfig {
    /// Samples per flushed batch (1..=50)
    pub batch_size: u8,
    /// Requested sample rate (1..=1000 Hz)
    pub sample_rate_hz: u32,
}

/// Fixed-capacity high-rate sampling stream.
///
/// While armed, each [`process`](Self::process) call takes one fast sample;
/// every `batch_size` samples the batch is sent to telemetry and the buffer
/// starts over.
pub struct BatchSampler {
    active: bool,
    sample_rate_hz: u32,
    batch_size: u8,
    buffer: Vec<f32, ADC_BATCH_CAPACITY>,
    samples_taken: u32,
}

impl BatchSampler {
    /// Idle, default batch size and rate.
    pub const fn new() -> Self {
        Self {
            active: false,
            sample_rate_hz: ADC_DEFAULT_SAMPLE_RATE_HZ,
            batch_size: ADC_DEFAULT_BATCH,
            buffer: Vec::new(),
            samples_taken: 0,
        }
    }

    /// Arm sampling at `rate_hz` (clamped to 1..=1000 Hz) with an empty buffer.
    pub fn start(&mut self, rate_hz: u32) {
        self.set_sample_rate(rate_hz);
        self.active = true;
        self.samples_taken = 0;
        self.buffer.clear();
        #[cfg(feature = "defmt")]
        defmt::info!("adc: batch sampling at {} Hz", self.sample_rate_hz);
    }

    /// Disarm and flush any partial batch.
    pub fn stop<S: SerialSink + ?Sized>(&mut self, sink: &mut S) {
        self.active = false;
        self.flush(sink);
    }

    /// Accept a batch size in `1..=ADC_BATCH_CAPACITY`.
    pub fn set_batch_size(&mut self, size: u8) -> Result<(), BatchError> {
        if size == 0 || usize::from(size) > ADC_BATCH_CAPACITY {
            return Err(BatchError::InvalidSize(size));
        }
        self.batch_size = size;
        Ok(())
    }

    /// Clamp to 1..=1000 Hz. Takes effect immediately.
    pub fn set_sample_rate(&mut self, rate_hz: u32) {
        self.sample_rate_hz = rate_hz.clamp(1, ADC_MAX_SAMPLE_RATE_HZ);
    }

    /// Current batch settings.
    pub fn config(&self) -> BatchConfig {
        BatchConfig {
            batch_size: self.batch_size,
            sample_rate_hz: self.sample_rate_hz,
        }
    }

    /// One high-speed step. No-op while stopped or if the fast read times out.
    pub fn process<A, W, S>(&mut self, sampler: &mut Sampler<'_, A, W>, sink: &mut S)
    where
        A: AdcPeripheral,
        W: WaitForInterrupt,
        S: SerialSink + ?Sized,
    {
        if !self.active {
            return;
        }
        let Ok(raw) = sampler.read_raw_fast() else {
            return;
        };
        if self.buffer.push(raw_to_voltage(raw)).is_err() {
            // Full despite the batch bound: flush and keep the sample.
            self.flush(sink);
            let _ = self.buffer.push(raw_to_voltage(raw));
        }
        self.samples_taken = self.samples_taken.wrapping_add(1);
        if self.buffer.len() >= usize::from(self.batch_size) {
            self.flush(sink);
        }
    }

    fn flush<S: SerialSink + ?Sized>(&mut self, sink: &mut S) {
        if self.buffer.is_empty() {
            return;
        }
        telemetry::send_adc_batch(sink, &self.buffer);
        self.buffer.clear();
    }

    /// Whether sampling is armed.
    pub fn is_sampling(&self) -> bool {
        self.active
    }

    /// Configured sample rate (Hz).
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Configured batch size.
    pub fn batch_size(&self) -> u8 {
        self.batch_size
    }

    /// Samples buffered but not yet sent.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Samples taken since the last start.
    pub fn samples_taken(&self) -> u32 {
        self.samples_taken
    }
}

impl Default for BatchSampler {
    fn default() -> Self {
        Self::new()
    }
}
