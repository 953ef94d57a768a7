//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests. Every mock records what the
//! code under test did so assertions can be made on the full sequence.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::arithmetic_side_effects)] // test doubles, counters cannot realistically overflow

use crate::*;
use core::cell::Cell;
use core::convert::Infallible;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Deterministic clock.
///
/// Time only moves through [`advance`](Self::advance), [`Clock::delay_ms`],
/// or (when built with [`with_step`](Self::with_step)) by a fixed amount on
/// every `now_ms` read so that busy-wait loops terminate.
#[derive(Debug, Default)]
pub struct FakeClock {
    now: Cell<u32>,
    step: u32,
    delayed: Cell<u32>,
    delays: Cell<u32>,
}

impl FakeClock {
    /// Clock frozen at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock that advances `step_ms` after every read.
    pub fn with_step(step_ms: u32) -> Self {
        Self {
            step: step_ms,
            ..Self::default()
        }
    }

    /// Frozen clock starting at `ms` (for wraparound tests).
    pub fn starting_at(ms: u32) -> Self {
        let clock = Self::default();
        clock.now.set(ms);
        clock
    }

    /// Move time forward.
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    /// Sum of all `delay_ms` requests.
    pub fn total_delay_ms(&self) -> u32 {
        self.delayed.get()
    }

    /// Number of non-zero `delay_ms` calls.
    pub fn delay_calls(&self) -> u32 {
        self.delays.get()
    }

    /// Current time without side effects.
    pub fn peek(&self) -> u32 {
        self.now.get()
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }

    fn delay_ms(&self, ms: u32) {
        if ms == 0 {
            return;
        }
        self.advance(ms);
        self.delayed.set(self.delayed.get() + ms);
        self.delays.set(self.delays.get() + 1);
    }
}

/// Sleep primitive that returns immediately and counts calls.
///
/// An optional hook runs on every wake so tests can play the part of an
/// interrupt handler.
pub struct MockWait<F = fn()> {
    hook: Option<F>,
    /// Number of `wait_for_interrupt` calls
    pub interrupts: u32,
    /// Number of `wait_for_event` calls
    pub events: u32,
}

impl MockWait {
    /// Wait with no hook.
    pub fn new() -> Self {
        Self {
            hook: None,
            interrupts: 0,
            events: 0,
        }
    }
}

impl Default for MockWait {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FnMut()> MockWait<F> {
    /// Wait that calls `hook` every time the core would sleep.
    pub fn with_hook(hook: F) -> Self {
        Self {
            hook: Some(hook),
            interrupts: 0,
            events: 0,
        }
    }

    fn wake(&mut self) {
        if let Some(hook) = self.hook.as_mut() {
            hook();
        }
    }
}

impl<F: FnMut()> WaitForInterrupt for MockWait<F> {
    fn wait_for_interrupt(&mut self) {
        self.interrupts += 1;
        self.wake();
    }

    fn wait_for_event(&mut self) {
        self.events += 1;
        self.wake();
    }
}

// ---------------------------------------------------------------------------
// GPIO
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct LineState {
    high: Cell<bool>,
    clears: Cell<u32>,
    mode: Cell<Option<InterruptMode>>,
}

/// GPIO input line with edge-interrupt bookkeeping.
///
/// Clones share state, so a test keeps one handle to drive the level while
/// the code under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockLine {
    state: Rc<LineState>,
}

impl MockLine {
    /// Line at the given level.
    pub fn new(high: bool) -> Self {
        let line = Self::default();
        line.state.high.set(high);
        line
    }

    /// Drive the line level.
    pub fn set_level(&self, high: bool) {
        self.state.high.set(high);
    }

    /// How many times the interrupt flag was cleared.
    pub fn clears(&self) -> u32 {
        self.state.clears.get()
    }

    /// Currently enabled trigger, if any.
    pub fn interrupt_mode(&self) -> Option<InterruptMode> {
        self.state.mode.get()
    }
}

impl embedded_hal::digital::ErrorType for MockLine {
    type Error = Infallible;
}

impl embedded_hal::digital::InputPin for MockLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.state.high.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.state.high.get())
    }
}

impl EdgeInterrupt for MockLine {
    fn enable_interrupt(&mut self, mode: InterruptMode) {
        self.state.mode.set(Some(mode));
    }

    fn disable_interrupt(&mut self) {
        self.state.mode.set(None);
    }

    fn clear_interrupt(&mut self) {
        self.state.clears.set(self.state.clears.get() + 1);
    }
}

// ---------------------------------------------------------------------------
// ADC
// ---------------------------------------------------------------------------

/// ADC returning scripted results.
///
/// Results are consumed in order; once the script is empty the last value
/// repeats (or 0 if nothing was scripted). A started conversion raises the
/// raw result-loaded status immediately unless the ADC is stalled, either
/// permanently or for that conversion through [`stall_conversions`].
///
/// [`stall_conversions`]: Self::stall_conversions
#[derive(Debug, Default)]
pub struct MockAdc {
    results: VecDeque<u16>,
    stalls: VecDeque<bool>,
    last: u16,
    loaded: bool,
    /// Conversions never complete
    pub stalled: bool,
    /// Number of `clear_complete` calls
    pub clears: u32,
    /// Number of `enable_conversions` calls
    pub enables: u32,
    /// Number of `start_conversion` calls
    pub starts: u32,
}

impl MockAdc {
    /// ADC with a script of results.
    pub fn new(results: &[u16]) -> Self {
        Self {
            results: results.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Per-conversion outcome for the next starts: `true` never completes.
    /// Stalled conversions consume no result.
    pub fn stall_conversions(&mut self, pattern: &[bool]) {
        self.stalls.extend(pattern.iter().copied());
    }
}

impl AdcPeripheral for MockAdc {
    fn clear_complete(&mut self) {
        self.loaded = false;
        self.clears += 1;
    }

    fn enable_conversions(&mut self) {
        self.enables += 1;
    }

    fn start_conversion(&mut self) {
        self.starts += 1;
        let stalled_once = self.stalls.pop_front().unwrap_or(false);
        self.loaded = !self.stalled && !stalled_once;
    }

    fn is_result_loaded(&self) -> bool {
        self.loaded
    }

    fn result(&mut self) -> u16 {
        self.loaded = false;
        if let Some(next) = self.results.pop_front() {
            self.last = next;
        }
        self.last
    }
}

// ---------------------------------------------------------------------------
// DAC
// ---------------------------------------------------------------------------

/// DAC with a `DEPTH`-entry output FIFO.
///
/// Nothing drains the FIFO on its own; tests call [`drain`](Self::drain) to
/// emulate the sample-time generator consuming codes.
#[derive(Debug, Default)]
pub struct MockDac<const DEPTH: usize = { crate::config::DAC_FIFO_DEPTH }> {
    fifo: VecDeque<u16>,
    /// Every code written, in order
    pub history: Vec<u16>,
    /// Codes consumed by [`drain`](Self::drain), in order
    pub played: Vec<u16>,
    /// Writes rejected because the FIFO was full
    pub overruns: u32,
    /// Number of `clear_threshold` calls
    pub threshold_clears: u32,
    pending: bool,
    irq_enabled: bool,
    timer_enabled: bool,
}

impl<const DEPTH: usize> MockDac<DEPTH> {
    /// Empty, idle DAC.
    pub fn new() -> Self {
        Self {
            fifo: VecDeque::with_capacity(DEPTH),
            history: Vec::new(),
            played: Vec::new(),
            overruns: 0,
            threshold_clears: 0,
            pending: false,
            irq_enabled: false,
            timer_enabled: false,
        }
    }

    /// Consume up to `n` queued codes and raise the threshold status.
    pub fn drain(&mut self, n: usize) -> usize {
        let mut drained = 0;
        while drained < n {
            let Some(code) = self.fifo.pop_front() else {
                break;
            };
            self.played.push(code);
            drained += 1;
        }
        if drained > 0 {
            self.pending = true;
        }
        drained
    }

    /// Codes currently queued.
    pub fn queued(&self) -> Vec<u16> {
        self.fifo.iter().copied().collect()
    }

    /// Most recent code written.
    pub fn last_output(&self) -> Option<u16> {
        self.history.last().copied()
    }
}

impl<const DEPTH: usize> DacPeripheral for MockDac<DEPTH> {
    fn output(&mut self, code: u16) {
        self.history.push(code);
        if self.fifo.len() < DEPTH {
            self.fifo.push_back(code);
        } else {
            self.overruns += 1;
        }
    }

    fn is_fifo_full(&self) -> bool {
        self.fifo.len() >= DEPTH
    }

    fn threshold_pending(&self) -> bool {
        self.pending
    }

    fn clear_threshold(&mut self) {
        self.pending = false;
        self.threshold_clears += 1;
    }

    fn set_threshold_interrupt(&mut self, enabled: bool) {
        self.irq_enabled = enabled;
    }

    fn threshold_interrupt_enabled(&self) -> bool {
        self.irq_enabled
    }

    fn set_sample_timer(&mut self, enabled: bool) {
        self.timer_enabled = enabled;
        // Stopping the generator lets the output stage flush what is queued.
        if !enabled {
            self.fifo.clear();
        }
    }

    fn sample_timer_enabled(&self) -> bool {
        self.timer_enabled
    }
}

// ---------------------------------------------------------------------------
// I2C
// ---------------------------------------------------------------------------

/// Fault injected into a single I2C transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2cFault {
    /// The transfer never completes; the bus stays busy until the next
    /// `flush_tx`.
    Hang,
    /// A read transfer completes without delivering any data.
    NoData,
    /// A read transfer delivers only its first byte.
    ShortRead,
}

/// Register-level I2C target emulating a 16-bit big-endian register device.
///
/// 3-byte writes store a register, 1-byte writes set the register pointer,
/// 2-byte reads return the pointed register. Transfers addressed elsewhere
/// are ignored (no ACK, no data).
#[derive(Debug, Default)]
pub struct MockI2c {
    address: u8,
    registers: HashMap<u8, u16>,
    scripted: HashMap<u8, VecDeque<u16>>,
    pointer: u8,
    tx: Vec<u8>,
    rx: VecDeque<u8>,
    faults: HashMap<usize, I2cFault>,
    hung: bool,
    /// Bus reports busy forever
    pub stuck_busy: bool,
    /// Every transfer started: (address, direction, length)
    pub transfers: Vec<(u8, TransferDirection, u16)>,
    /// Every register write: (register, value)
    pub writes: Vec<(u8, u16)>,
    /// Every register read served: register address
    pub reads: Vec<u8>,
    /// Number of `flush_tx` calls
    pub tx_flushes: u32,
}

impl MockI2c {
    /// Target answering at `address`.
    pub fn new(address: u8) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// Preset a register value.
    pub fn set_register(&mut self, reg: u8, value: u16) {
        self.registers.insert(reg, value);
    }

    /// Current register value (0 if never written).
    pub fn register(&self, reg: u8) -> u16 {
        self.registers.get(&reg).copied().unwrap_or(0)
    }

    /// Values returned by the next reads of `reg`, before falling back to
    /// the stored register.
    pub fn script_reads(&mut self, reg: u8, values: &[u16]) {
        self.scripted
            .entry(reg)
            .or_default()
            .extend(values.iter().copied());
    }

    /// Inject `fault` into the `index`th transfer (0-based, counting every
    /// `start_transfer` call).
    pub fn fault_on_transfer(&mut self, index: usize, fault: I2cFault) {
        self.faults.insert(index, fault);
    }

    /// Values written to `reg`, in order.
    pub fn writes_to(&self, reg: u8) -> Vec<u16> {
        self.writes
            .iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, v)| *v)
            .collect()
    }

    fn serve_read(&mut self) -> u16 {
        let reg = self.pointer;
        self.reads.push(reg);
        if let Some(next) = self.scripted.get_mut(&reg).and_then(VecDeque::pop_front) {
            return next;
        }
        self.register(reg)
    }
}

impl I2cController for MockI2c {
    fn flush_tx(&mut self) {
        self.tx.clear();
        self.hung = false;
        self.tx_flushes += 1;
    }

    fn flush_rx(&mut self) {
        self.rx.clear();
    }

    fn fill_tx(&mut self, bytes: &[u8]) -> usize {
        self.tx.extend_from_slice(bytes);
        bytes.len()
    }

    fn start_transfer(&mut self, address: u8, direction: TransferDirection, len: u16) {
        let index = self.transfers.len();
        self.transfers.push((address, direction, len));
        let fault = self.faults.remove(&index);
        if fault == Some(I2cFault::Hang) {
            self.hung = true;
            return;
        }
        if address != self.address {
            self.tx.clear();
            return;
        }
        match direction {
            TransferDirection::Write => {
                let frame: Vec<u8> = self.tx.drain(..).collect();
                match frame.as_slice() {
                    [reg] => self.pointer = *reg,
                    [reg, hi, lo, ..] => {
                        let value = u16::from_be_bytes([*hi, *lo]);
                        self.pointer = *reg;
                        self.writes.push((*reg, value));
                        self.registers.insert(*reg, value);
                    }
                    _ => {}
                }
            }
            TransferDirection::Read => {
                let [hi, lo] = self.serve_read().to_be_bytes();
                match fault {
                    Some(I2cFault::NoData) => {}
                    Some(I2cFault::ShortRead) => self.rx.push_back(hi),
                    _ => {
                        self.rx.push_back(hi);
                        if len > 1 {
                            self.rx.push_back(lo);
                        }
                    }
                }
            }
        }
    }

    fn is_bus_busy(&self) -> bool {
        self.stuck_busy || self.hung
    }

    fn receive(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }
}

// ---------------------------------------------------------------------------
// Collaborator sinks
// ---------------------------------------------------------------------------

/// Serial sink that keeps every line sent.
#[derive(Debug, Default)]
pub struct RecordingSerial {
    /// Lines in the order they were sent
    pub lines: Vec<String>,
}

impl RecordingSerial {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent, concatenated.
    pub fn joined(&self) -> String {
        self.lines.concat()
    }
}

impl SerialSink for RecordingSerial {
    fn send_str(&mut self, line: &str) {
        self.lines.push(String::from(line));
    }
}

/// One display update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOp {
    /// `show_string`
    Text {
        /// Row (1-based)
        row: u8,
        /// Column (1-based)
        column: u8,
        /// Text drawn
        text: String,
    },
    /// `show_num`
    Number {
        /// Row (1-based)
        row: u8,
        /// Column (1-based)
        column: u8,
        /// Value drawn
        value: u32,
        /// Digit count
        digits: u8,
    },
}

/// Display sink that keeps every update.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    /// Updates in the order they were issued
    pub ops: Vec<DisplayOp>,
}

impl RecordingDisplay {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySink for RecordingDisplay {
    fn show_string(&mut self, row: u8, column: u8, text: &str) {
        self.ops.push(DisplayOp::Text {
            row,
            column,
            text: String::from(text),
        });
    }

    fn show_num(&mut self, row: u8, column: u8, value: u32, digits: u8) {
        self.ops.push(DisplayOp::Number {
            row,
            column,
            value,
            digits,
        });
    }
}
