//! Hardware access layer for the MSPM0 bench firmware
//!
//! This crate provides the small trait surface the firmware core drives,
//! enabling the decode, sampling, streaming and sensor algorithms to be
//! developed and tested without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Applications (firmware::app)
//!         ↓
//! Core services (time base, decoder, sampler, streamer, INA226, scheduler)
//!         ↓
//! Platform access traits (this crate)
//!         ↓
//! Register-level board support (PAC / driverlib)
//! ```
//!
//! # Abstraction Levels
//!
//! ## Peripherals
//! - [`AdcPeripheral`] - Single-shot analog conversions
//! - [`DacPeripheral`] - FIFO-fed analog output with a sample-rate generator
//! - [`I2cController`] - FIFO-level I2C controller, polled
//! - [`EdgeInterrupt`] - GPIO edge interrupt acknowledge and masking
//!
//! ## Collaborators
//! - [`SerialSink`] - Telemetry text lines
//! - [`DisplaySink`] - Character display cells
//!
//! ## Timing
//! - [`Clock`] - Millisecond time source
//! - [`Deadline`] - Bounded waits against a [`Clock`]
//! - [`WaitForInterrupt`] - Low-power suspend
//!
//! # Features
//!
//! - `std`: Enable standard library support (error impls, mocks)
//! - `hardware`: Cortex-M `wfi`/`wfe` implementation of [`WaitForInterrupt`]
//! - `defmt`: Enable defmt logging derives
//!
//! # Example
//!
//! ```no_run
//! use platform::{Clock, wait_until};
//!
//! fn wait_ready<C: Clock>(clock: &C, mut ready: impl FnMut() -> bool) -> bool {
//!     wait_until(clock, 10, &mut ready)
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
// Pedantic lints suppressed for this hardware access crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod adc;
pub mod config;
pub mod dac;
pub mod display;
pub mod gpio;
pub mod peripheral;
pub mod power;
pub mod time;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export peripheral traits
pub use adc::AdcPeripheral;
pub use dac::DacPeripheral;
pub use gpio::{EdgeInterrupt, InterruptMode};
pub use peripheral::{I2cController, SerialSink, TransferDirection};

// Re-export collaborator sinks
pub use display::DisplaySink;

// Re-export timing types
pub use power::WaitForInterrupt;
pub use time::{poll_bounded, wait_until, Clock, Deadline};

#[cfg(feature = "hardware")]
pub use power::CortexM;
