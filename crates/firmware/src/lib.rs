//! MSPM0 bench firmware core
//!
//! Interrupt-driven services and main-loop applications for an MSPM0G3507
//! (Cortex-M0+) bench board: a rotary encoder driving a static DAC level,
//! ADC read-back, a streamed sine waveform, an INA226 power monitor and a
//! zero-calibrated Hall current sensor.
//!
//! # Architecture
//!
//! ```text
//! Applications (app::EncoderDacApp, app::PowerMonitorApp, app::CurrentMonitorApp)
//!         ↓
//! Core services (time_base, encoder, sampler, waveform, ina226, current, scheduler)
//!         ↓
//! Platform access traits (platform crate)
//!         ↓
//! Register-level board support
//! ```
//!
//! Interrupt handlers only touch [`context::Shared`] and the `on_*` entry
//! points ([`TimeBase::on_tick`], [`QuadratureDecoder::on_phase_a_edge`],
//! [`WaveformStreamer::on_fifo_threshold`]); everything else runs from the
//! main loop.
//!
//! # Features
//!
//! - `hardware` - Cortex-M0+ target (`wfi`/`wfe`, defmt logging)
//! - `std` - Enable standard library (error impls, host testing)
//! - `defmt` - Structured logging on the probe

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
#![warn(clippy::dbg_macro)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::similar_names)]

pub mod app;
pub mod config;
pub mod context;
pub mod current;
pub mod encoder;
pub mod ina226;
pub mod key;
pub mod sampler;
pub mod scheduler;
pub mod telemetry;
pub mod time_base;
pub mod waveform;

// Re-export key types
pub use app::{CurrentMonitorApp, EncoderDacApp, PowerMonitorApp};
pub use context::{EventFlag, Shared};
pub use current::{CalibrationError, CurrentReading, CurrentSensor, RangeStatus};
pub use encoder::{EncoderCell, EncoderState, QuadratureDecoder};
pub use ina226::{BusError, Ina226, InitError};
pub use key::{KeyHandler, LedBlinker};
pub use sampler::{AdcError, BatchSampler, ReadMode, Sampler};
pub use scheduler::{PeriodicTask, Scheduler};
pub use time_base::{TickClock, TimeBase};
pub use waveform::{WaveTable, WaveformStreamer};
