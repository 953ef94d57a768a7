//! Bench applications
//!
//! Each application wires the core services to the board collaborators and
//! exposes `boot` (run once) and `poll` (run every main-loop pass). Interrupt
//! handlers stay outside: they write to [`Shared`](crate::context::Shared),
//! which both sides hold by reference.

pub mod current_monitor;
pub mod encoder_dac;
pub mod power_monitor;

pub use current_monitor::CurrentMonitorApp;
pub use encoder_dac::EncoderDacApp;
pub use power_monitor::PowerMonitorApp;
