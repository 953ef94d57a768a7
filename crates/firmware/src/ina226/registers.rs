//! INA226 register map
//!
//! Reference: Texas Instruments INA226 datasheet (SBOS547A)
//!
//! All registers are 16 bits, transferred MSB first. The register pointer
//! is set by a one-byte write; a following read returns the pointed
//! register.

// ---------------------------------------------------------------------------
// Register addresses
// ---------------------------------------------------------------------------

/// Configuration: RST, AVG\[11:9\], VBUSCT\[8:6\], VSHCT\[5:3\], MODE\[2:0\].
pub const CONF: u8 = 0x00;
/// Shunt voltage, signed, 2.5 µV/LSB.
pub const SHUNT: u8 = 0x01;
/// Bus voltage, unsigned, 1.25 mV/LSB.
pub const BUS: u8 = 0x02;
/// Power, unsigned, 25 × current LSB.
pub const POWER: u8 = 0x03;
/// Current, signed, current LSB set by CAL.
pub const CURRENT: u8 = 0x04;
/// Calibration.
pub const CAL: u8 = 0x05;
/// Mask/Enable: alert function select and status flags.
pub const MASK_EN: u8 = 0x06;
/// Alert limit compared against the selected alert function.
pub const ALERT_LIMIT: u8 = 0x07;
/// Manufacturer ID (reads 0x5449, "TI").
pub const MAN_ID: u8 = 0xFE;
/// Die ID.
pub const DIE_ID: u8 = 0xFF;

// ---------------------------------------------------------------------------
// Bits
// ---------------------------------------------------------------------------

/// CONF: soft reset, self-clearing.
pub const CONF_RESET: u16 = 0x8000;
/// CONF: averaging field.
pub const CONF_AVG_MASK: u16 = 0x0E00;
/// CONF: bus conversion time field.
pub const CONF_VBUSCT_MASK: u16 = 0x01C0;
/// CONF: shunt conversion time field.
pub const CONF_VSHCT_MASK: u16 = 0x0038;
/// CONF: operating mode field.
pub const CONF_MODE_MASK: u16 = 0x0007;

/// MASK_EN: alert function select bits \[15:11\].
pub const ALERT_FUNCTION_MASK: u16 = 0xF800;
/// MASK_EN: assert alert on conversion ready.
pub const CNVR: u16 = 0x0400;
/// MASK_EN: alert function flag.
pub const AFF: u16 = 0x0010;
/// MASK_EN: conversion ready flag, cleared by reading MASK_EN.
pub const CVRF: u16 = 0x0008;
/// MASK_EN: math overflow flag.
pub const OVF: u16 = 0x0004;
/// MASK_EN: alert pin polarity (1 = active high).
pub const APOL: u16 = 0x0002;
/// MASK_EN: alert latch enable.
pub const LEN: u16 = 0x0001;

/// Expected MAN_ID content.
pub const MANUFACTURER_ID: u16 = 0x5449;

// ---------------------------------------------------------------------------
// Field encodings
// ---------------------------------------------------------------------------

/// Samples averaged per reported result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Averages {
    /// 1 sample
    #[default]
    Avg1 = 0 << 9,
    /// 4 samples
    Avg4 = 1 << 9,
    /// 16 samples
    Avg16 = 2 << 9,
    /// 64 samples
    Avg64 = 3 << 9,
    /// 128 samples
    Avg128 = 4 << 9,
    /// 256 samples
    Avg256 = 5 << 9,
    /// 512 samples
    Avg512 = 6 << 9,
    /// 1024 samples
    Avg1024 = 7 << 9,
}

impl Averages {
    /// CONF bits, already shifted.
    pub const fn bits(self) -> u16 {
        self as u16
    }
}

/// ADC conversion time, shared encoding for the shunt and bus fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ConversionTime {
    /// 140 µs
    Us140 = 0,
    /// 204 µs
    Us204 = 1,
    /// 332 µs
    Us332 = 2,
    /// 588 µs
    Us588 = 3,
    /// 1.1 ms
    #[default]
    Us1100 = 4,
    /// 2.116 ms
    Us2116 = 5,
    /// 4.156 ms
    Us4156 = 6,
    /// 8.244 ms
    Us8244 = 7,
}

impl ConversionTime {
    /// Shunt field bits (VSHCT, bits 5:3).
    pub const fn shunt_bits(self) -> u16 {
        (self as u16) << 3
    }

    /// Bus field bits (VBUSCT, bits 8:6).
    pub const fn bus_bits(self) -> u16 {
        (self as u16) << 6
    }

    /// Nominal duration in microseconds.
    pub const fn micros(self) -> u32 {
        match self {
            Self::Us140 => 140,
            Self::Us204 => 204,
            Self::Us332 => 332,
            Self::Us588 => 588,
            Self::Us1100 => 1100,
            Self::Us2116 => 2116,
            Self::Us4156 => 4156,
            Self::Us8244 => 8244,
        }
    }
}

/// Operating mode (shunt and bus together).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Mode {
    /// Shutdown
    PowerDown = 0,
    /// Single shot, re-armed by writing CONF
    Triggered = 3,
    /// Free running
    #[default]
    Continuous = 7,
}

impl Mode {
    /// CONF bits.
    pub const fn bits(self) -> u16 {
        self as u16
    }
}

/// Alert function. Current limits are converted to shunt-voltage limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlertKind {
    /// Shunt voltage over limit (V)
    ShuntOver,
    /// Shunt voltage under limit (V)
    ShuntUnder,
    /// Bus voltage over limit (V)
    BusOver,
    /// Bus voltage under limit (V)
    BusUnder,
    /// Power over limit (mW)
    PowerOver,
    /// Current over limit (mA)
    CurrentOver,
    /// Current under limit (mA)
    CurrentUnder,
}

impl AlertKind {
    /// MASK_EN\[15:11\] bits selecting this function.
    pub const fn bits(self) -> u16 {
        match self {
            Self::ShuntOver | Self::CurrentOver => 0x8000,
            Self::ShuntUnder | Self::CurrentUnder => 0x4000,
            Self::BusOver => 0x2000,
            Self::BusUnder => 0x1000,
            Self::PowerOver => 0x0800,
        }
    }
}
