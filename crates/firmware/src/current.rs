//! Hall-effect current sensor on ADC0
//!
//! The sensor output sits at its zero offset with no current flowing and
//! moves 0.1 V per ampere either side of it:
//!
//! ```text
//! amps = (volts - zero_offset) / 0.1
//! ```
//!
//! The offset starts at the nominal 1.65 V and is replaced by
//! [`CurrentSensor::calibrate_zero`], which must run with no current
//! through the sensor. Readings beyond ±15 A are still reported, tagged
//! with a [`RangeStatus`].

use platform::{AdcPeripheral, Clock, WaitForInterrupt};

use crate::config::{
    CURRENT_CALIBRATION_SAMPLES, CURRENT_OFFSET_TOLERANCE_VOLTS, CURRENT_RANGE_AMPS,
    CURRENT_SENSITIVITY_V_PER_A, CURRENT_ZERO_OFFSET_VOLTS,
};
use crate::sampler::{raw_to_millivolts, raw_to_voltage, AdcError, Sampler};

/// Zero calibration failures. The previous offset stays in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// No usable ADC read.
    Adc(AdcError),
    /// The idle output is too far from the nominal offset to be a zero.
    OffsetOutOfRange {
        /// Measured idle output (mV)
        millivolts: u16,
    },
}

impl core::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Adc(e) => write!(f, "zero calibration read failed: {e}"),
            Self::OffsetOutOfRange { millivolts } => {
                write!(f, "idle output {millivolts} mV is not a plausible zero")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CalibrationError {}

impl From<AdcError> for CalibrationError {
    fn from(e: AdcError) -> Self {
        Self::Adc(e)
    }
}

/// Where a reading falls relative to the rated range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeStatus {
    /// Within ±15 A.
    Ok,
    /// Above +15 A.
    OverRange,
    /// Below -15 A.
    UnderRange,
}

impl RangeStatus {
    /// Classify a current. The rated limits themselves are in range.
    pub fn classify(amps: f32) -> Self {
        if amps > CURRENT_RANGE_AMPS {
            Self::OverRange
        } else if amps < -CURRENT_RANGE_AMPS {
            Self::UnderRange
        } else {
            Self::Ok
        }
    }

    /// Four-column status text for the display.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK  ",
            Self::OverRange => "HIGH",
            Self::UnderRange => "LOW ",
        }
    }
}

/// One averaged measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CurrentReading {
    /// Current (A), positive into the sensor
    pub amps: f32,
    /// Sensor output (V)
    pub volts: f32,
    /// Mean ADC code
    pub raw: u16,
    /// Range classification of `amps`
    pub range: RangeStatus,
}

/// Current through a sensor whose output reads `volts` with the given zero.
pub fn volts_to_amps(volts: f32, zero_offset: f32) -> f32 {
    (volts - zero_offset) / CURRENT_SENSITIVITY_V_PER_A
}

/// Current sensor behind the analog sampler.
pub struct CurrentSensor<'a, A, W> {
    sampler: Sampler<'a, A, W>,
    zero_offset: f32,
}

impl<'a, A, W> CurrentSensor<'a, A, W>
where
    A: AdcPeripheral,
    W: WaitForInterrupt,
{
    /// Sensor at the nominal zero offset.
    pub fn new(sampler: Sampler<'a, A, W>) -> Self {
        Self {
            sampler,
            zero_offset: CURRENT_ZERO_OFFSET_VOLTS,
        }
    }

    /// Arm the ADC.
    pub fn init(&mut self) {
        self.sampler.init();
    }

    /// Output voltage taken as zero current.
    pub fn zero_offset(&self) -> f32 {
        self.zero_offset
    }

    /// Average the idle output and adopt it as the new zero.
    ///
    /// Rejected when every read fails or the output is more than 0.5 V from
    /// the nominal offset (something is flowing, or nothing is connected).
    pub fn calibrate_zero<C: Clock + ?Sized>(&mut self, clock: &C) -> Result<f32, CalibrationError> {
        let raw = self
            .sampler
            .read_raw_average(clock, CURRENT_CALIBRATION_SAMPLES)?;
        let volts = raw_to_voltage(raw);
        if libm::fabsf(volts - CURRENT_ZERO_OFFSET_VOLTS) > CURRENT_OFFSET_TOLERANCE_VOLTS {
            #[cfg(feature = "defmt")]
            defmt::warn!("current: idle output {=u16} mV rejected", raw_to_millivolts(raw));
            return Err(CalibrationError::OffsetOutOfRange {
                millivolts: raw_to_millivolts(raw),
            });
        }
        self.zero_offset = volts;
        #[cfg(feature = "defmt")]
        defmt::info!("current: zero offset {} V", volts);
        Ok(volts)
    }

    /// Averaged current over `samples` reads.
    pub fn read_average<C: Clock + ?Sized>(
        &mut self,
        clock: &C,
        samples: u8,
    ) -> Result<CurrentReading, AdcError> {
        let raw = self.sampler.read_raw_average(clock, samples)?;
        let volts = raw_to_voltage(raw);
        let amps = volts_to_amps(volts, self.zero_offset);
        Ok(CurrentReading {
            amps,
            volts,
            raw,
            range: RangeStatus::classify(amps),
        })
    }

    /// Underlying sampler (read mode selection).
    pub fn sampler_mut(&mut self) -> &mut Sampler<'a, A, W> {
        &mut self.sampler
    }
}
