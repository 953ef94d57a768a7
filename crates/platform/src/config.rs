//! Board configuration and constants
//!
//! Electrical and clock parameters of the MSPM0G3507 bench board. Anything
//! application-specific (task rates, limits) lives in `firmware::config`.

/// Core clock after SYSCTL init (Hz). SysTick and cycle delays derive from it.
pub const CPU_CLOCK_HZ: u32 = 32_000_000;

/// Core cycles per microsecond.
pub const CYCLES_PER_US: u32 = CPU_CLOCK_HZ / 1_000_000;

/// ADC and DAC reference voltage (V).
pub const VREF_VOLTS: f32 = 3.3;

/// ADC reference voltage in millivolts, for integer conversions.
pub const VREF_MILLIVOLTS: u32 = 3300;

/// Full-scale code of the 12-bit ADC.
pub const ADC_CODE_MAX: u16 = 4095;

/// Full-scale code of the 12-bit DAC.
pub const DAC_CODE_MAX: u16 = 4095;

/// Depth of the DAC output FIFO in samples.
pub const DAC_FIFO_DEPTH: usize = 4;

/// Board label shown on the display splash.
pub const fn board_name() -> &'static str {
    "MSPM0G3507"
}
