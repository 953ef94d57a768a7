//! Application constants
//!
//! Task rates, limits and protocol budgets shared by the core services and
//! the bench applications. Board-level electrical constants live in
//! [`platform::config`].

// ── Quadrature encoder ──────────────────────────────────────────────────────

/// Lowest encoder position.
pub const ENCODER_MIN: i16 = 0;

/// Highest encoder position (3.3 V at 0.1 V per step).
pub const ENCODER_MAX: i16 = 33;

/// Position at boot (1.6 V).
pub const ENCODER_DEFAULT: i16 = 16;

/// Volts per encoder step.
pub const ENCODER_STEP_VOLTS: f32 = 0.1;

/// Lowest commanded output voltage.
pub const OUTPUT_MIN_VOLTS: f32 = 0.0;

/// Highest commanded output voltage.
pub const OUTPUT_MAX_VOLTS: f32 = 3.3;

/// Settling time after an A-phase falling edge before sampling both lines.
pub const ENCODER_DEBOUNCE_US: u32 = 100;

// ── Analog sampler ──────────────────────────────────────────────────────────

/// Iteration budget for [`crate::sampler::Sampler::read_raw_polling`].
pub const ADC_POLL_BUDGET: u32 = 100_000;

/// Iteration budget for [`crate::sampler::Sampler::read_raw_fast`].
pub const ADC_FAST_POLL_BUDGET: u32 = 10_000;

/// Gap between reads while averaging (ms).
pub const ADC_AVERAGE_GAP_MS: u32 = 1;

/// Capacity of the high-speed batch buffer.
pub const ADC_BATCH_CAPACITY: usize = 50;

/// Batch size after boot.
pub const ADC_DEFAULT_BATCH: u8 = 10;

/// Highest accepted high-speed sample rate (Hz).
pub const ADC_MAX_SAMPLE_RATE_HZ: u32 = 1000;

/// Sample rate after boot (Hz).
pub const ADC_DEFAULT_SAMPLE_RATE_HZ: u32 = 1000;

// ── Waveform streaming ──────────────────────────────────────────────────────

/// Samples per waveform period.
pub const WAVE_TABLE_LEN: usize = 256;

/// Code written once on start as a sanity check.
pub const WAVE_MIDSCALE: u16 = 2048;

/// Settle time after the mid-scale write (ms).
pub const WAVE_START_SETTLE_MS: u32 = 10;

/// Entries pushed into the FIFO before the generator starts.
pub const WAVE_PRIME_COUNT: usize = 4;

/// Spin iterations allowed for the FIFO to drain on stop.
pub const WAVE_DRAIN_SPINS: u32 = 1000;

// ── INA226 ──────────────────────────────────────────────────────────────────

/// Sensor address on the bench board (A0 tied high).
pub const INA226_ADDRESS: u8 = 0x41;

// ── Hall current sensor ─────────────────────────────────────────────────────

/// Sensor output at zero current before calibration (V).
pub const CURRENT_ZERO_OFFSET_VOLTS: f32 = 1.65;

/// Sensor output slope (V per A).
pub const CURRENT_SENSITIVITY_V_PER_A: f32 = 0.1;

/// Magnitude above which a reading is flagged out of range (A).
pub const CURRENT_RANGE_AMPS: f32 = 15.0;

/// Largest accepted distance of a calibrated zero from the nominal (V).
pub const CURRENT_OFFSET_TOLERANCE_VOLTS: f32 = 0.5;

/// ADC reads averaged per current measurement.
pub const CURRENT_AVERAGE_SAMPLES: u8 = 10;

/// ADC reads averaged for the zero calibration.
pub const CURRENT_CALIBRATION_SAMPLES: u8 = 50;

/// No-current window before the zero calibration (ms).
pub const CURRENT_CALIBRATION_MS: u32 = 5000;

/// Hold on a failed calibration before the window restarts (ms).
pub const CURRENT_RETRY_HOLD_MS: u32 = 2000;

/// A detail line is sent on every this-many successful measurements.
pub const CURRENT_DETAIL_EVERY: u8 = 11;

// ── Scheduler ───────────────────────────────────────────────────────────────

/// Encoder change check interval (ms).
pub const ENCODER_TASK_MS: u32 = 5;

/// Analog sample interval (ms).
pub const ADC_TASK_MS: u32 = 50;

/// Display refresh interval (ms).
pub const DISPLAY_TASK_MS: u32 = 100;

/// Bus-voltage report interval (ms).
pub const POWER_TASK_MS: u32 = 50;

/// Current measurement and display interval (ms).
pub const CURRENT_TASK_MS: u32 = 100;

// ── User key and LED ────────────────────────────────────────────────────────

/// Minimum spacing between accepted key presses (ms).
pub const KEY_DEBOUNCE_MS: u32 = 50;

/// LED half-period in slow mode (ms).
pub const LED_SLOW_MS: u32 = 500;

/// LED half-period in fast mode (ms).
pub const LED_FAST_MS: u32 = 100;
