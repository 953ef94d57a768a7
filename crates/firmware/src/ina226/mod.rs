//! INA226 current/power monitor over a polled I2C controller
//!
//! The controller is driven at FIFO level: every register access flushes,
//! fills and starts a transfer, then polls the bus-busy status. Reads are
//! retried under a [`RetryPolicy`]; each step has its own timeout and its
//! own error code so a failing board can be diagnosed from telemetry alone.
//!
//! # Read sequence
//!
//! ```text
//! flush TX/RX → idle? (2) → write pointer → idle? (3) → settle
//!            → request 2 bytes → idle? (4) → drain 2 bytes (5) → MSB first
//! ```
//!
//! A failed read returns 0 through [`Ina226::read_register`] and leaves the
//! code in [`Ina226::last_error_code`]; the fallible form is
//! [`Ina226::try_read_register`].

pub mod registers;

use platform::{wait_until, Clock, I2cController, TransferDirection};

use registers::{
    AlertKind, Averages, ConversionTime, Mode, ALERT_FUNCTION_MASK, ALERT_LIMIT, APOL, BUS, CAL,
    CNVR, CONF, CONF_AVG_MASK, CONF_MODE_MASK, CONF_RESET, CONF_VBUSCT_MASK, CONF_VSHCT_MASK,
    CURRENT, AFF, CVRF, LEN, MANUFACTURER_ID, MAN_ID, MASK_EN, OVF, POWER, SHUNT,
};

/// Calibration written at init (0.1 Ω shunt, 25 µA current LSB).
pub const DEFAULT_CALIBRATION: u16 = 2048;
/// Raw current counts per milliamp after init.
pub const DEFAULT_CURRENT_DIVIDER_MA: f32 = 40.0;
/// Power LSB after init (mW).
pub const DEFAULT_POWER_MULTIPLIER_MW: f32 = 0.625;

/// Hold after soft reset (ms).
const RESET_HOLD_MS: u32 = 10;
/// Hold after configuration before the ID check (ms).
const CONFIGURE_HOLD_MS: u32 = 20;
/// Hold after restoring CONF from power-down (ms).
const POWER_UP_HOLD_MS: u32 = 1;
/// Conversion-ready polls for [`Ina226::trigger_and_wait`], 1 ms apart.
const TRIGGER_POLLS: u32 = 50;
/// Conversion-ready polls for [`Ina226::start_single_measurement`].
const SINGLE_SHOT_POLLS: u32 = 2000;
/// Conversion-ready polls for [`Ina226::wait_until_conversion_completed`].
const COMPLETION_POLLS: u32 = 20;
/// Extra settle after conversion ready (ms).
const COMPLETION_SETTLE_MS: u32 = 2;

// ─── Policy and errors ───────────────────────────────────────────────────────

/// Retry and timing budget for register reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    /// Read attempts before giving up
    pub attempts: u8,
    /// Timeout for each bus step (ms)
    pub step_timeout_ms: u32,
    /// Hold between failed attempts (ms)
    pub backoff_ms: u32,
    /// Hold after writes and after the pointer write (ms)
    pub settle_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            step_timeout_ms: 10,
            backoff_ms: 10,
            settle_ms: 2,
        }
    }
}

/// Bus step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Bus still busy before the transaction began
    BusBusy,
    /// Register-pointer write did not finish
    AddressWrite,
    /// Read request did not finish
    ReadRequest,
    /// Fewer than two bytes arrived
    IncompleteRead,
    /// Conversion-ready flag never rose after a trigger
    ConversionTimeout,
}

impl BusError {
    /// Numeric code reported as `I2C_ERR:<code>`.
    pub const fn code(self) -> u8 {
        match self {
            Self::BusBusy | Self::ConversionTimeout => 2,
            Self::AddressWrite => 3,
            Self::ReadRequest => 4,
            Self::IncompleteRead => 5,
        }
    }
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BusBusy => write!(f, "I2C bus busy"),
            Self::AddressWrite => write!(f, "register pointer write timed out"),
            Self::ReadRequest => write!(f, "read request timed out"),
            Self::IncompleteRead => write!(f, "incomplete register read"),
            Self::ConversionTimeout => write!(f, "conversion ready timeout"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BusError {}

/// Initialization handshake failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitError {
    /// Probe read of CONF returned 0 (nothing answering)
    NoResponse,
    /// Configuration read-modify-write failed
    Bus(BusError),
    /// MAN_ID did not read 0x5449
    ManufacturerId(u16),
}

impl core::fmt::Display for InitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoResponse => write!(f, "INA226 did not respond"),
            Self::Bus(e) => write!(f, "INA226 configuration failed: {e}"),
            Self::ManufacturerId(id) => {
                write!(f, "unexpected manufacturer id {id:#06x}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InitError {}

impl From<BusError> for InitError {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// CONF fields applied by [`Ina226::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ina226Config {
    /// Averaging
    pub averages: Averages,
    /// Shunt conversion time
    pub shunt_time: ConversionTime,
    /// Bus conversion time
    pub bus_time: ConversionTime,
    /// Operating mode
    pub mode: Mode,
}

/// One pass over the measurement registers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurements {
    /// Bus voltage (V)
    pub bus_voltage_v: f32,
    /// Shunt voltage (mV)
    pub shunt_voltage_mv: f32,
    /// Current (mA)
    pub current_ma: f32,
    /// Power (mW)
    pub power_mw: f32,
}

/// Status bits from MASK_EN. Reading them clears the conversion flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlertFlags {
    /// Math overflow (OVF)
    pub overflow: bool,
    /// Conversion ready (CVRF)
    pub conversion_ready: bool,
    /// Alert function triggered (AFF)
    pub limit_alert: bool,
}

#[allow(clippy::cast_possible_wrap)] // two's-complement register content
const fn signed(raw: u16) -> i16 {
    raw as i16
}

// ─── Driver ──────────────────────────────────────────────────────────────────

/// INA226 on a polled I2C controller.
pub struct Ina226<I, C> {
    bus: I,
    clock: C,
    address: u8,
    policy: RetryPolicy,
    calibration: u16,
    correction: f32,
    current_divider_ma: f32,
    power_multiplier_mw: f32,
    last_error: Option<BusError>,
    saved_config: u16,
}

impl<I: I2cController, C: Clock> Ina226<I, C> {
    /// Driver with default scaling and retry policy. Nothing is sent yet.
    pub fn new(bus: I, clock: C, address: u8) -> Self {
        Self {
            bus,
            clock,
            address,
            policy: RetryPolicy::default(),
            calibration: DEFAULT_CALIBRATION,
            correction: 1.0,
            current_divider_ma: DEFAULT_CURRENT_DIVIDER_MA,
            power_multiplier_mw: DEFAULT_POWER_MULTIPLIER_MW,
            last_error: None,
            saved_config: 0,
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Target address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Current calibration register value.
    pub fn calibration(&self) -> u16 {
        self.calibration
    }

    /// Error code of the most recent failed operation, 0 if it succeeded.
    pub fn last_error_code(&self) -> u8 {
        self.last_error.map_or(0, BusError::code)
    }

    /// Most recent failure, if any.
    pub fn last_error(&self) -> Option<BusError> {
        self.last_error
    }

    /// Hand back the bus and clock.
    pub fn release(self) -> (I, C) {
        (self.bus, self.clock)
    }

    // ── Register access ──

    /// Write a 16-bit register, MSB first.
    ///
    /// Waits for bus idle without a timeout, then holds the settle time.
    pub fn write_register(&mut self, reg: u8, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.bus.flush_tx();
        self.bus.fill_tx(&[reg, hi, lo]);
        self.bus
            .start_transfer(self.address, TransferDirection::Write, 3);
        while self.bus.is_bus_busy() {
            core::hint::spin_loop();
        }
        self.clock.delay_ms(self.policy.settle_ms);
    }

    /// Read a 16-bit register under the retry policy.
    pub fn try_read_register(&mut self, reg: u8) -> Result<u16, BusError> {
        let mut result = Err(BusError::BusBusy);
        for attempt in 0..self.policy.attempts {
            if attempt > 0 {
                self.clock.delay_ms(self.policy.backoff_ms);
            }
            result = self.read_once(reg);
            match result {
                Ok(_) => break,
                Err(_e) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!(
                        "ina226: read {=u8:#x} attempt {} failed: code {}",
                        reg,
                        attempt,
                        _e.code()
                    );
                }
            }
        }
        self.last_error = result.err();
        result
    }

    /// Read a register, 0 on failure. The failure stays in
    /// [`last_error_code`](Self::last_error_code).
    pub fn read_register(&mut self, reg: u8) -> u16 {
        self.try_read_register(reg).unwrap_or(0)
    }

    fn read_once(&mut self, reg: u8) -> Result<u16, BusError> {
        self.bus.flush_tx();
        self.bus.flush_rx();
        if !self.bus_idle() {
            return Err(BusError::BusBusy);
        }

        self.bus.fill_tx(&[reg]);
        self.bus
            .start_transfer(self.address, TransferDirection::Write, 1);
        if !self.bus_idle() {
            return Err(BusError::AddressWrite);
        }
        self.clock.delay_ms(self.policy.settle_ms);

        self.bus.flush_rx();
        self.bus
            .start_transfer(self.address, TransferDirection::Read, 2);
        if !self.bus_idle() {
            return Err(BusError::ReadRequest);
        }

        self.drain_rx().ok_or(BusError::IncompleteRead)
    }

    fn bus_idle(&self) -> bool {
        let bus = &self.bus;
        wait_until(&self.clock, self.policy.step_timeout_ms, || {
            !bus.is_bus_busy()
        })
    }

    fn drain_rx(&mut self) -> Option<u16> {
        let mut bytes = [0u8; 2];
        let mut received = 0usize;
        let bus = &mut self.bus;
        let complete = wait_until(&self.clock, self.policy.step_timeout_ms, || {
            while let Some(slot) = bytes.get_mut(received) {
                let Some(byte) = bus.receive() else {
                    break;
                };
                *slot = byte;
                received = received.saturating_add(1);
            }
            received == 2
        });
        complete.then(|| u16::from_be_bytes(bytes))
    }

    fn modify_register(&mut self, reg: u8, clear: u16, set: u16) -> Result<(), BusError> {
        let current = self.try_read_register(reg)?;
        self.write_register(reg, (current & !clear) | set);
        Ok(())
    }

    // ── Lifecycle ──

    /// Probe, reset, calibrate, configure, and check the manufacturer ID.
    pub fn init(&mut self) -> Result<(), InitError> {
        if self.read_register(CONF) == 0 {
            #[cfg(feature = "defmt")]
            defmt::error!("ina226: no response at {=u8:#x}", self.address);
            return Err(InitError::NoResponse);
        }

        self.reset();
        self.write_register(CAL, self.calibration);
        self.configure(Ina226Config::default())?;
        self.clock.delay_ms(CONFIGURE_HOLD_MS);

        let id = self.read_register(MAN_ID);
        if id != MANUFACTURER_ID {
            #[cfg(feature = "defmt")]
            defmt::error!("ina226: manufacturer id {=u16:#x}", id);
            return Err(InitError::ManufacturerId(id));
        }
        #[cfg(feature = "defmt")]
        defmt::info!("ina226: ready at {=u8:#x}", self.address);
        Ok(())
    }

    /// Soft reset and hold 10 ms.
    pub fn reset(&mut self) {
        self.write_register(CONF, CONF_RESET);
        self.clock.delay_ms(RESET_HOLD_MS);
    }

    /// Apply averaging, both conversion times and the mode.
    pub fn configure(&mut self, config: Ina226Config) -> Result<(), BusError> {
        self.set_averages(config.averages)?;
        self.set_conversion_times(config.shunt_time, config.bus_time)?;
        self.set_mode(config.mode)
    }

    /// Averaging field of CONF.
    pub fn set_averages(&mut self, averages: Averages) -> Result<(), BusError> {
        self.modify_register(CONF, CONF_AVG_MASK | CONF_RESET, averages.bits())
    }

    /// Shunt and bus conversion-time fields of CONF.
    pub fn set_conversion_times(
        &mut self,
        shunt: ConversionTime,
        bus: ConversionTime,
    ) -> Result<(), BusError> {
        self.modify_register(
            CONF,
            CONF_VSHCT_MASK | CONF_VBUSCT_MASK | CONF_RESET,
            shunt.shunt_bits() | bus.bus_bits(),
        )
    }

    /// Mode field of CONF.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), BusError> {
        self.modify_register(CONF, CONF_MODE_MASK | CONF_RESET, mode.bits())
    }

    /// Save CONF and shut the converter down.
    pub fn power_down(&mut self) -> Result<(), BusError> {
        self.saved_config = self.try_read_register(CONF)?;
        self.set_mode(Mode::PowerDown)
    }

    /// Restore the CONF saved by [`power_down`](Self::power_down).
    pub fn power_up(&mut self) {
        self.write_register(CONF, self.saved_config & !CONF_RESET);
        self.clock.delay_ms(POWER_UP_HOLD_MS);
    }

    // ── Calibration ──

    /// Scale CAL by `factor` (trimming against a reference meter).
    pub fn set_correction_factor(&mut self, factor: f32) {
        self.correction = factor;
        let corrected = (f32::from(self.calibration) * factor) as u16;
        self.write_register(CAL, corrected);
    }

    /// Derive CAL and the scaling from the shunt value and expected range.
    pub fn set_resistor_range(&mut self, shunt_ohms: f32, range_amps: f32) {
        let current_lsb = range_amps / 32768.0;
        self.calibration = (0.00512 / (current_lsb * shunt_ohms)) as u16;
        self.current_divider_ma = 0.001 / current_lsb;
        self.power_multiplier_mw = 1000.0 * 25.0 * current_lsb;
        self.write_register(CAL, self.calibration);
    }

    // ── Measurements ──

    /// Shunt voltage in volts (2.5 µV/LSB).
    pub fn shunt_voltage_v(&mut self) -> f32 {
        let raw = signed(self.read_register(SHUNT));
        f32::from(raw) * 0.000_002_5 * self.correction
    }

    /// Shunt voltage in millivolts.
    pub fn shunt_voltage_mv(&mut self) -> f32 {
        let raw = signed(self.read_register(SHUNT));
        f32::from(raw) * 0.0025 * self.correction
    }

    /// Bus voltage in volts (1.25 mV/LSB).
    pub fn bus_voltage_v(&mut self) -> f32 {
        f32::from(self.read_register(BUS)) * 0.001_25
    }

    /// Current in milliamps.
    pub fn current_ma(&mut self) -> f32 {
        f32::from(signed(self.read_register(CURRENT))) / self.current_divider_ma
    }

    /// Current in amps.
    pub fn current_a(&mut self) -> f32 {
        self.current_ma() / 1000.0
    }

    /// Bus power in milliwatts.
    pub fn power_mw(&mut self) -> f32 {
        f32::from(self.read_register(POWER)) * self.power_multiplier_mw
    }

    /// Shunt, bus, current and power in one pass.
    pub fn read_all(&mut self) -> Measurements {
        let shunt = signed(self.read_register(SHUNT));
        let bus = self.read_register(BUS);
        let current = signed(self.read_register(CURRENT));
        let power = self.read_register(POWER);
        Measurements {
            bus_voltage_v: f32::from(bus) * 0.001_25,
            shunt_voltage_mv: f32::from(shunt) * 0.0025 * self.correction,
            current_ma: f32::from(current) / self.current_divider_ma,
            power_mw: f32::from(power) * self.power_multiplier_mw,
        }
    }

    // ── Triggered conversions ──

    fn retrigger(&mut self) {
        // Reading MASK_EN clears CVRF; rewriting CONF starts a conversion.
        self.read_register(MASK_EN);
        let conf = self.read_register(CONF);
        self.write_register(CONF, conf & !CONF_RESET);
    }

    fn conversion_ready(&mut self) -> bool {
        self.read_register(MASK_EN) & CVRF != 0
    }

    /// Trigger a conversion and poll CVRF once per ms for up to 50 ms.
    pub fn trigger_and_wait(&mut self) -> Result<(), BusError> {
        self.retrigger();
        for _ in 0..TRIGGER_POLLS {
            self.clock.delay_ms(1);
            if self.conversion_ready() {
                self.last_error = None;
                return Ok(());
            }
        }
        self.last_error = Some(BusError::ConversionTimeout);
        Err(BusError::ConversionTimeout)
    }

    /// Trigger a conversion and poll CVRF for up to 2000 ms.
    pub fn start_single_measurement(&mut self) -> bool {
        self.retrigger();
        for _ in 0..SINGLE_SHOT_POLLS {
            if self.conversion_ready() {
                return true;
            }
            self.clock.delay_ms(1);
        }
        false
    }

    /// Trigger a conversion and return immediately.
    pub fn start_single_measurement_no_wait(&mut self) {
        self.retrigger();
    }

    /// `true` while the conversion-ready flag is clear.
    pub fn is_busy(&mut self) -> bool {
        !self.conversion_ready()
    }

    /// Poll CVRF for up to 20 ms; settle 2 ms once ready.
    pub fn wait_until_conversion_completed(&mut self) -> bool {
        for _ in 0..COMPLETION_POLLS {
            if self.conversion_ready() {
                self.clock.delay_ms(COMPLETION_SETTLE_MS);
                return true;
            }
            self.clock.delay_ms(1);
        }
        false
    }

    // ── Alert pin ──

    /// ALERT asserts high instead of low.
    pub fn set_alert_pin_active_high(&mut self) -> Result<(), BusError> {
        self.modify_register(MASK_EN, 0, APOL)
    }

    /// ALERT stays asserted until MASK_EN is read.
    pub fn enable_alert_latch(&mut self) -> Result<(), BusError> {
        self.modify_register(MASK_EN, 0, LEN)
    }

    /// ALERT also signals conversion ready.
    pub fn enable_conversion_ready_alert(&mut self) -> Result<(), BusError> {
        self.modify_register(MASK_EN, 0, CNVR)
    }

    /// Register value written to ALERT_LIMIT for `kind` at `limit`.
    pub fn alert_limit_bits(&self, kind: AlertKind, limit: f32) -> u16 {
        let scaled = match kind {
            AlertKind::ShuntOver | AlertKind::ShuntUnder => limit * 400.0,
            AlertKind::BusOver | AlertKind::BusUnder => limit * 800.0,
            AlertKind::CurrentOver | AlertKind::CurrentUnder => {
                limit * 2048.0 * self.current_divider_ma / f32::from(self.calibration)
            }
            AlertKind::PowerOver => limit / self.power_multiplier_mw,
        };
        scaled as u16
    }

    /// Select the alert function and its limit.
    ///
    /// Current limits are converted to the equivalent shunt-voltage limit.
    pub fn set_alert_type(&mut self, kind: AlertKind, limit: f32) -> Result<(), BusError> {
        let bits = self.alert_limit_bits(kind, limit);
        self.write_register(ALERT_LIMIT, bits);
        self.modify_register(MASK_EN, ALERT_FUNCTION_MASK, kind.bits())
    }

    /// Read MASK_EN (clearing CVRF) and decode the status bits.
    pub fn read_and_clear_flags(&mut self) -> AlertFlags {
        let value = self.read_register(MASK_EN);
        AlertFlags {
            overflow: value & OVF != 0,
            conversion_ready: value & CVRF != 0,
            limit_alert: value & AFF != 0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use platform::mocks::{FakeClock, I2cFault, MockI2c};

    const ADDR: u8 = 0x41;

    fn sensor() -> MockI2c {
        let mut bus = MockI2c::new(ADDR);
        bus.set_register(CONF, 0x4127);
        bus.set_register(MAN_ID, MANUFACTURER_ID);
        bus
    }

    #[test]
    fn write_sends_msb_first_then_settles() {
        let clock = FakeClock::new();
        let mut dev = Ina226::new(sensor(), &clock, ADDR);
        dev.write_register(CAL, 0x1234);
        assert_eq!(clock.total_delay_ms(), 2);
        let (bus, _) = dev.release();
        assert_eq!(bus.writes, [(CAL, 0x1234)]);
        assert_eq!(bus.transfers, [(ADDR, TransferDirection::Write, 3)]);
    }

    #[test]
    fn read_returns_register_big_endian() {
        let clock = FakeClock::new();
        let mut bus = sensor();
        bus.set_register(BUS, 0x0FA0);
        let mut dev = Ina226::new(bus, &clock, ADDR);
        assert_eq!(dev.try_read_register(BUS), Ok(0x0FA0));
        assert_eq!(dev.last_error_code(), 0);
    }

    #[test]
    fn hung_pointer_write_recovers_on_retry() {
        let clock = FakeClock::with_step(1);
        let mut bus = sensor();
        bus.set_register(BUS, 4000);
        bus.fault_on_transfer(0, I2cFault::Hang);
        let mut dev = Ina226::new(bus, &clock, ADDR);
        assert_eq!(dev.read_register(BUS), 4000);
        assert_eq!(dev.last_error_code(), 0);
    }

    #[test]
    fn pointer_write_hanging_every_attempt_reports_code_three() {
        let clock = FakeClock::with_step(1);
        let mut bus = sensor();
        bus.set_register(BUS, 4000);
        // only the pointer write starts when it hangs: 0, 1, 2
        for transfer in 0..3 {
            bus.fault_on_transfer(transfer, I2cFault::Hang);
        }
        let mut dev = Ina226::new(bus, &clock, ADDR);
        assert_eq!(dev.try_read_register(BUS), Err(BusError::AddressWrite));
        assert_eq!(dev.last_error_code(), 3);

        let (bus, _) = dev.release();
        assert_eq!(bus.transfers.len(), 3);
        assert!(bus
            .transfers
            .iter()
            .all(|&(_, dir, _)| dir == TransferDirection::Write));
        assert_eq!(bus.tx_flushes, 3, "each attempt clears the hang first");
    }

    #[test]
    fn read_request_hanging_every_attempt_reports_code_four() {
        let clock = FakeClock::with_step(1);
        let mut bus = sensor();
        bus.set_register(BUS, 4000);
        // read transfers of each attempt: 1, 3, 5
        for transfer in [1, 3, 5] {
            bus.fault_on_transfer(transfer, I2cFault::Hang);
        }
        let mut dev = Ina226::new(bus, &clock, ADDR);
        assert_eq!(dev.read_register(BUS), 0);
        assert_eq!(dev.last_error_code(), 4);

        // the next read starts on a clean bus
        assert_eq!(dev.read_register(BUS), 4000);
        assert_eq!(dev.last_error_code(), 0);
    }

    #[test]
    fn missing_bytes_report_incomplete_read() {
        let clock = FakeClock::with_step(1);
        let mut bus = sensor();
        // read transfers of each attempt: 1, 3, 5
        bus.fault_on_transfer(1, I2cFault::NoData);
        bus.fault_on_transfer(3, I2cFault::ShortRead);
        bus.fault_on_transfer(5, I2cFault::NoData);
        let mut dev = Ina226::new(bus, &clock, ADDR);
        assert_eq!(dev.try_read_register(CONF), Err(BusError::IncompleteRead));
        assert_eq!(dev.read_register(CONF), 0x4127);
        assert_eq!(dev.last_error_code(), 0);
    }

    #[test]
    fn wrong_address_never_answers() {
        let clock = FakeClock::with_step(1);
        let mut dev = Ina226::new(sensor(), &clock, 0x40);
        assert_eq!(dev.read_register(CONF), 0);
        assert_eq!(dev.last_error_code(), 5);
    }

    #[test]
    fn init_runs_handshake() {
        let clock = FakeClock::new();
        let mut dev = Ina226::new(sensor(), &clock, ADDR);
        dev.init().unwrap();
        let (bus, _) = dev.release();
        let conf_writes = bus.writes_to(CONF);
        assert_eq!(conf_writes.first(), Some(&CONF_RESET));
        assert_eq!(bus.writes_to(CAL), [DEFAULT_CALIBRATION]);
        // AVG 1, 1.1 ms / 1.1 ms, continuous
        assert_eq!(bus.register(CONF) & 0x0FFF, 0x0127);
        assert_eq!(bus.reads.last(), Some(&MAN_ID));
    }

    #[test]
    fn init_rejects_silent_device() {
        let clock = FakeClock::new();
        let mut bus = sensor();
        bus.set_register(CONF, 0);
        let mut dev = Ina226::new(bus, &clock, ADDR);
        assert_eq!(dev.init(), Err(InitError::NoResponse));
    }

    #[test]
    fn init_rejects_foreign_manufacturer() {
        let clock = FakeClock::new();
        let mut bus = sensor();
        bus.set_register(MAN_ID, 0x1234);
        let mut dev = Ina226::new(bus, &clock, ADDR);
        assert_eq!(dev.init(), Err(InitError::ManufacturerId(0x1234)));
    }

    #[test]
    fn setters_preserve_other_fields() {
        let clock = FakeClock::new();
        let mut dev = Ina226::new(sensor(), &clock, ADDR);
        dev.set_averages(Averages::Avg64).unwrap();
        dev.set_mode(Mode::Triggered).unwrap();
        let (bus, _) = dev.release();
        assert_eq!(bus.register(CONF), 0x4000 | (3 << 9) | 0x0120 | 3);
    }

    #[test]
    fn scaling_uses_default_lsbs() {
        let clock = FakeClock::new();
        let mut bus = sensor();
        bus.set_register(BUS, 4000);
        bus.set_register(SHUNT, 0xFFFC); // -4
        bus.set_register(CURRENT, 400);
        bus.set_register(POWER, 16);
        let mut dev = Ina226::new(bus, &clock, ADDR);
        assert!((dev.bus_voltage_v() - 5.0).abs() < 1e-6);
        assert!((dev.shunt_voltage_mv() + 0.01).abs() < 1e-6);
        assert!((dev.shunt_voltage_v() + 0.000_01).abs() < 1e-9);
        assert!((dev.current_ma() - 10.0).abs() < 1e-6);
        assert!((dev.current_a() - 0.01).abs() < 1e-6);
        assert!((dev.power_mw() - 10.0).abs() < 1e-6);
        let all = dev.read_all();
        assert!((all.bus_voltage_v - 5.0).abs() < 1e-6);
        assert!((all.current_ma - 10.0).abs() < 1e-6);
    }

    #[test]
    fn resistor_range_rescales() {
        let clock = FakeClock::new();
        let mut dev = Ina226::new(sensor(), &clock, ADDR);
        dev.set_resistor_range(0.1, 1.3);
        // lsb = 1.3 / 32768, cal = 0.00512 / (lsb * 0.1)
        assert_eq!(dev.calibration(), 1290);
        let (bus, _) = dev.release();
        assert_eq!(bus.writes_to(CAL), [1290]);
    }

    #[test]
    fn correction_scales_calibration() {
        let clock = FakeClock::new();
        let mut dev = Ina226::new(sensor(), &clock, ADDR);
        dev.set_correction_factor(0.5);
        let (bus, _) = dev.release();
        assert_eq!(bus.writes_to(CAL), [1024]);
    }

    #[test]
    fn trigger_waits_for_conversion_ready() {
        let clock = FakeClock::new();
        let mut bus = sensor();
        // retrigger clears, then two polls before CVRF
        bus.script_reads(MASK_EN, &[0, 0, 0, CVRF]);
        let mut dev = Ina226::new(bus, &clock, ADDR);
        assert_eq!(dev.trigger_and_wait(), Ok(()));
        assert_eq!(dev.last_error_code(), 0);
    }

    #[test]
    fn trigger_times_out_with_code_two() {
        let clock = FakeClock::new();
        let mut dev = Ina226::new(sensor(), &clock, ADDR);
        assert_eq!(dev.trigger_and_wait(), Err(BusError::ConversionTimeout));
        assert_eq!(dev.last_error_code(), 2);
    }

    #[test]
    fn completion_wait_settles_once_ready() {
        let clock = FakeClock::new();
        let mut bus = sensor();
        bus.set_register(MASK_EN, CVRF);
        let mut dev = Ina226::new(bus, &clock, ADDR);
        assert!(!dev.is_busy());
        let before = clock.total_delay_ms();
        assert!(dev.wait_until_conversion_completed());
        // one read settle plus the completion settle
        assert_eq!(clock.total_delay_ms() - before, 2 + 2);
    }

    #[test]
    fn power_cycle_restores_configuration() {
        let clock = FakeClock::new();
        let mut dev = Ina226::new(sensor(), &clock, ADDR);
        dev.power_down().unwrap();
        dev.power_up();
        let (bus, _) = dev.release();
        assert_eq!(bus.writes_to(CONF), [0x4120, 0x4127]);
    }

    #[test]
    fn alert_type_replaces_function_bits() {
        let clock = FakeClock::new();
        let mut bus = sensor();
        bus.set_register(MASK_EN, 0x8000 | LEN);
        let mut dev = Ina226::new(bus, &clock, ADDR);
        dev.set_alert_type(AlertKind::BusUnder, 4.5).unwrap();
        dev.set_alert_pin_active_high().unwrap();
        let (bus, _) = dev.release();
        assert_eq!(bus.register(ALERT_LIMIT), 3600);
        assert_eq!(bus.register(MASK_EN), 0x1000 | LEN | APOL);
    }

    #[test]
    fn current_alert_maps_to_shunt_limit() {
        let clock = FakeClock::new();
        let dev = Ina226::new(sensor(), &clock, ADDR);
        // 100 mA * 2048 * 40 / 2048
        assert_eq!(dev.alert_limit_bits(AlertKind::CurrentOver, 100.0), 4000);
        assert_eq!(dev.alert_limit_bits(AlertKind::PowerOver, 100.0), 160);
        assert_eq!(dev.alert_limit_bits(AlertKind::ShuntOver, 0.05), 20);
    }

    #[test]
    fn flags_decode_mask_enable() {
        let clock = FakeClock::new();
        let mut bus = sensor();
        bus.set_register(MASK_EN, OVF | AFF);
        let mut dev = Ina226::new(bus, &clock, ADDR);
        assert_eq!(
            dev.read_and_clear_flags(),
            AlertFlags {
                overflow: true,
                conversion_ready: false,
                limit_alert: true
            }
        );
    }
}
