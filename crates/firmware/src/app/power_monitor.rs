//! INA226 bus-voltage monitor with key-selectable LED blink rate
//!
//! Every 50 ms the bus voltage is read and sent as `V:<volts>`, or as
//! `I2C_ERR:<code>` when the read failed. If the sensor handshake failed at
//! boot the monitor stays silent and only the key and LED keep running.

use embedded_hal::digital::OutputPin;
use platform::{Clock, I2cController, SerialSink};

use crate::config::POWER_TASK_MS;
use crate::context::Shared;
use crate::ina226::{Ina226, InitError};
use crate::key::{KeyHandler, LedBlinker};
use crate::scheduler::PeriodicTask;
use crate::telemetry;

/// Bus-voltage reporter.
pub struct PowerMonitorApp<'a, I, C, S, L> {
    shared: &'a Shared,
    sensor: Ina226<I, C>,
    serial: S,
    key: KeyHandler,
    led: LedBlinker<L>,
    report: PeriodicTask,
    init_result: Option<Result<(), InitError>>,
}

impl<'a, I, C, S, L> PowerMonitorApp<'a, I, C, S, L>
where
    I: I2cController,
    C: Clock,
    S: SerialSink,
    L: OutputPin,
{
    /// Assemble the application. Nothing is sent until [`boot`](Self::boot).
    pub fn new(shared: &'a Shared, sensor: Ina226<I, C>, serial: S, led: L) -> Self {
        Self {
            shared,
            sensor,
            serial,
            key: KeyHandler::new(),
            led: LedBlinker::new(led),
            report: PeriodicTask::new(POWER_TASK_MS),
            init_result: None,
        }
    }

    /// Run the sensor handshake and remember the outcome.
    pub fn boot(&mut self) -> Result<(), InitError> {
        let result = self.sensor.init();
        self.init_result = Some(result);
        #[cfg(feature = "defmt")]
        if let Err(e) = result {
            defmt::warn!("power-monitor: sensor unavailable: {}", e);
        }
        result
    }

    /// Whether the sensor handshake succeeded.
    pub fn is_initialized(&self) -> bool {
        matches!(self.init_result, Some(Ok(())))
    }

    /// One main-loop pass.
    pub fn poll<K: Clock + ?Sized>(&mut self, clock: &K) {
        let now = clock.now_ms();
        self.key.process(&self.shared.key, now);
        // LED errors only affect the indicator
        let _ = self.led.update(now, self.key.led_period_ms());

        if !self.is_initialized() || !self.report.poll(now) {
            return;
        }
        let volts = self.sensor.bus_voltage_v();
        match self.sensor.last_error() {
            None => telemetry::send_bus_voltage(&mut self.serial, volts),
            Some(e) => telemetry::send_bus_error(&mut self.serial, e.code()),
        }
    }

    /// Key state (blink mode).
    pub fn key(&self) -> &KeyHandler {
        &self.key
    }

    /// Whether the LED is on.
    pub fn led_lit(&self) -> bool {
        self.led.is_lit()
    }

    /// Telemetry sink.
    pub fn serial(&self) -> &S {
        &self.serial
    }

    /// Sensor driver.
    pub fn sensor_mut(&mut self) -> &mut Ina226<I, C> {
        &mut self.sensor
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::INA226_ADDRESS;
    use crate::ina226::registers::{BUS, CONF, MANUFACTURER_ID, MAN_ID};
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use platform::mocks::{FakeClock, MockI2c, RecordingSerial};

    fn sensor(bus_raw: u16) -> MockI2c {
        let mut bus = MockI2c::new(INA226_ADDRESS);
        bus.set_register(CONF, 0x4127);
        bus.set_register(MAN_ID, MANUFACTURER_ID);
        bus.set_register(BUS, bus_raw);
        bus
    }

    #[test]
    fn reports_bus_voltage_every_interval() {
        let shared = Shared::new();
        let clock = FakeClock::new();
        let sensor = Ina226::new(sensor(4000), &clock, INA226_ADDRESS);
        let mut led = PinMock::new(&[]);
        let mut app = PowerMonitorApp::new(&shared, sensor, RecordingSerial::new(), led.clone());
        app.boot().unwrap();
        assert!(app.is_initialized());

        clock.advance(50);
        app.poll(&clock);
        app.poll(&clock);
        assert_eq!(app.serial().lines, ["V:5.000\n"]);
        led.done();
    }

    #[test]
    fn read_failure_reports_error_code() {
        let shared = Shared::new();
        let clock = FakeClock::with_step(1);
        // driver addressed where nothing answers; handshake marked done
        let sensor = Ina226::new(sensor(4000), &clock, INA226_ADDRESS ^ 1);
        let mut led = PinMock::new(&[]);
        let mut app = PowerMonitorApp::new(&shared, sensor, RecordingSerial::new(), led.clone());
        app.init_result = Some(Ok(()));

        clock.advance(50);
        app.poll(&clock);
        assert_eq!(app.serial().lines, ["I2C_ERR:5\n"]);
        led.done();
    }

    #[test]
    fn failed_handshake_keeps_monitor_silent() {
        let shared = Shared::new();
        let clock = FakeClock::new();
        let mut bus = sensor(4000);
        bus.set_register(MAN_ID, 0);
        let sensor = Ina226::new(bus, &clock, INA226_ADDRESS);
        let mut led = PinMock::new(&[]);
        let mut app = PowerMonitorApp::new(&shared, sensor, RecordingSerial::new(), led.clone());
        assert_eq!(app.boot(), Err(InitError::ManufacturerId(0)));
        assert!(!app.is_initialized());
        clock.advance(100);
        app.poll(&clock);
        assert!(app.serial().lines.is_empty());
        led.done();
    }

    #[test]
    fn key_press_switches_led_to_fast_blink() {
        let shared = Shared::new();
        let clock = FakeClock::new();
        let mut bus = sensor(0);
        bus.set_register(CONF, 0);
        let sensor = Ina226::new(bus, &clock, INA226_ADDRESS);
        let mut led = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let mut app = PowerMonitorApp::new(&shared, sensor, RecordingSerial::new(), led.clone());
        assert_eq!(app.boot(), Err(InitError::NoResponse));

        clock.advance(100);
        shared.key.signal();
        app.poll(&clock);
        assert!(app.key().fast_mode());
        assert!(app.led_lit());

        clock.advance(100);
        app.poll(&clock);
        assert!(!app.led_lit());
        led.done();
    }
}
