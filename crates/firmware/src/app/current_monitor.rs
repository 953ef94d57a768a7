//! Hall-sensor current monitor with boot-time zero calibration
//!
//! ```text
//! boot ──► calibrating: 5 s countdown, no current through the sensor
//!              │ window elapsed
//!              ▼
//!          calibrate zero ──fail──► "CAL FAILED!", hold 2 s, restart window
//!              │ ok
//!              ▼
//!          measuring: every 100 ms average 10 reads, show current,
//!                     voltage and range status; detail line every 11th
//! ```
//!
//! The status LED blinks at 500 ms throughout.

use core::fmt::Write;

use embedded_hal::digital::OutputPin;
use heapless::String;
use platform::{AdcPeripheral, Clock, DisplaySink, SerialSink, WaitForInterrupt};

use crate::config::{
    CURRENT_AVERAGE_SAMPLES, CURRENT_CALIBRATION_MS, CURRENT_DETAIL_EVERY, CURRENT_RETRY_HOLD_MS,
    CURRENT_TASK_MS, CURRENT_ZERO_OFFSET_VOLTS, LED_SLOW_MS,
};
use crate::current::{CurrentReading, CurrentSensor};
use crate::key::LedBlinker;
use crate::scheduler::PeriodicTask;
use crate::telemetry;

/// Character columns per display row.
const COLUMNS: usize = 16;

type Field = String<COLUMNS>;

/// Calibration screen: (row, column, text).
pub const CALIBRATION_LABELS: [(u8, u8, &str); 4] = [
    (1, 1, "Zero Calibrating"),
    (2, 1, "Please ensure"),
    (3, 1, "NO current flow"),
    (4, 1, "Wait 5 seconds.."),
];

/// Measurement screen: (row, column, text).
pub const MEASUREMENT_LABELS: [(u8, u8, &str); 2] = [(1, 1, "Current(A):"), (3, 1, "Voltage(V):")];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting out the no-current window. `shown_s` is the countdown value
    /// on the display, 0 before the first one.
    Calibrating { started_ms: u32, shown_s: u32 },
    Measuring,
}

/// Current monitor application.
pub struct CurrentMonitorApp<'a, A, W, S, P, L> {
    sensor: CurrentSensor<'a, A, W>,
    serial: S,
    display: P,
    led: LedBlinker<L>,
    phase: Phase,
    measure: PeriodicTask,
    passes: u8,
    last: Option<CurrentReading>,
}

impl<'a, A, W, S, P, L> CurrentMonitorApp<'a, A, W, S, P, L>
where
    A: AdcPeripheral,
    W: WaitForInterrupt,
    S: SerialSink,
    P: DisplaySink,
    L: OutputPin,
{
    /// Assemble the application. Nothing is driven until [`boot`](Self::boot).
    pub fn new(sensor: CurrentSensor<'a, A, W>, serial: S, display: P, led: L) -> Self {
        Self {
            sensor,
            serial,
            display,
            led: LedBlinker::new(led),
            phase: Phase::Calibrating {
                started_ms: 0,
                shown_s: 0,
            },
            measure: PeriodicTask::new(CURRENT_TASK_MS),
            passes: 0,
            last: None,
        }
    }

    /// Arm the ADC, draw the calibration screen and open the window.
    pub fn boot<C: Clock + ?Sized>(&mut self, clock: &C) {
        self.sensor.init();
        self.serial
            .send_str("System ready - Current Measurement Active\r\n");
        for (row, column, text) in CALIBRATION_LABELS {
            self.display.show_string(row, column, text);
        }
        self.serial.send_str(
            "Starting zero calibration, please ensure no current flows through sensor\r\n",
        );
        self.open_window(clock.now_ms());
        #[cfg(feature = "defmt")]
        defmt::info!("current-monitor: calibration window open");
    }

    /// One main-loop pass.
    pub fn poll<C: Clock + ?Sized>(&mut self, clock: &C) {
        let now = clock.now_ms();
        match self.phase {
            Phase::Calibrating {
                started_ms,
                shown_s,
            } => self.calibration_pass(clock, now, started_ms, shown_s),
            Phase::Measuring => {
                if self.measure.poll(now) {
                    self.measure_task(clock);
                }
            }
        }
        // LED errors only affect the indicator
        let _ = self.led.update(now, LED_SLOW_MS);
    }

    fn open_window(&mut self, now_ms: u32) {
        self.phase = Phase::Calibrating {
            started_ms: now_ms,
            shown_s: 0,
        };
    }

    fn calibration_pass<C: Clock + ?Sized>(
        &mut self,
        clock: &C,
        now: u32,
        started_ms: u32,
        shown_s: u32,
    ) {
        let elapsed = now.wrapping_sub(started_ms);
        if elapsed < CURRENT_CALIBRATION_MS {
            let remaining_s = CURRENT_CALIBRATION_MS.saturating_sub(elapsed) / 1000;
            if remaining_s > 0 && remaining_s != shown_s {
                let mut field = Field::new();
                let _ = write!(field, "Countdown: {remaining_s} s");
                show_row(&mut self.display, 4, &field);
                self.phase = Phase::Calibrating {
                    started_ms,
                    shown_s: remaining_s,
                };
            }
            return;
        }

        show_row(&mut self.display, 4, "Calibrating...");
        self.serial.send_str("Performing zero calibration...\r\n");
        match self.sensor.calibrate_zero(clock) {
            Ok(offset) => {
                self.phase = Phase::Measuring;
                for row in 1..=4 {
                    show_row(&mut self.display, row, "");
                }
                for (row, column, text) in MEASUREMENT_LABELS {
                    self.display.show_string(row, column, text);
                }
                telemetry::send_zero_calibration(&mut self.serial, offset, CURRENT_ZERO_OFFSET_VOLTS);
                self.measure.restart(clock.now_ms());
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("current-monitor: calibration failed: {}", _e);
                show_row(&mut self.display, 4, "CAL FAILED!");
                self.serial.send_str("Calibration failed!\r\n");
                clock.delay_ms(CURRENT_RETRY_HOLD_MS);
                self.open_window(clock.now_ms());
            }
        }
    }

    fn measure_task<C: Clock + ?Sized>(&mut self, clock: &C) {
        let reading = match self.sensor.read_average(clock, CURRENT_AVERAGE_SAMPLES) {
            Ok(reading) => reading,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("current-monitor: read failed: {}", _e);
                self.display.show_string(2, 1, "ERROR   ");
                self.display.show_string(4, 1, "CHECK   ");
                self.serial.send_str("Sensor reading error!\r\n");
                return;
            }
        };
        self.last = Some(reading);

        let mut field = Field::new();
        let _ = write!(field, "{:>7.3}", reading.amps);
        self.display.show_string(2, 1, &field);
        self.display.show_string(2, 8, "A    ");
        field.clear();
        let _ = write!(field, "{:>5.3}", reading.volts);
        self.display.show_string(4, 1, &field);
        self.display.show_string(4, 6, "V    ");
        self.display.show_string(1, 11, reading.range.label());

        self.passes = self.passes.saturating_add(1);
        if self.passes >= CURRENT_DETAIL_EVERY {
            self.passes = 0;
            telemetry::send_current_detail(
                &mut self.serial,
                reading.amps,
                reading.volts,
                reading.raw,
                self.sensor.zero_offset(),
            );
        }
    }

    /// Whether the zero calibration has succeeded.
    pub fn is_calibrated(&self) -> bool {
        self.phase == Phase::Measuring
    }

    /// Most recent successful measurement.
    pub fn last_reading(&self) -> Option<CurrentReading> {
        self.last
    }

    /// Whether the LED is on.
    pub fn led_lit(&self) -> bool {
        self.led.is_lit()
    }

    /// Telemetry sink.
    pub fn serial(&self) -> &S {
        &self.serial
    }

    /// Display sink.
    pub fn display(&self) -> &P {
        &self.display
    }

    /// Sensor driver.
    pub fn sensor_mut(&mut self) -> &mut CurrentSensor<'a, A, W> {
        &mut self.sensor
    }
}

/// Draw `text` across a whole row, blanking what it does not cover.
fn show_row<P: DisplaySink + ?Sized>(display: &mut P, row: u8, text: &str) {
    let mut field = Field::new();
    let _ = write!(field, "{text:<width$}", width = COLUMNS);
    display.show_string(row, 1, &field);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::context::EventFlag;
    use crate::current::RangeStatus;
    use crate::sampler::{ReadMode, Sampler};
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use platform::mocks::{
        DisplayOp, FakeClock, MockAdc, MockWait, RecordingDisplay, RecordingSerial,
    };

    type App<'a> = CurrentMonitorApp<'a, MockAdc, MockWait, RecordingSerial, RecordingDisplay, PinMock>;

    fn app<'a>(flag: &'a EventFlag, adc: MockAdc, led: &PinMock) -> App<'a> {
        let mut sampler = Sampler::new(adc, flag, MockWait::new());
        sampler.set_read_mode(ReadMode::Polling);
        CurrentMonitorApp::new(
            CurrentSensor::new(sampler),
            RecordingSerial::new(),
            RecordingDisplay::new(),
            led.clone(),
        )
    }

    fn texts_at(display: &RecordingDisplay, at_row: u8, at_column: u8) -> Vec<&str> {
        display
            .ops
            .iter()
            .filter_map(|op| match op {
                DisplayOp::Text { row, column, text } if *row == at_row && *column == at_column => {
                    Some(text.as_str())
                }
                _ => None,
            })
            .collect()
    }

    fn led_toggles(count: usize) -> PinMock {
        let transactions: Vec<PinTransaction> = (0..count)
            .map(|i| PinTransaction::set(if i % 2 == 0 { PinState::High } else { PinState::Low }))
            .collect();
        PinMock::new(&transactions)
    }

    /// Run through the window and a successful calibration at 5000 ms.
    fn calibrated<'a>(flag: &'a EventFlag, adc: MockAdc, led: &PinMock, clock: &FakeClock) -> App<'a> {
        let mut app = app(flag, adc, led);
        app.boot(clock);
        clock.advance(CURRENT_CALIBRATION_MS);
        app.poll(clock);
        assert!(app.is_calibrated());
        app
    }

    #[test]
    fn boot_opens_calibration_window() {
        let flag = EventFlag::new();
        let mut led = PinMock::new(&[]);
        let mut app = app(&flag, MockAdc::new(&[2048]), &led);
        app.boot(&FakeClock::new());

        assert_eq!(
            app.serial().lines,
            [
                "System ready - Current Measurement Active\r\n",
                "Starting zero calibration, please ensure no current flows through sensor\r\n",
            ]
        );
        assert_eq!(texts_at(app.display(), 4, 1), ["Wait 5 seconds.."]);
        assert!(!app.is_calibrated());
        led.done();
    }

    #[test]
    fn countdown_then_calibration_at_window_end() {
        let flag = EventFlag::new();
        let clock = FakeClock::new();
        // toggles at 1000 and 4999 ms
        let mut led = led_toggles(2);
        let mut app = app(&flag, MockAdc::new(&[2048]), &led);
        app.boot(&clock);

        app.poll(&clock);
        clock.advance(400);
        app.poll(&clock);
        clock.advance(600);
        app.poll(&clock);
        clock.advance(3999);
        app.poll(&clock);
        assert!(!app.is_calibrated(), "window still open at 4999 ms");
        assert_eq!(app.serial().lines.len(), 2, "nothing sent during the window");

        clock.advance(1);
        app.poll(&clock);
        assert!(app.is_calibrated());

        assert_eq!(
            texts_at(app.display(), 4, 1),
            [
                "Wait 5 seconds..",
                "Countdown: 5 s  ",
                "Countdown: 4 s  ",
                "Calibrating...  ",
                "                ",
            ]
        );
        assert_eq!(
            app.serial().lines[2..],
            [
                "Performing zero calibration...\r\n",
                "Zero calibration completed! New offset: 1.650V\r\n",
                "Previous offset was 1.650V, correction: 0.000V\r\n",
            ]
        );
        assert_eq!(texts_at(app.display(), 3, 1).last().copied(), Some("Voltage(V):"));
        led.done();
    }

    #[test]
    fn failed_calibration_holds_and_restarts_window() {
        let flag = EventFlag::new();
        let clock = FakeClock::new();
        // toggles at 5000, 7050 and 12049 ms
        let mut led = led_toggles(3);
        // idle output far from any plausible zero
        let mut app = app(&flag, MockAdc::new(&[3500]), &led);
        app.boot(&clock);

        clock.advance(CURRENT_CALIBRATION_MS);
        app.poll(&clock);
        assert!(!app.is_calibrated());
        assert_eq!(
            app.serial().lines[2..],
            ["Performing zero calibration...\r\n", "Calibration failed!\r\n"]
        );
        assert_eq!(texts_at(app.display(), 4, 1).last().copied(), Some("CAL FAILED!     "));
        assert_eq!(clock.total_delay_ms(), 50 + CURRENT_RETRY_HOLD_MS);

        // a fresh window starts after the hold
        app.poll(&clock);
        assert_eq!(texts_at(app.display(), 4, 1).last().copied(), Some("Countdown: 5 s  "));
        clock.advance(CURRENT_CALIBRATION_MS - 1);
        app.poll(&clock);
        assert!(!app.is_calibrated());
        assert_eq!(app.serial().lines.len(), 4);
        led.done();
    }

    #[test]
    fn measurement_shows_current_voltage_and_status() {
        let flag = EventFlag::new();
        let clock = FakeClock::new();
        let mut led = led_toggles(1);
        let mut app = calibrated(&flag, MockAdc::new(&[2048]), &led, &clock);

        clock.advance(99);
        app.poll(&clock);
        assert!(app.last_reading().is_none(), "first measurement one interval after calibration");
        clock.advance(1);
        app.poll(&clock);

        let reading = app.last_reading().unwrap();
        assert_eq!(reading.raw, 2048);
        assert_eq!(reading.amps, 0.0);
        assert_eq!(reading.range, RangeStatus::Ok);
        assert_eq!(texts_at(app.display(), 2, 1).last().copied(), Some("  0.000"));
        assert_eq!(texts_at(app.display(), 2, 8), ["A    "]);
        assert_eq!(texts_at(app.display(), 4, 1).last().copied(), Some("1.650"));
        assert_eq!(texts_at(app.display(), 1, 11), ["OK  "]);
        led.done();
    }

    #[test]
    fn out_of_range_reading_is_flagged_high() {
        let flag = EventFlag::new();
        let clock = FakeClock::new();
        let mut led = led_toggles(1);
        // 50 calibration reads at mid-scale, then the output pinned high
        let mut results = [2048u16; 51];
        results[50] = 4095;
        let mut app = calibrated(&flag, MockAdc::new(&results), &led, &clock);

        clock.advance(CURRENT_TASK_MS);
        app.poll(&clock);
        let reading = app.last_reading().unwrap();
        assert_eq!(reading.range, RangeStatus::OverRange);
        assert!(reading.amps > 16.0);
        assert_eq!(texts_at(app.display(), 1, 11), ["HIGH"]);
        assert_eq!(texts_at(app.display(), 2, 1).last().copied(), Some(" 16.496"));
        led.done();
    }

    #[test]
    fn detail_line_every_eleventh_measurement() {
        let flag = EventFlag::new();
        let clock = FakeClock::new();
        // each pass takes 100 ms plus 10 ms of averaging: toggles at
        // 5000, 5590, 6140, 6690 and 7240 ms
        let mut led = led_toggles(5);
        let mut app = calibrated(&flag, MockAdc::new(&[2048]), &led, &clock);
        let boot_lines = app.serial().lines.len();

        let mut details = Vec::<usize>::new();
        for pass in 1..=22 {
            clock.advance(CURRENT_TASK_MS);
            app.poll(&clock);
            if app.serial().lines.len() > boot_lines + details.len() {
                details.push(pass);
            }
        }
        assert_eq!(details, [11, 22]);
        assert_eq!(
            app.serial().lines.last().unwrap(),
            "I=0.000A(avg), V=1.650V, ADC=2048, Offset=1.650V\r\n"
        );
        led.done();
    }

    #[test]
    fn read_failure_shows_error_and_reports() {
        let flag = EventFlag::new();
        let clock = FakeClock::new();
        let mut led = led_toggles(1);
        let mut adc = MockAdc::new(&[2048]);
        // calibration reads succeed, the next measurement's reads never complete
        let mut pattern = [false; 60];
        pattern[50..].fill(true);
        adc.stall_conversions(&pattern);
        let mut app = calibrated(&flag, adc, &led, &clock);

        clock.advance(CURRENT_TASK_MS);
        app.poll(&clock);
        assert!(app.last_reading().is_none());
        assert_eq!(texts_at(app.display(), 2, 1).last().copied(), Some("ERROR   "));
        assert_eq!(texts_at(app.display(), 4, 1).last().copied(), Some("CHECK   "));
        assert_eq!(app.serial().lines.last().unwrap(), "Sensor reading error!\r\n");
        led.done();
    }
}
