//! Encoder-controlled DAC with ADC loop-back
//!
//! The rotary encoder sets a static DAC level in 0.1 V steps; the ADC reads
//! the level back and streams it as telemetry; the display shows both.
//!
//! | Task    | Interval | Work                                         |
//! |---------|----------|----------------------------------------------|
//! | encoder | 5 ms     | on change: drive DAC, report encoder event   |
//! | adc     | 50 ms    | blocking read, send simple voltage line      |
//! | display | 100 ms   | one of three fields per pass, round-robin    |

use platform::{AdcPeripheral, Clock, DacPeripheral, DisplaySink, SerialSink, WaitForInterrupt};

use crate::config::{ADC_TASK_MS, DISPLAY_TASK_MS, ENCODER_TASK_MS};
use crate::context::Shared;
use crate::encoder::{self, EncoderState};
use crate::sampler::Sampler;
use crate::scheduler::{Rotation, Scheduler};
use crate::telemetry;

const TASK_COUNT: usize = 3;

/// Boot labels: (row, column, text).
pub const LABELS: [(u8, u8, &str); 4] = [
    (1, 1, "Encoder DAC"),
    (2, 1, platform::config::board_name()),
    (3, 1, "V: 0.000 V"),
    (4, 1, "Count: 16"),
];

/// Encoder → DAC → ADC bench loop.
pub struct EncoderDacApp<'a, A, W, D, S, P> {
    shared: &'a Shared,
    sampler: Sampler<'a, A, W>,
    dac: D,
    serial: S,
    display: P,
    scheduler: Scheduler<TASK_COUNT>,
    display_step: Rotation<3>,
    voltage: f32,
    samples: u32,
}

impl<'a, A, W, D, S, P> EncoderDacApp<'a, A, W, D, S, P>
where
    A: AdcPeripheral,
    W: WaitForInterrupt,
    D: DacPeripheral,
    S: SerialSink,
    P: DisplaySink,
{
    /// Assemble the application. Nothing is driven until [`boot`](Self::boot).
    pub fn new(shared: &'a Shared, sampler: Sampler<'a, A, W>, dac: D, serial: S, display: P) -> Self {
        Self {
            shared,
            sampler,
            dac,
            serial,
            display,
            scheduler: Scheduler::new([ENCODER_TASK_MS, ADC_TASK_MS, DISPLAY_TASK_MS]),
            display_step: Rotation::new(),
            voltage: 0.0,
            samples: 0,
        }
    }

    /// Draw the labels, arm the ADC and drive the boot output level.
    ///
    /// The quadrature decoder is initialized by the caller, which owns the
    /// encoder lines for the edge interrupt.
    pub fn boot(&mut self) {
        for (row, column, text) in LABELS {
            self.display.show_string(row, column, text);
        }
        self.sampler.init();
        let state = encoder::update_output(&self.shared.encoder, &mut self.dac);
        self.serial.send_str("System ready - Encoder DAC control active\r\n");
        telemetry::send_initial_state(&mut self.serial, state.position, state.voltage);
        #[cfg(feature = "defmt")]
        defmt::info!("encoder-dac: boot at position {}", state.position);
    }

    /// One main-loop pass.
    pub fn poll<C: Clock + ?Sized>(&mut self, clock: &C) {
        let mut due = [false; TASK_COUNT];
        self.scheduler.run_pass(clock, |task| {
            if let Some(flag) = due.get_mut(task) {
                *flag = true;
            }
        });
        let [encoder_due, adc_due, display_due] = due;
        if encoder_due {
            self.encoder_task();
        }
        if adc_due {
            self.adc_task();
        }
        if display_due {
            self.display_task();
        }
    }

    fn encoder_task(&mut self) {
        if !self.shared.encoder.take_changed() {
            return;
        }
        let state = encoder::update_output(&self.shared.encoder, &mut self.dac);
        telemetry::send_encoder_event(&mut self.serial, state.position, state.voltage, state.code);
    }

    fn adc_task(&mut self) {
        self.voltage = self.sampler.read_voltage();
        telemetry::send_adc_simple(&mut self.serial, self.voltage);
        self.samples = self.samples.wrapping_add(1);
    }

    fn display_task(&mut self) {
        let volts = self.voltage.max(0.0);
        let whole = volts as u32;
        let millis = ((volts - whole as f32) * 1000.0) as u32;
        match self.display_step.advance() {
            0 => self.display.show_num(3, 4, whole, 1),
            1 => self.display.show_num(3, 6, millis, 3),
            _ => {
                let position = self.shared.encoder.position();
                self.display
                    .show_num(4, 8, u32::try_from(position).unwrap_or(0), 2);
            }
        }
    }

    /// Last voltage read back by the ADC.
    pub fn voltage(&self) -> f32 {
        self.voltage
    }

    /// ADC samples taken since boot.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Encoder output as last computed.
    pub fn encoder(&self) -> EncoderState {
        self.shared.encoder.snapshot()
    }

    /// Telemetry sink.
    pub fn serial(&self) -> &S {
        &self.serial
    }

    /// Display sink.
    pub fn display(&self) -> &P {
        &self.display
    }

    /// Static-output DAC.
    pub fn dac(&self) -> &D {
        &self.dac
    }
}
