//! Quadrature encoder decoding
//!
//! Phase A raises a falling-edge interrupt; phase B is the direction
//! reference. After a short settling window the handler re-reads A and, if
//! it is still low, counts down when B is low and up when B is high. The
//! position is clamped to [`ENCODER_MIN`]..=[`ENCODER_MAX`] and maps
//! linearly onto a commanded output voltage and a 12-bit DAC code.
//!
//! Phase B's own interrupt, when enabled, is only acknowledged. Counting on
//! both phases would double every detent.
//!
//! The decoder interrupt is the producer of [`EncoderState`]; the main loop
//! consumes the change flag through [`EncoderCell::take_changed`].

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use platform::config::DAC_CODE_MAX;
use platform::{DacPeripheral, EdgeInterrupt, InterruptMode};

use crate::config::{
    ENCODER_DEBOUNCE_US, ENCODER_DEFAULT, ENCODER_MAX, ENCODER_MIN, ENCODER_STEP_VOLTS,
    OUTPUT_MAX_VOLTS, OUTPUT_MIN_VOLTS,
};

// ─── Pure mappings ───────────────────────────────────────────────────────────

/// Clamp any position into the encoder's range.
pub fn clamp_position(position: i32) -> i16 {
    let clamped = position.clamp(i32::from(ENCODER_MIN), i32::from(ENCODER_MAX));
    i16::try_from(clamped).unwrap_or(ENCODER_DEFAULT)
}

/// Commanded voltage for a position: `position * STEP`, clamped.
pub fn position_to_voltage(position: i16) -> f32 {
    (f32::from(position) * ENCODER_STEP_VOLTS).clamp(OUTPUT_MIN_VOLTS, OUTPUT_MAX_VOLTS)
}

/// DAC code for a voltage, truncated toward zero.
///
/// `floor(v / 3.3 * 4095)` after clamping `v` to the output range.
pub fn voltage_to_code(voltage: f32) -> u16 {
    let volts = voltage.clamp(OUTPUT_MIN_VOLTS, OUTPUT_MAX_VOLTS);
    // Truncating cast; the clamp keeps the product within 0..=4095.
    let code = (volts / OUTPUT_MAX_VOLTS * f32::from(DAC_CODE_MAX)) as u16;
    code.min(DAC_CODE_MAX)
}

// ─── Shared state ────────────────────────────────────────────────────────────

/// Logical encoder position and its derived output.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderState {
    /// Current position, always within the encoder range.
    pub position: i16,
    /// Position at the last reported change.
    pub last_position: i16,
    /// Set on change by the decoder or by an override; cleared by the consumer.
    pub changed: bool,
    /// Commanded output voltage.
    pub voltage: f32,
    /// DAC code for `voltage`.
    pub code: u16,
}

impl EncoderState {
    /// Power-on state: position 16, 1.6 V, code 1985, no pending change.
    pub const BOOT: Self = Self {
        position: ENCODER_DEFAULT,
        last_position: ENCODER_DEFAULT,
        changed: false,
        voltage: 1.6,
        code: 1985,
    };

    /// State resting at `position` (clamped) with derived values filled in.
    pub fn at(position: i16) -> Self {
        let position = clamp_position(i32::from(position));
        let voltage = position_to_voltage(position);
        Self {
            position,
            last_position: position,
            changed: false,
            voltage,
            code: voltage_to_code(voltage),
        }
    }

    fn recompute(&mut self) {
        self.voltage = position_to_voltage(self.position);
        self.code = voltage_to_code(self.voltage);
    }
}

/// [`EncoderState`] shared between the edge interrupt and the main loop.
pub struct EncoderCell {
    state: Mutex<CriticalSectionRawMutex, Cell<EncoderState>>,
}

impl EncoderCell {
    /// Cell holding [`EncoderState::BOOT`].
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(EncoderState::BOOT)),
        }
    }

    fn update<R>(&self, f: impl FnOnce(&mut EncoderState) -> R) -> R {
        self.state.lock(|cell| {
            let mut state = cell.get();
            let out = f(&mut state);
            cell.set(state);
            out
        })
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> EncoderState {
        self.state.lock(Cell::get)
    }

    /// Latest clamped position.
    pub fn position(&self) -> i16 {
        self.snapshot().position
    }

    /// Whether the position changed since the last call. Clears the flag.
    pub fn take_changed(&self) -> bool {
        self.update(|state| core::mem::replace(&mut state.changed, false))
    }

    /// Apply one decoded detent (interrupt side).
    ///
    /// Returns `true` when the clamped position moved.
    pub fn step(&self, delta: i16) -> bool {
        self.update(|state| {
            state.position =
                clamp_position(i32::from(state.position).saturating_add(i32::from(delta)));
            if state.position == state.last_position {
                return false;
            }
            state.changed = true;
            state.last_position = state.position;
            state.recompute();
            true
        })
    }

    /// Programmatic override: clamp, force a change, recompute.
    ///
    /// `last_position` is left alone, so the next detent is compared against
    /// the last *decoded* position and reports a change even when it clamps
    /// onto the overridden value.
    pub fn set_position(&self, position: i16) {
        self.update(|state| {
            state.position = clamp_position(i32::from(position));
            state.changed = true;
            state.recompute();
        });
    }

    /// Return position and `last_position` to zero and report a change.
    pub fn reset(&self) {
        self.update(|state| {
            state.position = 0;
            state.last_position = 0;
            state.changed = true;
            state.recompute();
        });
    }

    /// Re-derive voltage and code from the current position.
    pub fn refresh(&self) -> EncoderState {
        self.update(|state| {
            state.recompute();
            *state
        })
    }

    /// Restore [`EncoderState::at`] `position` without reporting a change.
    pub fn restore(&self, position: i16) {
        self.state.lock(|cell| cell.set(EncoderState::at(position)));
    }
}

impl Default for EncoderCell {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Decoder ─────────────────────────────────────────────────────────────────

/// Edge-interrupt quadrature decoder.
///
/// Owns both phase lines and a short busy-wait delay; publishes into an
/// [`EncoderCell`] owned elsewhere.
pub struct QuadratureDecoder<'a, A, B, D> {
    phase_a: A,
    phase_b: B,
    delay: D,
    state: &'a EncoderCell,
}

impl<'a, A, B, D> QuadratureDecoder<'a, A, B, D>
where
    A: InputPin + EdgeInterrupt,
    B: InputPin + EdgeInterrupt,
    D: DelayNs,
{
    /// Take ownership of the phase lines.
    pub fn new(phase_a: A, phase_b: B, delay: D, state: &'a EncoderCell) -> Self {
        Self {
            phase_a,
            phase_b,
            delay,
            state,
        }
    }

    /// Reset the position to its default, drop stale edges, arm phase A.
    pub fn init(&mut self) {
        self.state.restore(ENCODER_DEFAULT);
        self.phase_a.clear_interrupt();
        self.phase_b.clear_interrupt();
        self.phase_a.enable_interrupt(InterruptMode::FallingEdge);
        #[cfg(feature = "defmt")]
        defmt::info!("encoder: armed at position {}", ENCODER_DEFAULT);
    }

    /// Phase A falling-edge handler.
    pub fn on_phase_a_edge(&mut self) {
        self.delay.delay_us(ENCODER_DEBOUNCE_US);
        // A glitch shorter than the settling window reads high again here.
        if matches!(self.phase_a.is_low(), Ok(true)) {
            match self.phase_b.is_low() {
                Ok(true) => {
                    self.state.step(-1);
                }
                Ok(false) => {
                    self.state.step(1);
                }
                Err(_) => {}
            }
        }
        self.phase_a.clear_interrupt();
    }

    /// Phase B edge handler: acknowledge only.
    pub fn on_phase_b_edge(&mut self) {
        self.phase_b.clear_interrupt();
    }

    /// Shared state this decoder publishes into.
    pub fn state(&self) -> &'a EncoderCell {
        self.state
    }

    /// Stop decoding and hand the lines back.
    pub fn release(mut self) -> (A, B) {
        self.phase_a.disable_interrupt();
        (self.phase_a, self.phase_b)
    }
}

/// Recompute the derived output and drive it as a static DAC level.
///
/// Returns the state that was written.
pub fn update_output<DAC: DacPeripheral>(cell: &EncoderCell, dac: &mut DAC) -> EncoderState {
    let state = cell.refresh();
    dac.output(state.code);
    state
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use platform::mocks::{MockDac, MockLine};
    use proptest::prelude::*;

    struct Rig<'a> {
        a: MockLine,
        b: MockLine,
        decoder: QuadratureDecoder<'a, MockLine, MockLine, NoopDelay>,
    }

    fn rig(cell: &EncoderCell) -> Rig<'_> {
        let a = MockLine::new(true);
        let b = MockLine::new(true);
        let mut decoder = QuadratureDecoder::new(a.clone(), b.clone(), NoopDelay::new(), cell);
        decoder.init();
        Rig { a, b, decoder }
    }

    /// Falling edge on A with B at `b_high`; A stays low through the window.
    fn detent(rig: &mut Rig<'_>, b_high: bool) {
        rig.b.set_level(b_high);
        rig.a.set_level(false);
        rig.decoder.on_phase_a_edge();
        rig.a.set_level(true);
    }

    #[test]
    fn boot_constant_matches_derived_mapping() {
        assert_eq!(EncoderState::BOOT, EncoderState::at(ENCODER_DEFAULT));
    }

    #[test]
    fn position_16_is_1v6_and_code_1985() {
        let v = position_to_voltage(16);
        assert!((v - 1.6).abs() < 1e-6);
        assert_eq!(voltage_to_code(v), 1985);
    }

    #[test]
    fn voltage_mapping_truncates() {
        // 1.0 / 3.3 * 4095 = 1240.9 -> 1240
        assert_eq!(voltage_to_code(1.0), 1240);
        assert_eq!(voltage_to_code(0.0), 0);
        assert_eq!(voltage_to_code(3.3), 4095);
    }

    #[test]
    fn voltage_mapping_clamps_out_of_range() {
        assert_eq!(voltage_to_code(-1.0), 0);
        assert_eq!(voltage_to_code(10.0), 4095);
        assert_eq!(position_to_voltage(40), 3.3);
    }

    #[test]
    fn init_arms_phase_a_falling_edge() {
        let cell = EncoderCell::new();
        let r = rig(&cell);
        assert_eq!(r.a.interrupt_mode(), Some(InterruptMode::FallingEdge));
        assert_eq!(r.b.interrupt_mode(), None);
        assert_eq!(cell.position(), 16);
        assert!(!cell.take_changed());
    }

    #[test]
    fn b_high_counts_up_and_b_low_counts_down() {
        let cell = EncoderCell::new();
        let mut r = rig(&cell);
        detent(&mut r, true);
        assert_eq!(cell.position(), 17);
        detent(&mut r, false);
        detent(&mut r, false);
        assert_eq!(cell.position(), 15);
    }

    #[test]
    fn edge_is_ignored_when_phase_a_bounced_high() {
        let cell = EncoderCell::new();
        let mut r = rig(&cell);
        r.a.set_level(true);
        r.decoder.on_phase_a_edge();
        assert_eq!(cell.position(), 16);
        assert!(!cell.take_changed());
        assert_eq!(r.a.clears(), 2, "init clear + handler ack");
    }

    #[test]
    fn phase_b_edge_only_acknowledges() {
        let cell = EncoderCell::new();
        let mut r = rig(&cell);
        r.decoder.on_phase_b_edge();
        assert_eq!(r.b.clears(), 2);
        assert_eq!(cell.position(), 16);
    }

    #[test]
    fn is_changed_reports_once_per_change() {
        let cell = EncoderCell::new();
        let mut r = rig(&cell);
        detent(&mut r, true);
        assert!(cell.take_changed());
        assert!(!cell.take_changed());
    }

    #[test]
    fn clamped_step_at_limit_is_not_a_change() {
        let cell = EncoderCell::new();
        let mut r = rig(&cell);
        for _ in 0..(ENCODER_MAX - ENCODER_DEFAULT) {
            detent(&mut r, true);
        }
        assert!(cell.take_changed());
        detent(&mut r, true);
        assert_eq!(cell.position(), ENCODER_MAX);
        assert!(!cell.take_changed());
    }

    #[test]
    fn set_position_keeps_last_decoded_position() {
        let cell = EncoderCell::new();
        let mut r = rig(&cell);
        cell.set_position(ENCODER_MAX);
        assert!(cell.take_changed());
        assert_eq!(cell.snapshot().last_position, ENCODER_DEFAULT);
        // clamps onto the override but still differs from the last decoded value
        detent(&mut r, true);
        assert_eq!(cell.position(), ENCODER_MAX);
        assert!(cell.take_changed());
        detent(&mut r, true);
        assert!(!cell.take_changed());
    }

    #[test]
    fn reset_forces_change_at_zero() {
        let cell = EncoderCell::new();
        cell.reset();
        let state = cell.snapshot();
        assert_eq!(state.position, 0);
        assert_eq!(state.last_position, 0);
        assert_eq!(state.code, 0);
        assert!(cell.take_changed());
    }

    #[test]
    fn step_updates_derived_values() {
        let cell = EncoderCell::new();
        assert!(cell.step(4));
        let state = cell.snapshot();
        assert_eq!(state.position, 20);
        assert!((state.voltage - 2.0).abs() < 1e-6);
        assert_eq!(state.code, voltage_to_code(state.voltage));
    }

    #[test]
    fn update_output_writes_current_code() {
        let cell = EncoderCell::new();
        let mut dac: MockDac = MockDac::new();
        let state = update_output(&cell, &mut dac);
        assert_eq!(state.code, 1985);
        assert_eq!(dac.last_output(), Some(1985));
    }

    #[test]
    fn release_disarms_phase_a() {
        let cell = EncoderCell::new();
        let r = rig(&cell);
        let (a, _b) = r.decoder.release();
        assert_eq!(a.interrupt_mode(), None);
    }

    proptest! {
        #[test]
        fn set_position_round_trips_clamped(p in any::<i16>()) {
            let cell = EncoderCell::new();
            cell.set_position(p);
            let expected = p.clamp(ENCODER_MIN, ENCODER_MAX);
            prop_assert_eq!(cell.position(), expected);
            prop_assert!(cell.take_changed());
        }

        #[test]
        fn clamp_stays_in_range(p in any::<i32>()) {
            let c = clamp_position(p);
            prop_assert!((ENCODER_MIN..=ENCODER_MAX).contains(&c));
        }

        #[test]
        fn code_never_exceeds_full_scale(v in -10.0f32..10.0) {
            prop_assert!(voltage_to_code(v) <= DAC_CODE_MAX);
        }

        #[test]
        fn random_walk_stays_in_range(steps in proptest::collection::vec(any::<bool>(), 0..120)) {
            let cell = EncoderCell::new();
            for up in steps {
                cell.step(if up { 1 } else { -1 });
                let pos = cell.position();
                prop_assert!((ENCODER_MIN..=ENCODER_MAX).contains(&pos));
            }
        }
    }
}
