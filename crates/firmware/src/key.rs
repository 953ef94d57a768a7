//! User key and status LED
//!
//! The key interrupt only raises [`Shared::key`](crate::context::Shared);
//! [`KeyHandler::process`] consumes it from the main loop, debounced, and
//! toggles the LED between slow and fast blinking.

use embedded_hal::digital::OutputPin;

use crate::config::{KEY_DEBOUNCE_MS, LED_FAST_MS, LED_SLOW_MS};
use crate::context::EventFlag;

/// Debounced key press to blink-mode toggle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyHandler {
    last_accepted_ms: u32,
    fast_mode: bool,
}

impl KeyHandler {
    /// Slow mode, no press seen.
    pub const fn new() -> Self {
        Self {
            last_accepted_ms: 0,
            fast_mode: false,
        }
    }

    /// Consume a pending press. Presses within 50 ms of the last accepted
    /// one are dropped.
    ///
    /// Returns `true` when the mode toggled.
    pub fn process(&mut self, pressed: &EventFlag, now_ms: u32) -> bool {
        if !pressed.take() {
            return false;
        }
        if now_ms.wrapping_sub(self.last_accepted_ms) < KEY_DEBOUNCE_MS {
            return false;
        }
        self.fast_mode = !self.fast_mode;
        self.last_accepted_ms = now_ms;
        true
    }

    /// Whether fast blinking is selected.
    pub fn fast_mode(&self) -> bool {
        self.fast_mode
    }

    /// LED half-period for the current mode (ms).
    pub fn led_period_ms(&self) -> u32 {
        if self.fast_mode {
            LED_FAST_MS
        } else {
            LED_SLOW_MS
        }
    }
}

/// Square-wave LED driver.
pub struct LedBlinker<P> {
    pin: P,
    lit: bool,
    last_toggle_ms: u32,
}

impl<P: OutputPin> LedBlinker<P> {
    /// LED starts off; the pin is not touched until the first toggle.
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            lit: false,
            last_toggle_ms: 0,
        }
    }

    /// Toggle if `period_ms` has passed since the last toggle.
    pub fn update(&mut self, now_ms: u32, period_ms: u32) -> Result<bool, P::Error> {
        if now_ms.wrapping_sub(self.last_toggle_ms) < period_ms {
            return Ok(false);
        }
        if self.lit {
            self.pin.set_low()?;
        } else {
            self.pin.set_high()?;
        }
        self.lit = !self.lit;
        self.last_toggle_ms = now_ms;
        Ok(true)
    }

    /// Whether the LED is currently on.
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Hand the pin back.
    pub fn release(self) -> P {
        self.pin
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    #[test]
    fn press_toggles_mode_and_period() {
        let flag = EventFlag::new();
        let mut key = KeyHandler::new();
        assert_eq!(key.led_period_ms(), 500);
        flag.signal();
        assert!(key.process(&flag, 1000));
        assert!(key.fast_mode());
        assert_eq!(key.led_period_ms(), 100);
        assert!(!flag.is_set());
    }

    #[test]
    fn bounce_inside_window_is_consumed_but_ignored() {
        let flag = EventFlag::new();
        let mut key = KeyHandler::new();
        flag.signal();
        assert!(key.process(&flag, 1000));
        flag.signal();
        assert!(!key.process(&flag, 1049));
        assert!(!flag.is_set());
        assert!(key.fast_mode());
        flag.signal();
        assert!(key.process(&flag, 1050));
        assert!(!key.fast_mode());
    }

    #[test]
    fn no_press_no_change() {
        let flag = EventFlag::new();
        let mut key = KeyHandler::new();
        assert!(!key.process(&flag, 5000));
        assert!(!key.fast_mode());
    }

    #[test]
    fn blinker_toggles_each_period() {
        let pin = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let mut led = LedBlinker::new(pin);
        assert!(!led.update(499, 500).unwrap());
        assert!(led.update(500, 500).unwrap());
        assert!(led.is_lit());
        assert!(!led.update(599, 100).unwrap());
        assert!(led.update(600, 100).unwrap());
        assert!(!led.is_lit());
        led.release().done();
    }
}
