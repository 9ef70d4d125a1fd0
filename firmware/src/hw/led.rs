// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Status LEDs. LD1..LD3 on the Nucleo-144 boards are wired active-high.

use stm32f7xx_hal::gpio::{self, Output, PinState, PushPull};

/// LED on any push-pull GPIO that remembers its last state.
pub struct Led<const P: char, const N: u8> {
    pin: gpio::Pin<P, N, Output<PushPull>>,
    is_on: bool,
}

impl<const P: char, const N: u8> Led<P, N> {
    /// Create an LED wrapper, initializing it to OFF.
    pub fn new(pin: gpio::Pin<P, N, Output<PushPull>>) -> Self {
        let mut led = Self { pin, is_on: false };
        led.set(false);
        led
    }

    /// Drive the LED logically ON (true) or OFF (false).
    pub fn set(&mut self, on: bool) {
        self.pin
            .set_state(if on { PinState::High } else { PinState::Low });
        self.is_on = on;
    }

    #[inline]
    pub fn on(&mut self) {
        self.set(true);
    }

    #[inline]
    pub fn off(&mut self) {
        self.set(false);
    }

    pub fn toggle(&mut self) {
        self.set(!self.is_on);
    }
}
