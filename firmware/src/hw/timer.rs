// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Periodic update interrupt from TIM6 using direct PAC register access.
//!
//! TIM6 is a basic timer with nothing but a prescaler, an auto-reload and an update event, which
//! is all the control cadence needs. The prescaler brings the timer clock down to 1 MHz so the
//! auto-reload holds the period in microseconds.

use dcservo::control::Cadence;
use stm32f7xx_hal::{pac, rcc::Clocks};

/// Counter rate after the prescaler.
const TICK_HZ: u32 = 1_000_000;

pub struct ControlTimer {
    tim: pac::TIM6,
}

impl ControlTimer {
    /// Configure TIM6 to raise `TIM6_DAC` once per `cadence` period. The counter is left stopped.
    pub fn tim6(tim6: pac::TIM6, clocks: &Clocks, cadence: Cadence) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim6en().set_bit());
        rcc.apb1rstr.modify(|_, w| w.tim6rst().set_bit());
        rcc.apb1rstr.modify(|_, w| w.tim6rst().clear_bit());

        let tim = tim6;

        // Disable counter while configuring
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        let psc = clocks.timclk1().raw() / TICK_HZ - 1;
        // 16-bit auto-reload: periods up to 65 ms
        let arr = cadence.period_us().clamp(1, 0x1_0000) - 1;
        tim.psc.write(|w| unsafe { w.bits(psc) });
        tim.arr.write(|w| unsafe { w.bits(arr) });

        // Load PSC/ARR without raising an interrupt for it
        tim.cr1.modify(|_, w| w.urs().set_bit().arpe().set_bit());
        tim.egr.write(|w| w.ug().set_bit());
        tim.sr.modify(|_, w| w.uif().clear_bit());

        tim.dier.modify(|_, w| w.uie().set_bit());

        Self { tim }
    }

    /// Start counting. Unmask `TIM6_DAC` in the NVIC first.
    #[inline]
    pub fn start(&mut self) {
        self.tim.cnt.write(|w| unsafe { w.bits(0) });
        self.tim.cr1.modify(|_, w| w.cen().set_bit());
    }

    #[inline]
    pub fn stop(&mut self) {
        self.tim.cr1.modify(|_, w| w.cen().clear_bit());
    }
}

/// Acknowledge a pending update event. Returns `false` when `TIM6_DAC` was entered for another
/// reason, such as a software pend.
#[inline]
pub fn take_update() -> bool {
    let tim = unsafe { &*pac::TIM6::ptr() };
    if tim.sr.read().uif().bit_is_clear() {
        return false;
    }
    tim.sr.modify(|_, w| w.uif().clear_bit());
    true
}
