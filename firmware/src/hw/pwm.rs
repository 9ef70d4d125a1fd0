// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Two-channel PWM on TIM4 using direct PAC register access.
//!
//! CH1 (PD12) and CH2 (PD13) drive the H-bridge IN1/IN2 inputs. Edge-aligned PWM mode 1 with
//! preload, so a new duty cycle takes effect at the next period boundary.

use stm32f7xx_hal::{
    gpio::{gpiod, Alternate},
    pac,
    rcc::Clocks,
};

/// Output channel.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PwmChannel {
    Ch1,
    Ch2,
}

/// OCxM value for PWM mode 1.
const PWM_MODE_1: u8 = 0b110;

/// IN1/IN2 on TIM4_CH1/TIM4_CH2.
pub type PwmPins = (gpiod::PD12<Alternate<2>>, gpiod::PD13<Alternate<2>>);

pub struct Pwm {
    tim: pac::TIM4,
    _pins: PwmPins,
    period: u16,
}

impl Pwm {
    /// Configure TIM4 CH1/CH2 at `freq_hz`, both outputs at 0 % duty, counter running.
    pub fn tim4(tim4: pac::TIM4, pins: PwmPins, clocks: &Clocks, freq_hz: u32) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim4en().set_bit());
        rcc.apb1rstr.modify(|_, w| w.tim4rst().set_bit());
        rcc.apb1rstr.modify(|_, w| w.tim4rst().clear_bit());

        let tim = tim4;

        // Disable counter while configuring
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        // Timer prescaler and period for the requested frequency
        let ticks = clocks.timclk1().raw() / freq_hz.max(1);
        let psc = (ticks - 1) / (1 << 16);
        let period = (ticks / (psc + 1)) as u16;
        tim.psc.write(|w| unsafe { w.bits(psc) });
        tim.arr.write(|w| unsafe { w.bits(period as u32) });

        // PWM mode 1 with preload on CH1 and CH2
        tim.ccmr1_output().modify(|_, w| unsafe {
            w.oc1m()
                .bits(PWM_MODE_1)
                .oc1pe()
                .set_bit()
                .oc2m()
                .bits(PWM_MODE_1)
                .oc2pe()
                .set_bit()
        });

        tim.ccr1.write(|w| unsafe { w.bits(0) });
        tim.ccr2.write(|w| unsafe { w.bits(0) });

        // Active high, outputs enabled
        tim.ccer.modify(|_, w| {
            w.cc1p()
                .clear_bit()
                .cc2p()
                .clear_bit()
                .cc1e()
                .set_bit()
                .cc2e()
                .set_bit()
        });

        // Load the shadow registers and start
        tim.cr1.modify(|_, w| w.arpe().set_bit());
        tim.egr.write(|w| w.ug().set_bit());
        tim.cr1.modify(|_, w| w.cen().set_bit());

        Self {
            tim,
            _pins: pins,
            period,
        }
    }

    /// Set the duty cycle of `channel` as a fraction in `[0.0, 1.0]`.
    pub fn set_duty(&mut self, channel: PwmChannel, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        let ccr = (fraction * self.period as f32) as u32;
        match channel {
            PwmChannel::Ch1 => self.tim.ccr1.write(|w| unsafe { w.bits(ccr) }),
            PwmChannel::Ch2 => self.tim.ccr2.write(|w| unsafe { w.bits(ccr) }),
        }
    }

    /// Both channels low.
    #[inline]
    pub fn off(&mut self) {
        self.set_duty(PwmChannel::Ch1, 0.0);
        self.set_duty(PwmChannel::Ch2, 0.0);
    }
}
