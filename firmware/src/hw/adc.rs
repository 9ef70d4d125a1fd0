// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! ADC1 single-channel reads using direct PAC register access.
//!
//! Used for the DRV8873 IPROPI current-sense output: 12-bit, right aligned, software triggered,
//! one blocking conversion per read.

use stm32f7xx_hal::pac;

/// Longest sample time, 480 cycles. IPROPI is a high-impedance source.
const SMP_480: u8 = 0b111;

pub struct Adc {
    adc: pac::ADC1,
}

impl Adc {
    /// Power up ADC1 and select `channel` (0..=9 use SMPR2, 10..=18 use SMPR1).
    pub fn adc1(adc1: pac::ADC1, channel: u8) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb2enr.modify(|_, w| w.adc1en().set_bit());

        // ADC prescaler: PCLK2 / 4
        let common = unsafe { &*pac::ADC_COMMON::ptr() };
        common.ccr.modify(|_, w| w.adcpre().div4());

        let adc = adc1;

        // Power off to configure
        adc.cr2.modify(|_, w| w.adon().clear_bit());

        // 12-bit, right-aligned, software trigger
        adc.cr1.modify(|_, w| w.res().bits(0b00));
        adc.cr2.modify(|_, w| {
            w.cont().clear_bit();
            w.align().right();
            w.exten().disabled();
            w
        });

        // Sample time for the selected channel, 3 bits per channel
        let channel = channel.min(18);
        if channel <= 9 {
            let shift = 3 * channel as u32;
            adc.smpr2.modify(|r, w| unsafe {
                w.bits((r.bits() & !(0b111 << shift)) | ((SMP_480 as u32) << shift))
            });
        } else {
            let shift = 3 * (channel as u32 - 10);
            adc.smpr1.modify(|r, w| unsafe {
                w.bits((r.bits() & !(0b111 << shift)) | ((SMP_480 as u32) << shift))
            });
        }

        // Sequence length = 1 conversion, on `channel`
        adc.sqr1.modify(|_, w| w.l().bits(0));
        adc.sqr3.modify(|_, w| unsafe { w.sq1().bits(channel) });

        // Power on
        adc.cr2.modify(|_, w| w.adon().set_bit());

        Self { adc }
    }

    /// One blocking conversion.
    pub fn read(&mut self) -> u16 {
        self.adc.cr2.modify(|_, w| w.swstart().set_bit());
        while self.adc.sr.read().eoc().bit_is_clear() {}
        self.adc.dr.read().data().bits()
    }

    /// Mean of `samples` conversions.
    pub fn read_average(&mut self, samples: u16) -> u16 {
        let samples = samples.max(1);
        let sum: u32 = (0..samples).map(|_| self.read() as u32).sum();
        (sum / samples as u32) as u16
    }
}
