// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Quadrature encoder inputs on EXTI lines.
//!
//! Channel A sits on PD3 (EXTI3) and channel B on PD4 (EXTI4), each with its own vector. Both lines
//! trigger on rising and falling edges. The handlers clear the pending bit, sample both pins from
//! GPIOD's input register and hand the levels to the decoder.

use dcservo::encoder::{Channel, LevelSource, Levels};
use stm32f7xx_hal::pac;

use crate::hw::pins::EncoderPins;

const LINE_A: u8 = 3;
const LINE_B: u8 = 4;

/// SYSCFG_EXTICRx port selector for GPIOD.
const PORT_D: u8 = 0b0011;

/// Encoder pins routed to their EXTI lines.
pub struct EncoderInputs {
    _pins: EncoderPins,
}

impl EncoderInputs {
    /// Route PD3/PD4 to EXTI3/EXTI4 and enable any-edge triggering.
    ///
    /// The NVIC lines are left masked; unmask `EXTI3` and `EXTI4` once the handlers' state is
    /// in place.
    pub fn new(pins: EncoderPins, syscfg: &pac::SYSCFG, exti: &pac::EXTI) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb2enr.modify(|_, w| w.syscfgen().set_bit());

        // Port selection
        syscfg
            .exticr1
            .modify(|_, w| unsafe { w.exti3().bits(PORT_D) });
        syscfg
            .exticr2
            .modify(|_, w| unsafe { w.exti4().bits(PORT_D) });

        // Both edges on both lines
        let mask = (1 << LINE_A) | (1 << LINE_B);
        exti.rtsr.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
        exti.ftsr.modify(|r, w| unsafe { w.bits(r.bits() | mask) });

        // Drop anything latched while configuring, then unmask
        exti.pr.write(|w| unsafe { w.bits(mask) });
        exti.imr.modify(|r, w| unsafe { w.bits(r.bits() | mask) });

        Self { _pins: pins }
    }
}

/// Acknowledge the EXTI line of `channel`. Call first thing in the handler.
#[inline]
pub fn clear_pending(channel: Channel) {
    let exti = unsafe { &*pac::EXTI::ptr() };
    let line = match channel {
        Channel::A => LINE_A,
        Channel::B => LINE_B,
    };
    exti.pr.write(|w| unsafe { w.bits(1 << line) });
}

/// Reads both encoder pins in one access to GPIOD's IDR.
///
/// Stateless, so the handlers can use it without owning the pins.
#[derive(Copy, Clone, Debug, Default)]
pub struct EncoderPort;

impl LevelSource for EncoderPort {
    #[inline]
    fn levels(&self) -> Levels {
        let idr = unsafe { (*pac::GPIOD::ptr()).idr.read().bits() };
        Levels::new(idr & (1 << LINE_A) != 0, idr & (1 << LINE_B) != 0)
    }
}
