// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin definitions for the NUCLEO-F767ZI servo bench.
//!
//! | Signal | Pin | Use |
//! | ------ | --- | --- |
//! | LD1 / LD3 / LD2 | PB0 / PB14 / PB7 | running / fault / telemetry |
//! | USART3 TX / RX | PD8 / PD9 | console (ST-LINK VCP) |
//! | SPI1 SCK / MISO / MOSI | PA5 / PA6 / PA7 | DRV8873 registers |
//! | DRV8873 nSCS | PC3 | |
//! | ENC A / ENC B | PD3 / PD4 | EXTI3 / EXTI4, pulled up |
//! | IN1 / IN2 | PD12 / PD13 | TIM4_CH1 / TIM4_CH2 |
//! | nSLEEP / DISABLE / nFAULT | PE9 / PE11 / PE13 | |
//! | IPROPI | PC0 | ADC1_IN10 |

use stm32f7xx_hal::{
    gpio::{gpioa, gpiob, gpioc, gpiod, gpioe, Alternate, Analog, Input, Output, PullUp, PushPull},
    pac,
    prelude::*,
};

/// ADC1 channel wired to IPROPI.
pub const IPROPI_CHANNEL: u8 = 10;

/// All board pins. Construct this once at startup using:
///
/// ```ignore
/// let pins = BoardPins::new(dp.GPIOA, dp.GPIOB, dp.GPIOC, dp.GPIOD, dp.GPIOE);
/// ```
pub struct BoardPins {
    pub leds: LedPins,
    pub usart3: Usart3Pins,
    pub spi1: Spi1Pins,
    pub encoder: EncoderPins,
    pub motor: MotorPins,
}

pub struct LedPins {
    pub green: gpiob::PB0<Output<PushPull>>, // LD1
    pub blue: gpiob::PB7<Output<PushPull>>,  // LD2
    pub red: gpiob::PB14<Output<PushPull>>,  // LD3
}

pub struct Usart3Pins {
    pub tx: gpiod::PD8<Alternate<7>>,
    pub rx: gpiod::PD9<Alternate<7>>,
}

/// SPI1 SCK/MISO/MOSI
pub struct Spi1Pins {
    pub sck: gpioa::PA5<Alternate<5>>,
    pub miso: gpioa::PA6<Alternate<5>>,
    pub mosi: gpioa::PA7<Alternate<5>>,
}

/// Quadrature encoder inputs, sampled in the EXTI handlers
pub struct EncoderPins {
    pub a: gpiod::PD3<Input<PullUp>>,
    pub b: gpiod::PD4<Input<PullUp>>,
}

/// DRV8873 control pins
pub struct MotorPins {
    pub in1: gpiod::PD12<Alternate<2>>, // TIM4_CH1 (PWM)
    pub in2: gpiod::PD13<Alternate<2>>, // TIM4_CH2 (PWM)
    pub nsleep: gpioe::PE9<Output<PushPull>>,
    pub disable: gpioe::PE11<Output<PushPull>>,
    pub nfault: gpioe::PE13<Input<PullUp>>, // open drain on the driver side
    pub iprop: gpioc::PC0<Analog>,
    pub cs: gpioc::PC3<Output<PushPull>>,
}

impl BoardPins {
    /// Create all named pins from raw GPIO peripherals.
    pub fn new(
        gpioa: pac::GPIOA,
        gpiob: pac::GPIOB,
        gpioc: pac::GPIOC,
        gpiod: pac::GPIOD,
        gpioe: pac::GPIOE,
    ) -> Self {
        let gpioa = gpioa.split();
        let gpiob = gpiob.split();
        let gpioc = gpioc.split();
        let gpiod = gpiod.split();
        let gpioe = gpioe.split();

        Self {
            leds: LedPins {
                green: gpiob.pb0.into_push_pull_output(),
                blue: gpiob.pb7.into_push_pull_output(),
                red: gpiob.pb14.into_push_pull_output(),
            },

            usart3: Usart3Pins {
                tx: gpiod.pd8.into_alternate::<7>(),
                rx: gpiod.pd9.into_alternate::<7>(),
            },

            spi1: Spi1Pins {
                sck: gpioa.pa5.into_alternate::<5>(),
                miso: gpioa.pa6.into_alternate::<5>(),
                mosi: gpioa.pa7.into_alternate::<5>(),
            },

            encoder: EncoderPins {
                a: gpiod.pd3.into_pull_up_input(),
                b: gpiod.pd4.into_pull_up_input(),
            },

            motor: MotorPins {
                in1: gpiod.pd12.into_alternate::<2>(),
                in2: gpiod.pd13.into_alternate::<2>(),
                nsleep: gpioe.pe9.into_push_pull_output(),
                disable: gpioe.pe11.into_push_pull_output(),
                nfault: gpioe.pe13.into_pull_up_input(),
                iprop: gpioc.pc0.into_analog(),
                cs: gpioc.pc3.into_push_pull_output(),
            },
        }
    }
}
