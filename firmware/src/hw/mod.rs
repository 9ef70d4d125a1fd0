// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! MCU-level wrappers around the peripherals the servo uses.

pub mod adc;
pub mod encoder;
pub mod led;
pub mod pins;
pub mod pwm;
pub mod spi;
pub mod timer;
pub mod usart;

pub use adc::Adc;
pub use encoder::{EncoderInputs, EncoderPort};
pub use led::Led;
pub use pins::BoardPins;
pub use pwm::{Pwm, PwmChannel};
pub use spi::SpiDevice;
pub use timer::ControlTimer;
pub use usart::Usart;
