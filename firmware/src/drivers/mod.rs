// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Device-Specific Drivers
//!
//! Drivers sit above the raw `hw/` layer and implement the core's hardware traits.
//!
//! - [`drv8873`] – TI DRV8873-Q1 H-bridge, PWM input mode, SPI diagnostics

pub mod drv8873;

pub use drv8873::Drv8873;
