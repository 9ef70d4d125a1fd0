// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # dcservo
//!
//! Platform-independent core of the DC motor servo firmware: a single brushed motor behind an
//! H-bridge, a quadrature encoder on the motor shaft, and a PID loop that tracks either a speed
//! (rad/s) or a position (encoder ticks).
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`encoder`] | Edge-interrupt quadrature decoding into a shared tick accumulator |
//! | [`control`] | Estimator, PID, control cycle and fixed-cadence scheduler |
//! | [`state`] | Mode/setpoint/gain store shared with the console |
//! | [`motor`] | Motor command type, driver and telemetry traits |
//! | [`protocol`] | Text command protocol: framing, parsing, execution |
//! | [`config`] | Build-time constants |
//!
//! ## Execution contexts
//!
//! | Context | Runs | Touches |
//! | ------- | ---- | ------- |
//! | Encoder edge interrupts | [`encoder::EdgeHandler`] | [`encoder::TickAccumulator`] only |
//! | Control timer interrupt | [`control::ControlLoop::run_cycle`], [`control::ControlLoop::reset`] | drains and clears ticks, reads [`state::Settings`], owns PID state |
//! | Thread mode | [`protocol::Console`] | writes [`state::Settings`], requests resets from the control context |
//!
//! The board support lives in the `firmware/` crate.
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod control;
pub mod encoder;
pub mod motor;
pub mod protocol;
pub mod state;
