// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Control Algorithms
//!
//! Building blocks of the closed-loop motor controller.
//!
//! ## Modules
//!
//! - [`estimator`] - Speed and running position from encoder ticks.
//! - [`pid`] - PID regulator with a one-cycle integral lag.
//! - [`control_loop`] - One control cycle, from drained ticks to a saturated motor command.
//! - [`scheduler`] - Fixed-cadence runner with overrun accounting.

pub mod control_loop;
pub mod estimator;
pub mod pid;
pub mod scheduler;

pub use control_loop::{ControlLoop, CycleInputs, CycleReport, LoopError};
pub use estimator::{EncoderGeometry, Estimator, Measurement};
pub use pid::{Pid, PidTerms};
pub use scheduler::{Cadence, PeriodicTask, Scheduler};
