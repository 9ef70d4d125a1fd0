// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Build-time configuration for the servo loop.
//!
//! The defaults match the reference bench: a 48 PPR encoder on the motor shaft behind a 20.4:1
//! gearbox, driving a mechanism that travels 0.8 distance units per output revolution.

use crate::control::{Cadence, EncoderGeometry};

/// Control loop period in milliseconds.
pub const CADENCE_MS: u32 = 10;

/// Encoder pulses per motor shaft revolution.
pub const PULSES_PER_REV: f32 = 48.0;

/// Gearbox reduction between the motor shaft and the output.
pub const GEAR_RATIO: f32 = 20.4;

/// Distance travelled per output revolution, in position-mode setpoint units.
pub const DISTANCE_PER_REV: f32 = 0.8;

/// Largest magnitude ever sent to the motor driver.
pub const MOTOR_COMMAND_LIMIT: i16 = 400;

/// Marker in front of every command line and every reply.
pub const COMMAND_PREFIX: &str = "PR+";

/// Console baud rate.
pub const BAUD_RATE: u32 = 115_200;

/// Longest accepted command line, excluding the terminator.
pub const LINE_CAPACITY: usize = 64;

/// Encoder geometry of the reference bench.
pub const GEOMETRY: EncoderGeometry =
    EncoderGeometry::new(PULSES_PER_REV, GEAR_RATIO, DISTANCE_PER_REV);

/// Default control cadence.
pub const CADENCE: Cadence = Cadence::from_millis(CADENCE_MS);
