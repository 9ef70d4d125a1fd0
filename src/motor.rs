// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Boundary with the H-bridge driver and the telemetry transport.

use core::fmt;

use crate::config::MOTOR_COMMAND_LIMIT;

/// Signed drive command in `[-400, 400]`.
///
/// The only way to build one from a float is [`MotorCommand::saturate`], so an out-of-range value
/// can never reach a driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorCommand(i16);

impl MotorCommand {
    pub const MAX: Self = Self(MOTOR_COMMAND_LIMIT);
    pub const MIN: Self = Self(-MOTOR_COMMAND_LIMIT);
    pub const STOP: Self = Self(0);

    /// Clamp a raw controller output to the drive range, truncating toward zero.
    ///
    /// NaN maps to [`MotorCommand::STOP`].
    pub fn saturate(raw: f32) -> Self {
        let limit = MOTOR_COMMAND_LIMIT as f32;
        if raw > limit {
            Self::MAX
        } else if raw < -limit {
            Self::MIN
        } else {
            // `as` truncates toward zero and maps NaN to 0
            Self(raw as i16)
        }
    }

    #[inline]
    pub fn get(self) -> i16 {
        self.0
    }

    /// Magnitude as a fraction of full scale, in `[0.0, 1.0]`.
    #[inline]
    pub fn duty(self) -> f32 {
        self.0.unsigned_abs() as f32 / MOTOR_COMMAND_LIMIT as f32
    }

    #[inline]
    pub fn is_stop(self) -> bool {
        self.0 == 0
    }
}

/// Capabilities the loop needs from the motor-driver IC.
///
/// Only [`set_speed`](MotorDriver::set_speed) is on the control path. The rest are used for
/// bring-up and for the optional fault handling.
pub trait MotorDriver {
    type Error: fmt::Debug;

    /// Bring the driver into a known state.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Apply a signed drive command.
    fn set_speed(&mut self, command: MotorCommand) -> Result<(), Self::Error>;

    /// True when the driver reports a fault (over-current, thermal, undervoltage, ...).
    fn fault(&mut self) -> bool;

    /// Put the driver in its low-power state, outputs off.
    fn sleep(&mut self);

    /// Wake the driver from sleep.
    fn wake(&mut self);

    /// Sample the current-sense output at zero drive and store it as the zero offset.
    fn calibrate_current_offset(&mut self) -> Result<(), Self::Error>;
}

/// Power-on sequence: init, wake, then calibrate the current-sense offset at zero drive.
///
/// The driver is left stopped. Callers should let the current sense settle (~10 ms) before the
/// first control cycle.
pub fn bring_up<M: MotorDriver>(motor: &mut M) -> Result<(), M::Error> {
    motor.init()?;
    motor.wake();
    motor.set_speed(MotorCommand::STOP)?;
    motor.calibrate_current_offset()
}

/// Sink for the per-cycle telemetry sample.
///
/// Called from the control interrupt, so implementations must not block; dropping a sample when
/// the transport is busy is acceptable.
pub trait Telemetry {
    /// Publish the measured speed in rad/s.
    fn speed(&mut self, rad_per_s: f32);
}

/// Telemetry sink that discards everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoTelemetry;

impl Telemetry for NoTelemetry {
    #[inline]
    fn speed(&mut self, _rad_per_s: f32) {}
}
