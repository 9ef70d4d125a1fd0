// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Closed-loop velocity/position controller.
//!
//! [`ControlLoop::step`] is the whole estimator + PID computation as a function of its inputs and
//! the loop's own state, with no hardware involved. [`ControlLoop::run_cycle`] wraps it with the
//! I/O of one timer period: drain the encoder, read the console settings, dispatch to the driver,
//! publish telemetry.
//!
//! Typical usage pattern, from the timer interrupt:
//!
//! ```no_run
//! # use dcservo::{config, control::ControlLoop, encoder::TickAccumulator, state::Settings};
//! # fn demo<M: dcservo::motor::MotorDriver>(motor: &mut M) {
//! static TICKS: TickAccumulator = TickAccumulator::new();
//! static SETTINGS: Settings = Settings::new();
//!
//! let mut control = ControlLoop::new(config::GEOMETRY, config::CADENCE);
//! let _ = control.run_cycle(&TICKS, &SETTINGS, motor, &mut dcservo::motor::NoTelemetry);
//! # }
//! ```

use core::fmt;

use crate::control::{Cadence, EncoderGeometry, Estimator, Pid, PidTerms};
use crate::encoder::TickAccumulator;
use crate::motor::{MotorCommand, MotorDriver, Telemetry};
use crate::state::{ControlMode, Gains, Settings};

/// Everything a cycle reads from outside the loop.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleInputs {
    /// Ticks drained from the encoder for this cycle.
    pub delta: i32,
    pub mode: ControlMode,
    /// rad/s or ticks, depending on `mode`.
    pub setpoint: f32,
    pub gains: Gains,
}

impl CycleInputs {
    /// Read the console-owned fields. Each one is read on its own.
    pub fn from_settings(delta: i32, settings: &Settings) -> Self {
        Self {
            delta,
            mode: settings.mode(),
            setpoint: settings.setpoint(),
            gains: settings.gains(),
        }
    }
}

/// What one cycle computed.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    /// Measured output speed, rad/s.
    pub speed: f32,
    /// Running tick total after this cycle.
    pub position: i32,
    pub error: f32,
    pub terms: PidTerms,
    /// PID output before the zero-setpoint override and saturation.
    pub raw: f32,
    /// Value dispatched to the driver.
    pub command: MotorCommand,
}

/// Failures of a control cycle.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoopError<E: fmt::Debug> {
    /// The driver rejected the command.
    #[error("motor driver error: {0:?}")]
    Driver(E),

    /// The driver reported a fault. The loop has put it to sleep and halted.
    #[error("motor driver fault")]
    MotorFault,

    /// A previous fault halted the loop; nothing is driven until power cycle.
    #[error("control loop halted")]
    Halted,
}

/// Estimator, PID and the state they own.
///
/// Only the control interrupt touches this, apart from a reset issued from a critical section.
#[derive(Clone, Debug)]
pub struct ControlLoop {
    cadence: Cadence,
    estimator: Estimator,
    pid: Pid,
    last: CycleReport,
    fault_check: bool,
    halted: bool,
}

impl ControlLoop {
    /// Create a loop with zeroed state. Fault polling follows the `fault-check` feature.
    pub fn new(geometry: EncoderGeometry, cadence: Cadence) -> Self {
        Self {
            cadence,
            estimator: Estimator::new(geometry),
            pid: Pid::new(),
            last: CycleReport::default(),
            fault_check: cfg!(feature = "fault-check"),
            halted: false,
        }
    }

    /// Enable or disable driver fault polling after each dispatch.
    pub fn with_fault_check(mut self, enabled: bool) -> Self {
        self.fault_check = enabled;
        self
    }

    /// Run the estimator and the PID for one cycle.
    pub fn step(&mut self, inputs: CycleInputs) -> CycleReport {
        let dt = self.cadence.dt();

        let measurement = self.estimator.update(inputs.delta, dt);

        let error = match inputs.mode {
            ControlMode::PositionTracking => inputs.setpoint - measurement.position as f32,
            ControlMode::VelocityTracking => inputs.setpoint - measurement.speed,
        };

        let terms = self.pid.update_terms(inputs.gains, error, dt);
        let raw = terms.output();

        // A zero setpoint always stops the motor
        let command = if inputs.setpoint == 0.0 {
            MotorCommand::STOP
        } else {
            MotorCommand::saturate(raw)
        };

        self.last = CycleReport {
            speed: measurement.speed,
            position: measurement.position,
            error,
            terms,
            raw,
            command,
        };
        self.last
    }

    /// One full timer period: drain, compute, dispatch, publish.
    ///
    /// With fault polling enabled, a driver fault puts the driver to sleep and halts the loop for
    /// good; later calls return [`LoopError::Halted`] without touching the driver.
    pub fn run_cycle<M, T>(
        &mut self,
        ticks: &TickAccumulator,
        settings: &Settings,
        motor: &mut M,
        telemetry: &mut T,
    ) -> Result<CycleReport, LoopError<M::Error>>
    where
        M: MotorDriver,
        T: Telemetry,
    {
        if self.halted {
            return Err(LoopError::Halted);
        }

        let delta = ticks.drain();
        let report = self.step(CycleInputs::from_settings(delta, settings));

        motor
            .set_speed(report.command)
            .map_err(LoopError::Driver)?;

        if self.fault_check && motor.fault() {
            motor.sleep();
            self.halted = true;
            return Err(LoopError::MotorFault);
        }

        if settings.telemetry_enabled() {
            telemetry.speed(report.speed);
        }

        Ok(report)
    }

    /// Zero the setpoint, the undrained ticks, the PID state and the running position, then stop
    /// the motor right away.
    ///
    /// Must not overlap [`run_cycle`](Self::run_cycle): run it from the control context or with
    /// that context held off, so no cycle sees a half-reset loop.
    pub fn reset<M: MotorDriver>(
        &mut self,
        ticks: &TickAccumulator,
        settings: &Settings,
        motor: &mut M,
    ) -> Result<(), M::Error> {
        settings.set_setpoint(0.0);
        ticks.clear();
        self.clear();
        if self.halted {
            return Ok(());
        }
        motor.set_speed(MotorCommand::STOP)
    }

    fn clear(&mut self) {
        self.pid.reset();
        self.estimator.reset();
        self.last = CycleReport::default();
    }

    #[inline]
    pub fn total_ticks(&self) -> i32 {
        self.estimator.total_ticks()
    }

    #[inline]
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Report of the most recent cycle.
    #[inline]
    pub fn last(&self) -> &CycleReport {
        &self.last
    }

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::motor::NoTelemetry;

    fn unit_geometry() -> EncoderGeometry {
        // One tick per radian keeps the arithmetic readable
        EncoderGeometry::new(2.0 * core::f32::consts::PI, 1.0, 1.0)
    }

    fn velocity(setpoint: f32, gains: Gains, delta: i32) -> CycleInputs {
        CycleInputs {
            delta,
            mode: ControlMode::VelocityTracking,
            setpoint,
            gains,
        }
    }

    #[test]
    fn proportional_command_before_saturation() {
        let mut ctl = ControlLoop::new(config::GEOMETRY, Cadence::from_millis(10));
        let r = ctl.step(velocity(5.0, Gains::new(1.0, 0.0, 0.0), 0));
        assert_eq!(r.error, 5.0);
        assert_eq!(r.raw, 5.0);
        assert_eq!(r.command.get(), 5);
    }

    #[test]
    fn zero_setpoint_forces_stop() {
        let mut ctl = ControlLoop::new(config::GEOMETRY, config::CADENCE);
        let gains = Gains::new(50.0, 100.0, 1.0);

        // Build some history first
        ctl.step(velocity(3.0, gains, -40));
        ctl.step(velocity(3.0, gains, -40));

        for delta in [-40, 0, 40] {
            let r = ctl.step(velocity(0.0, gains, delta));
            assert_ne!(r.raw, 0.0);
            assert_eq!(r.command, MotorCommand::STOP);
        }
    }

    #[test]
    fn output_is_saturated() {
        let mut ctl = ControlLoop::new(config::GEOMETRY, config::CADENCE);
        let r = ctl.step(velocity(1000.0, Gains::new(1.0, 0.0, 0.0), 0));
        assert_eq!(r.command, MotorCommand::MAX);

        let r = ctl.step(velocity(-1000.0, Gains::new(1.0, 0.0, 0.0), 0));
        assert_eq!(r.command, MotorCommand::MIN);
    }

    #[test]
    fn velocity_error_uses_measured_speed() {
        let mut ctl = ControlLoop::new(unit_geometry(), Cadence::from_millis(1000));
        let r = ctl.step(velocity(10.0, Gains::new(1.0, 0.0, 0.0), 4));
        assert!((r.speed - 4.0).abs() < 1e-5);
        assert!((r.error - 6.0).abs() < 1e-5);
    }

    #[test]
    fn position_error_uses_running_total() {
        let mut ctl = ControlLoop::new(config::GEOMETRY, config::CADENCE);
        let gains = Gains::new(1.0, 0.0, 0.0);
        let inputs = |delta| CycleInputs {
            delta,
            mode: ControlMode::PositionTracking,
            setpoint: 100.0,
            gains,
        };

        assert_eq!(ctl.step(inputs(30)).error, 70.0);
        assert_eq!(ctl.step(inputs(30)).error, 40.0);
        assert_eq!(ctl.total_ticks(), 60);
    }

    #[test]
    fn integral_winds_up_while_saturated() {
        let mut ctl = ControlLoop::new(config::GEOMETRY, config::CADENCE);
        let gains = Gains::new(0.0, 1000.0, 0.0);
        for _ in 0..50 {
            let r = ctl.step(velocity(100.0, gains, 0));
            assert!(r.command.get() <= 400);
        }
        // 50 cycles of 1000 * 0.01 * 100
        assert!(ctl.pid().integral() > 40_000.0);
    }

    #[derive(Default)]
    struct LastCommand(Option<MotorCommand>);

    impl MotorDriver for LastCommand {
        type Error = ();

        fn init(&mut self) -> Result<(), ()> {
            Ok(())
        }

        fn set_speed(&mut self, command: MotorCommand) -> Result<(), ()> {
            self.0 = Some(command);
            Ok(())
        }

        fn fault(&mut self) -> bool {
            false
        }

        fn sleep(&mut self) {}

        fn wake(&mut self) {}

        fn calibrate_current_offset(&mut self) -> Result<(), ()> {
            Ok(())
        }
    }

    #[test]
    fn reset_zeroes_shared_and_loop_state_in_one_call() {
        let ticks = TickAccumulator::new();
        let settings = Settings::new();
        let mut motor = LastCommand::default();
        let mut ctl = ControlLoop::new(config::GEOMETRY, config::CADENCE);

        settings.set_kp(3.0);
        settings.set_ki(10.0);
        settings.set_setpoint(5.0);
        ticks.add(12);
        ctl.run_cycle(&ticks, &settings, &mut motor, &mut NoTelemetry)
            .unwrap();
        assert_ne!(ctl.pid().integral(), 0.0);
        assert_eq!(ctl.total_ticks(), 12);

        // Edges that land after the last cycle must not survive the reset
        ticks.add(7);
        ctl.reset(&ticks, &settings, &mut motor).unwrap();

        assert_eq!(settings.setpoint(), 0.0);
        assert_eq!(ticks.pending(), 0);
        assert_eq!(ctl.total_ticks(), 0);
        assert_eq!(ctl.pid().integral(), 0.0);
        assert_eq!(*ctl.last(), CycleReport::default());
        assert_eq!(motor.0, Some(MotorCommand::STOP));

        let r = ctl
            .run_cycle(&ticks, &settings, &mut motor, &mut NoTelemetry)
            .unwrap();
        assert_eq!(r.position, 0);
    }

    #[test]
    fn mode_switch_keeps_state() {
        let mut ctl = ControlLoop::new(config::GEOMETRY, config::CADENCE);
        let gains = Gains::new(1.0, 1.0, 0.0);
        ctl.step(velocity(2.0, gains, 25));
        let integral = ctl.pid().integral();

        let r = ctl.step(CycleInputs {
            delta: 0,
            mode: ControlMode::PositionTracking,
            setpoint: 2.0,
            gains,
        });
        assert_eq!(r.position, 25);
        assert_eq!(r.terms.i, integral);
    }
}
