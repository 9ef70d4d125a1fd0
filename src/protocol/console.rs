// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Applies console commands to the shared controller state.
//!
//! The console runs in thread mode and only writes the atomics of [`Settings`]. A reset touches
//! state owned by the control interrupt, so it goes through a callback that the caller runs in
//! that context (see [`ControlLoop::reset`](crate::control::ControlLoop::reset)).

use crate::control::EncoderGeometry;
use crate::protocol::{Command, Reply};
use crate::state::{ControlMode, Settings};

/// Command interpreter bound to the shared state.
pub struct Console<'a> {
    settings: &'a Settings,
    geometry: EncoderGeometry,
}

impl<'a> Console<'a> {
    pub fn new(settings: &'a Settings, geometry: EncoderGeometry) -> Self {
        Self { settings, geometry }
    }

    /// Apply `command` and return the acknowledgment.
    ///
    /// `reset_loop` runs only for [`Command::Reset`]. It must zero the setpoint, the pending ticks,
    /// the PID state and the running position, and command the motor to 0 before returning.
    pub fn execute<F: FnOnce()>(&self, command: Command, reset_loop: F) -> Reply {
        let s = self.settings;
        match command {
            Command::Ping => Reply::Pong,
            Command::Kp(kp) => {
                s.set_kp(kp);
                Reply::Kp(s.kp())
            }
            Command::Ki(ki) => {
                s.set_ki(ki);
                Reply::Ki(s.ki())
            }
            Command::Kd(kd) => {
                s.set_kd(kd);
                Reply::Kd(s.kd())
            }
            Command::Setpoint(value) => {
                let setpoint = match s.mode() {
                    ControlMode::PositionTracking => self.geometry.distance_to_ticks(value),
                    ControlMode::VelocityTracking => value,
                };
                s.set_setpoint(setpoint);
                Reply::Setpoint(setpoint)
            }
            Command::Log(on) => {
                s.set_telemetry(on);
                Reply::Log(s.telemetry_enabled())
            }
            Command::Reset => {
                reset_loop();
                Reply::Reset
            }
            Command::PositionMode(on) => {
                s.set_mode(ControlMode::from_flag(on));
                Reply::PositionMode(s.mode().is_position())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::state::Gains;

    fn no_reset() {
        panic!("reset callback must only run for `reset`");
    }

    #[test]
    fn gains_are_stored_and_echoed() {
        let settings = Settings::new();
        let console = Console::new(&settings, config::GEOMETRY);

        assert_eq!(console.execute(Command::Kp(2.0), no_reset), Reply::Kp(2.0));
        assert_eq!(console.execute(Command::Ki(850.0), no_reset), Reply::Ki(850.0));
        assert_eq!(console.execute(Command::Kd(40.0), no_reset), Reply::Kd(40.0));
        assert_eq!(settings.gains(), Gains::new(2.0, 850.0, 40.0));
    }

    #[test]
    fn setpoint_is_converted_in_position_mode() {
        let settings = Settings::new();
        let console = Console::new(&settings, config::GEOMETRY);

        assert_eq!(console.execute(Command::Setpoint(2.5), no_reset), Reply::Setpoint(2.5));
        assert_eq!(settings.setpoint(), 2.5);

        console.execute(Command::PositionMode(true), no_reset);
        let expected = config::GEOMETRY.distance_to_ticks(10.0);
        assert_eq!(
            console.execute(Command::Setpoint(10.0), no_reset),
            Reply::Setpoint(expected)
        );
        assert!((settings.setpoint() - 12_240.0).abs() < 0.01);
    }

    #[test]
    fn reset_only_goes_through_the_callback() {
        let settings = Settings::new();
        let console = Console::new(&settings, config::GEOMETRY);
        settings.set_setpoint(4.0);

        let mut called = false;
        assert_eq!(console.execute(Command::Reset, || called = true), Reply::Reset);
        assert!(called);
        // Zeroing belongs to the control context
        assert_eq!(settings.setpoint(), 4.0);
    }

    #[test]
    fn flags_are_echoed_as_stored() {
        let settings = Settings::new();
        let console = Console::new(&settings, config::GEOMETRY);

        assert_eq!(console.execute(Command::Log(true), no_reset), Reply::Log(true));
        assert!(settings.telemetry_enabled());
        assert_eq!(
            console.execute(Command::PositionMode(true), no_reset),
            Reply::PositionMode(true)
        );
        assert_eq!(settings.mode(), ControlMode::PositionTracking);
        assert_eq!(console.execute(Command::Ping, no_reset), Reply::Pong);
    }
}
