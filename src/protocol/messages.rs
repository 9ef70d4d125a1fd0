// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Command and reply messages of the console protocol.
//!
//! Every line is `<marker><name>` or `<marker><name>=<value>`:
//!
//! | name | value | effect | reply |
//! | ---- | ----- | ------ | ----- |
//! | `ping` | - | none | `pong` |
//! | `kp` / `ki` / `kd` | float | set a gain | `kp=<Kp>` ... |
//! | `consigne` | float | set the setpoint | `consigne=<stored value>` |
//! | `log` | 0/1 | speed telemetry on/off | `log=<0/1>` |
//! | `reset` | - | zero the controller, stop the motor | `reset` |
//! | `asservissement_position` | 0/1 | position (1) or velocity (0) mode | `asservissement_position=<0/1>` |
//!
//! Booleans go out as `1`/`0`. Floats use `core::fmt`'s shortest round-trip form, so `2.5` comes
//! back as `2.5`.

use core::fmt;

// Command names
pub const CMD_PING: &str = "ping";
pub const CMD_KP: &str = "kp";
pub const CMD_KI: &str = "ki";
pub const CMD_KD: &str = "kd";
pub const CMD_SETPOINT: &str = "consigne";
pub const CMD_LOG: &str = "log";
pub const CMD_RESET: &str = "reset";
pub const CMD_POSITION_MODE: &str = "asservissement_position";

/// Commands accepted from the console.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Ping,
    Kp(f32),
    Ki(f32),
    Kd(f32),
    /// Raw setpoint argument: rad/s, or a distance in position mode.
    Setpoint(f32),
    Log(bool),
    Reset,
    /// `true` selects position tracking.
    PositionMode(bool),
}

/// Lines sent back on the console.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    Pong,
    Kp(f32),
    Ki(f32),
    Kd(f32),
    /// Setpoint as stored, after unit conversion.
    Setpoint(f32),
    Log(bool),
    Reset,
    PositionMode(bool),
    /// Per-cycle telemetry sample, rad/s.
    Speed(f32),
    /// The driver faulted and the loop halted.
    MotorFault,
}

impl Reply {
    /// Attach the line marker.
    #[inline]
    pub fn framed(self, prefix: &str) -> Framed<'_> {
        Framed {
            prefix,
            reply: self,
        }
    }
}

#[inline]
fn flag(b: bool) -> u8 {
    b as u8
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Reply::Pong => f.write_str("pong"),
            Reply::Kp(v) => write!(f, "{CMD_KP}={v}"),
            Reply::Ki(v) => write!(f, "{CMD_KI}={v}"),
            Reply::Kd(v) => write!(f, "{CMD_KD}={v}"),
            Reply::Setpoint(v) => write!(f, "{CMD_SETPOINT}={v}"),
            Reply::Log(on) => write!(f, "{CMD_LOG}={}", flag(on)),
            Reply::Reset => f.write_str(CMD_RESET),
            Reply::PositionMode(on) => write!(f, "{CMD_POSITION_MODE}={}", flag(on)),
            Reply::Speed(v) => write!(f, "speed={v}"),
            Reply::MotorFault => f.write_str("Motor fault"),
        }
    }
}

/// A reply with its line marker, without the line terminator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framed<'a> {
    prefix: &'a str,
    reply: Reply,
}

impl fmt::Display for Framed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.reply)
    }
}
