// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Mode/setpoint store shared between the command console and the control loop.
//!
//! Every field is its own atomic, so a single field never tears even though the console runs in
//! thread mode and the loop runs in the timer interrupt. Nothing makes a group of fields
//! consistent with each other: a gain written between two reads in the same cycle is simply
//! picked up there.

use portable_atomic::{AtomicBool, AtomicF32, Ordering};

/// Quantity the loop regulates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMode {
    /// Angular speed in rad/s.
    #[default]
    VelocityTracking,
    /// Cumulative encoder ticks.
    PositionTracking,
}

impl ControlMode {
    #[inline]
    pub fn from_flag(position: bool) -> Self {
        if position {
            ControlMode::PositionTracking
        } else {
            ControlMode::VelocityTracking
        }
    }

    #[inline]
    pub fn is_position(self) -> bool {
        matches!(self, ControlMode::PositionTracking)
    }
}

/// PID gains as read for one cycle.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Gains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }
}

/// Values written by the console and read by the control loop.
#[derive(Debug)]
pub struct Settings {
    kp: AtomicF32,
    ki: AtomicF32,
    kd: AtomicF32,
    /// rad/s in velocity mode, ticks in position mode.
    setpoint: AtomicF32,
    position_mode: AtomicBool,
    telemetry: AtomicBool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// All gains and the setpoint at zero, velocity mode, telemetry off.
    pub const fn new() -> Self {
        Self {
            kp: AtomicF32::new(0.0),
            ki: AtomicF32::new(0.0),
            kd: AtomicF32::new(0.0),
            setpoint: AtomicF32::new(0.0),
            position_mode: AtomicBool::new(false),
            telemetry: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn kp(&self) -> f32 {
        self.kp.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn ki(&self) -> f32 {
        self.ki.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn kd(&self) -> f32 {
        self.kd.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_kp(&self, kp: f32) {
        self.kp.store(kp, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_ki(&self, ki: f32) {
        self.ki.store(ki, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_kd(&self, kd: f32) {
        self.kd.store(kd, Ordering::Relaxed);
    }

    /// Latest gains, one field at a time.
    #[inline]
    pub fn gains(&self) -> Gains {
        Gains::new(self.kp(), self.ki(), self.kd())
    }

    #[inline]
    pub fn setpoint(&self) -> f32 {
        self.setpoint.load(Ordering::Relaxed)
    }

    /// Store a setpoint already expressed in loop units (rad/s or ticks).
    #[inline]
    pub fn set_setpoint(&self, setpoint: f32) {
        self.setpoint.store(setpoint, Ordering::Relaxed);
    }

    #[inline]
    pub fn mode(&self) -> ControlMode {
        ControlMode::from_flag(self.position_mode.load(Ordering::Relaxed))
    }

    /// Switch modes. Accumulated position and PID state are left alone.
    #[inline]
    pub fn set_mode(&self, mode: ControlMode) {
        self.position_mode
            .store(mode.is_position(), Ordering::Relaxed);
    }

    #[inline]
    pub fn telemetry_enabled(&self) -> bool {
        self.telemetry.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_telemetry(&self, enabled: bool) {
        self.telemetry.store(enabled, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_start_zeroed_in_velocity_mode() {
        let s = Settings::new();
        assert_eq!(s.gains(), Gains::default());
        assert_eq!(s.setpoint(), 0.0);
        assert_eq!(s.mode(), ControlMode::VelocityTracking);
        assert!(!s.telemetry_enabled());
    }

    #[test]
    fn gains_are_independent() {
        let s = Settings::new();
        s.set_kp(1.0);
        s.set_kd(0.25);
        assert_eq!(s.gains(), Gains::new(1.0, 0.0, 0.25));

        s.set_ki(8.5);
        assert_eq!(s.gains(), Gains::new(1.0, 8.5, 0.25));
    }

    #[test]
    fn setpoint_keeps_its_exact_value() {
        let s = Settings::new();
        for v in [1.5_f32, -0.0, f32::MAX, f32::MIN_POSITIVE, -273.15] {
            s.set_setpoint(v);
            assert_eq!(s.setpoint().to_bits(), v.to_bits());
        }
    }

    #[test]
    fn mode_switch_keeps_setpoint() {
        let s = Settings::new();
        s.set_setpoint(12.0);
        s.set_mode(ControlMode::PositionTracking);
        assert_eq!(s.mode(), ControlMode::PositionTracking);
        assert_eq!(s.setpoint(), 12.0);
    }
}
