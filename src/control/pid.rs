// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! PID regulator for the servo loop.
//!
//! Works in `no_std` and does not allocate memory.
//!
//! Two behaviors are kept on purpose because the tuned gains depend on them:
//!
//! - The integral term lags one cycle. The output of a cycle uses the accumulator as it stood
//!   after the previous cycle; this cycle's error is folded in afterwards.
//! - There is no anti-windup. Only the final command is saturated, so the accumulator keeps
//!   growing while the output sits at a limit and the loop overshoots once the error changes sign.

use crate::state::Gains;

/// Individual terms of one update.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidTerms {
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

impl PidTerms {
    #[inline]
    pub fn output(&self) -> f32 {
        self.p + self.i + self.d
    }
}

/// PID runtime state. Gains are supplied on every update.
#[derive(Clone, Debug, Default)]
pub struct Pid {
    /// Integrator state, already scaled by `ki`.
    integral: f32,
    /// Error of the previous update (for the derivative term).
    prev_error: f32,
}

impl Pid {
    pub const fn new() -> Self {
        Self {
            integral: 0.0,
            prev_error: 0.0,
        }
    }

    /// Reset integrator and derivative history.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    /// Update the controller.
    ///
    /// `error` : setpoint minus measurement
    /// `dt` : timestep in seconds (e.g. 0.01 for a 100 Hz loop)
    ///
    /// Returns the unclamped command.
    pub fn update(&mut self, gains: Gains, error: f32, dt: f32) -> f32 {
        self.update_terms(gains, error, dt).output()
    }

    /// Same as [`update`](Self::update), returning each term.
    pub fn update_terms(&mut self, gains: Gains, error: f32, dt: f32) -> PidTerms {
        // ----- P term -----
        let p = gains.kp * error;

        // ----- D term (on error) -----
        let d = gains.kd * (error - self.prev_error) / dt;

        // ----- I term, as accumulated through the previous update -----
        let i = self.integral;

        self.integral += gains.ki * dt * error;
        self.prev_error = error;

        PidTerms { p, i, d }
    }

    #[inline]
    pub fn integral(&self) -> f32 {
        self.integral
    }

    #[inline]
    pub fn prev_error(&self) -> f32 {
        self.prev_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_only() {
        let mut pid = Pid::new();
        let out = pid.update(Gains::new(1.0, 0.0, 0.0), 5.0, 0.01);
        assert_eq!(out, 5.0);
    }

    #[test]
    fn integral_lags_one_cycle() {
        let mut pid = Pid::new();
        let gains = Gains::new(0.0, 10.0, 0.0);

        // First cycle: accumulator was empty
        assert_eq!(pid.update(gains, 2.0, 0.5), 0.0);
        assert_eq!(pid.integral(), 10.0);

        // Second cycle sees the first cycle's contribution only
        assert_eq!(pid.update(gains, 2.0, 0.5), 10.0);
        assert_eq!(pid.integral(), 20.0);
    }

    #[test]
    fn derivative_uses_previous_error() {
        let mut pid = Pid::new();
        let gains = Gains::new(0.0, 0.0, 0.5);

        // No history yet: previous error is zero
        assert_eq!(pid.update(gains, 1.0, 0.25), 2.0);
        assert_eq!(pid.update(gains, 1.0, 0.25), 0.0);
        assert_eq!(pid.update(gains, 0.0, 0.25), -2.0);
        assert_eq!(pid.prev_error(), 0.0);
    }

    #[test]
    fn integral_is_not_clamped() {
        let mut pid = Pid::new();
        let gains = Gains::new(0.0, 1000.0, 0.0);
        for _ in 0..100 {
            pid.update(gains, 100.0, 0.01);
        }
        assert_eq!(pid.integral(), 100_000.0);
    }

    #[test]
    fn terms_sum_to_output() {
        let mut pid = Pid::new();
        let gains = Gains::new(2.0, 4.0, 0.1);
        pid.update(gains, 1.0, 0.5);
        let terms = pid.update_terms(gains, 3.0, 0.5);
        assert_eq!(terms.p, 6.0);
        assert_eq!(terms.i, 2.0);
        assert_eq!(terms.d, 0.4);
        assert!((terms.output() - 8.4).abs() < 1e-6);
    }

    #[test]
    fn reset_clears_history() {
        let mut pid = Pid::new();
        pid.update(Gains::new(1.0, 1.0, 1.0), 3.0, 0.1);
        pid.reset();
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.prev_error(), 0.0);
    }
}
