// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Speed and position estimation from drained encoder ticks.

use core::f32::consts::PI;

/// Encoder and drivetrain geometry.
///
/// - `pulses_per_rev`: decoded ticks per motor shaft revolution
/// - `gear_ratio`: motor revolutions per output revolution
/// - `distance_per_rev`: distance covered per output revolution, in setpoint units
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderGeometry {
    pub pulses_per_rev: f32,
    pub gear_ratio: f32,
    pub distance_per_rev: f32,
}

impl EncoderGeometry {
    pub const fn new(pulses_per_rev: f32, gear_ratio: f32, distance_per_rev: f32) -> Self {
        Self {
            pulses_per_rev,
            gear_ratio,
            distance_per_rev,
        }
    }

    /// Ticks per output shaft revolution.
    #[inline]
    pub fn ticks_per_rev(&self) -> f32 {
        self.pulses_per_rev * self.gear_ratio
    }

    /// Output shaft speed in rad/s for `delta` ticks seen over `dt` seconds.
    #[inline]
    pub fn speed_rad_s(&self, delta: i32, dt: f32) -> f32 {
        (2.0 * PI * delta as f32) / self.ticks_per_rev() / dt
    }

    /// Convert a distance into a tick count.
    #[inline]
    pub fn distance_to_ticks(&self, distance: f32) -> f32 {
        distance * self.pulses_per_rev * self.gear_ratio / self.distance_per_rev
    }
}

/// Result of one estimator update.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Output shaft speed over the last interval, rad/s.
    pub speed: f32,
    /// Running tick total.
    pub position: i32,
}

/// Turns per-cycle tick deltas into speed and a running position.
#[derive(Clone, Debug)]
pub struct Estimator {
    geometry: EncoderGeometry,
    total_ticks: i32,
}

impl Estimator {
    pub const fn new(geometry: EncoderGeometry) -> Self {
        Self {
            geometry,
            total_ticks: 0,
        }
    }

    /// Fold in the ticks drained for this cycle.
    pub fn update(&mut self, delta: i32, dt: f32) -> Measurement {
        self.total_ticks = self.total_ticks.wrapping_add(delta);
        Measurement {
            speed: self.geometry.speed_rad_s(delta, dt),
            position: self.total_ticks,
        }
    }

    #[inline]
    pub fn total_ticks(&self) -> i32 {
        self.total_ticks
    }

    /// Zero the running position.
    pub fn reset(&mut self) {
        self.total_ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BENCH: EncoderGeometry = EncoderGeometry::new(48.0, 20.4, 0.8);

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-3 * b.abs().max(1.0)
    }

    #[test]
    fn one_output_rev_per_second_is_two_pi() {
        // 979.2 ticks per output rev, so 9.792 ticks in 10 ms is 1 rev/s
        let speed = BENCH.speed_rad_s(979, 1.0);
        assert!(approx(speed, 2.0 * PI * 979.0 / 979.2));
    }

    #[test]
    fn speed_scales_with_interval() {
        let fast = BENCH.speed_rad_s(10, 0.01);
        let slow = BENCH.speed_rad_s(10, 0.02);
        assert!(approx(fast, 2.0 * slow));
        assert!(BENCH.speed_rad_s(-10, 0.01) < 0.0);
    }

    #[test]
    fn distance_conversion_matches_geometry() {
        assert!(approx(BENCH.distance_to_ticks(10.0), 12240.0));
        assert!(approx(BENCH.distance_to_ticks(0.8), 979.2));
        assert_eq!(BENCH.distance_to_ticks(0.0), 0.0);
    }

    #[test]
    fn position_accumulates_drained_deltas() {
        let mut est = Estimator::new(BENCH);
        est.update(5, 0.01);
        est.update(-2, 0.01);
        let m = est.update(10, 0.01);
        assert_eq!(m.position, 13);
        assert_eq!(est.total_ticks(), 13);

        est.reset();
        assert_eq!(est.total_ticks(), 0);
    }
}
