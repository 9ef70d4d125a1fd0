// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fixed-cadence scheduling.
//!
//! The platform timer interrupt calls [`Scheduler::tick`] once per period. The scheduler runs one
//! [`PeriodicTask`] to completion and refuses to start a second one while the first is still in
//! flight; a refused tick is counted as an overrun and the work is dropped, not queued.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Interval between successive control cycles.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cadence {
    period_us: u32,
}

impl Cadence {
    /// Panics on a zero period, at compile time when used in a `const`.
    pub const fn from_millis(ms: u32) -> Self {
        Self::from_micros(ms * 1_000)
    }

    /// Panics on a zero period, at compile time when used in a `const`.
    pub const fn from_micros(us: u32) -> Self {
        assert!(us > 0, "control period must be non-zero");
        Self { period_us: us }
    }

    #[inline]
    pub const fn period_us(&self) -> u32 {
        self.period_us
    }

    /// Period in seconds, as used by the estimator and the PID.
    #[inline]
    pub fn dt(&self) -> f32 {
        self.period_us as f32 / 1_000_000.0
    }

    #[inline]
    pub const fn frequency_hz(&self) -> u32 {
        1_000_000 / self.period_us
    }
}

/// A unit of work run once per cadence period.
pub trait PeriodicTask {
    /// Worst-case execution time of [`run`](Self::run), in microseconds.
    ///
    /// Must stay well below the cadence period so edge interrupts and the console still get CPU
    /// time.
    const BUDGET_US: u32;

    fn run(&mut self);
}

/// Single-slot periodic runner with overrun accounting.
#[derive(Debug)]
pub struct Scheduler {
    cadence: Cadence,
    in_flight: AtomicBool,
    cycles: AtomicU32,
    overruns: AtomicU32,
}

impl Scheduler {
    pub const fn new(cadence: Cadence) -> Self {
        Self {
            cadence,
            in_flight: AtomicBool::new(false),
            cycles: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// True when `T` declares a budget that leaves headroom inside one period.
    pub fn admits<T: PeriodicTask>(&self) -> bool {
        T::BUDGET_US < self.cadence.period_us()
    }

    /// Run `task` once. Returns `false` if a previous run is still in flight.
    pub fn tick<T: PeriodicTask>(&self, task: &mut T) -> bool {
        if self.in_flight.swap(true, Ordering::Acquire) {
            self.overruns.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        task.run();

        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.in_flight.store(false, Ordering::Release);
        true
    }

    /// Completed runs since boot.
    #[inline]
    pub fn cycles(&self) -> u32 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Ticks dropped because the previous run had not finished.
    #[inline]
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Count a tick that could not even reach the task.
    #[inline]
    pub fn record_overrun(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u32);

    impl PeriodicTask for Counter {
        const BUDGET_US: u32 = 500;

        fn run(&mut self) {
            self.0 += 1;
        }
    }

    struct Reentrant<'a> {
        sched: &'a Scheduler,
        nested: Option<bool>,
    }

    impl PeriodicTask for Reentrant<'_> {
        const BUDGET_US: u32 = 20_000;

        fn run(&mut self) {
            let mut inner = Counter(0);
            self.nested = Some(self.sched.tick(&mut inner));
        }
    }

    #[test]
    fn cadence_conversions() {
        let c = Cadence::from_millis(10);
        assert_eq!(c.period_us(), 10_000);
        assert_eq!(c.dt(), 0.01);
        assert_eq!(c.frequency_hz(), 100);
        assert_eq!(Cadence::from_micros(250).frequency_hz(), 4_000);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn zero_period_is_rejected() {
        let _ = Cadence::from_micros(0);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn zero_millis_is_rejected() {
        let _ = Cadence::from_millis(0);
    }

    #[test]
    fn tick_runs_task_and_counts() {
        let sched = Scheduler::new(Cadence::from_millis(10));
        let mut task = Counter(0);
        assert!(sched.tick(&mut task));
        assert!(sched.tick(&mut task));
        assert_eq!(task.0, 2);
        assert_eq!(sched.cycles(), 2);
        assert_eq!(sched.overruns(), 0);
    }

    #[test]
    fn overlapping_tick_is_dropped() {
        let sched = Scheduler::new(Cadence::from_millis(10));
        let mut task = Reentrant {
            sched: &sched,
            nested: None,
        };
        assert!(sched.tick(&mut task));
        assert_eq!(task.nested, Some(false));
        assert_eq!(sched.overruns(), 1);
        assert_eq!(sched.cycles(), 1);
    }

    #[test]
    fn budget_must_fit_in_period() {
        let sched = Scheduler::new(Cadence::from_millis(10));
        assert!(sched.admits::<Counter>());
        assert!(!sched.admits::<Reentrant<'_>>());
    }
}
