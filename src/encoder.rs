// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Interrupt-driven quadrature decoding.
//!
//! Each encoder channel gets its own edge handler, firing on both rising and falling transitions.
//! On every edge the handler samples the current level of both channels and moves the shared
//! [`TickAccumulator`] by one tick:
//!
//! | edge on | levels equal | levels differ |
//! | ------- | ------------ | ------------- |
//! | A       | -1           | +1            |
//! | B       | +1           | -1            |
//!
//! This is a half-resolution decode driven purely by the relative phase at the triggering edge,
//! not a four-state Gray-code table. Edges that arrive closer together than the platform can
//! service both interrupts may be mis-resolved; that limit has to be checked against the
//! encoder's maximum tick rate.
//!
//! The handlers only ever see the accumulator, so an ISR built from an [`EdgeHandler`] cannot
//! touch any other controller state.

use portable_atomic::{AtomicI32, Ordering};

/// Encoder channel that produced an edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    A,
    B,
}

/// Instantaneous logic levels of both encoder channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Levels {
    pub a: bool,
    pub b: bool,
}

impl Levels {
    #[inline]
    pub const fn new(a: bool, b: bool) -> Self {
        Self { a, b }
    }
}

/// Signed tick contribution of one edge on `channel`, given the levels sampled in the handler.
#[inline]
pub const fn edge_delta(channel: Channel, levels: Levels) -> i32 {
    let equal = levels.a == levels.b;
    match channel {
        Channel::A => {
            if equal {
                -1
            } else {
                1
            }
        }
        Channel::B => {
            if equal {
                1
            } else {
                -1
            }
        }
    }
}

/// Signed tick counter shared between the edge handlers (writers) and the control loop (sole
/// drainer).
#[derive(Debug)]
pub struct TickAccumulator {
    ticks: AtomicI32,
}

impl Default for TickAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl TickAccumulator {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicI32::new(0),
        }
    }

    /// Add a signed number of ticks.
    #[inline]
    pub fn add(&self, delta: i32) {
        self.ticks.fetch_add(delta, Ordering::Relaxed);
    }

    /// Read the ticks seen since the last drain and reset the counter, as one atomic exchange.
    ///
    /// An edge landing concurrently is counted either in this drain or in the next one, never in
    /// both and never lost.
    #[inline]
    pub fn drain(&self) -> i32 {
        self.ticks.swap(0, Ordering::AcqRel)
    }

    /// Current pending count without draining it.
    #[inline]
    pub fn pending(&self) -> i32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Discard any pending ticks.
    #[inline]
    pub fn clear(&self) {
        self.ticks.store(0, Ordering::Release);
    }
}

/// Source of the current channel levels, read inside the edge interrupt.
///
/// On hardware this is a single GPIO input-data-register read.
pub trait LevelSource {
    fn levels(&self) -> Levels;
}

impl<F: Fn() -> Levels> LevelSource for F {
    #[inline]
    fn levels(&self) -> Levels {
        self()
    }
}

/// Edge handler bound to one channel and to nothing but the tick accumulator.
#[derive(Copy, Clone, Debug)]
pub struct EdgeHandler<'a> {
    channel: Channel,
    ticks: &'a TickAccumulator,
}

impl<'a> EdgeHandler<'a> {
    pub const fn new(channel: Channel, ticks: &'a TickAccumulator) -> Self {
        Self { channel, ticks }
    }

    /// Handle one transition on this handler's channel, given the levels sampled right now.
    #[inline]
    pub fn on_edge(&self, levels: Levels) {
        self.ticks.add(edge_delta(self.channel, levels));
    }

    /// Handle one transition, sampling the levels from `pins`.
    #[inline]
    pub fn on_edge_from<S: LevelSource>(&self, pins: &S) {
        self.on_edge(pins.levels());
    }
}

/// Both channel handlers of one encoder.
#[derive(Copy, Clone, Debug)]
pub struct QuadratureDecoder<'a> {
    pub a: EdgeHandler<'a>,
    pub b: EdgeHandler<'a>,
}

impl<'a> QuadratureDecoder<'a> {
    pub const fn new(ticks: &'a TickAccumulator) -> Self {
        Self {
            a: EdgeHandler::new(Channel::A, ticks),
            b: EdgeHandler::new(Channel::B, ticks),
        }
    }

    /// Dispatch an edge to the matching channel handler.
    #[inline]
    pub fn on_edge(&self, channel: Channel, levels: Levels) {
        match channel {
            Channel::A => self.a.on_edge(levels),
            Channel::B => self.b.on_edge(levels),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_a_counts_down_when_levels_match() {
        assert_eq!(edge_delta(Channel::A, Levels::new(false, false)), -1);
        assert_eq!(edge_delta(Channel::A, Levels::new(true, true)), -1);
        assert_eq!(edge_delta(Channel::A, Levels::new(true, false)), 1);
        assert_eq!(edge_delta(Channel::A, Levels::new(false, true)), 1);
    }

    #[test]
    fn channel_b_uses_the_inverted_rule() {
        assert_eq!(edge_delta(Channel::B, Levels::new(false, false)), 1);
        assert_eq!(edge_delta(Channel::B, Levels::new(true, true)), 1);
        assert_eq!(edge_delta(Channel::B, Levels::new(true, false)), -1);
        assert_eq!(edge_delta(Channel::B, Levels::new(false, true)), -1);
    }

    /// Walk one full quadrature cycle forward, then the same cycle backwards.
    #[test]
    fn full_cycle_counts_four_each_way() {
        let ticks = TickAccumulator::new();
        let dec = QuadratureDecoder::new(&ticks);

        // A leads B: 00 -> 10 -> 11 -> 01 -> 00
        dec.on_edge(Channel::A, Levels::new(true, false));
        dec.on_edge(Channel::B, Levels::new(true, true));
        dec.on_edge(Channel::A, Levels::new(false, true));
        dec.on_edge(Channel::B, Levels::new(false, false));
        assert_eq!(ticks.drain(), 4);

        // B leads A: 00 -> 01 -> 11 -> 10 -> 00
        dec.on_edge(Channel::B, Levels::new(false, true));
        dec.on_edge(Channel::A, Levels::new(true, true));
        dec.on_edge(Channel::B, Levels::new(true, false));
        dec.on_edge(Channel::A, Levels::new(false, false));
        assert_eq!(ticks.drain(), -4);
    }

    #[test]
    fn drain_resets_the_counter() {
        let ticks = TickAccumulator::new();
        ticks.add(7);
        ticks.add(-2);
        assert_eq!(ticks.pending(), 5);
        assert_eq!(ticks.drain(), 5);
        assert_eq!(ticks.drain(), 0);
    }

    #[test]
    fn handler_samples_levels_from_source() {
        let ticks = TickAccumulator::new();
        let handler = EdgeHandler::new(Channel::A, &ticks);
        let pins = || Levels::new(true, false);

        handler.on_edge_from(&pins);
        handler.on_edge_from(&pins);
        assert_eq!(ticks.drain(), 2);
    }
}
