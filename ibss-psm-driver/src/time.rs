//! Timer ticks tagged with the [`Frequency`] of the timer they come from.
//!
//! Stations keep all beacon-interval arithmetic in [`Microseconds`], which
//! represent a TU (1024 µs) exactly. Deadlines only move forward: an
//! [`Instant`] can be advanced by a [`Duration`], durations add up and scale.

use core::marker::PhantomData;

use crate::constants::TU_MICROS;

const MICROS_PER_SECOND: i64 = 1_000_000;

pub trait Frequency {
    const FREQUENCY: u32;
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub struct Microseconds;

impl Frequency for Microseconds {
    const FREQUENCY: u32 = 1_000_000;
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub struct Instant<F: Frequency> {
    tick: u64,
    frequency: PhantomData<F>,
}

impl<F: Frequency> Instant<F> {
    pub const fn new(tick: u64) -> Self {
        Self {
            tick,
            frequency: PhantomData,
        }
    }

    pub const fn tick(&self) -> u64 {
        self.tick
    }
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub struct Duration<F: Frequency> {
    ticks: i64,
    frequency: PhantomData<F>,
}

impl<F: Frequency> Duration<F> {
    pub const ZERO: Self = Self::new(0);

    pub const fn new(ticks: i64) -> Self {
        Self {
            ticks,
            frequency: PhantomData,
        }
    }

    /// Creates a duration of the given number of 802.11 time units, rounded
    /// down to whole ticks.
    pub const fn from_tu(tu: u16) -> Self {
        Self::new(tu as i64 * TU_MICROS * F::FREQUENCY as i64 / MICROS_PER_SECOND)
    }

    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    const fn as_micros(&self) -> i64 {
        self.ticks * MICROS_PER_SECOND / F::FREQUENCY as i64
    }

    /// Number of whole time units in this duration.
    pub const fn as_tu(&self) -> i64 {
        self.as_micros() / TU_MICROS
    }
}

impl<F: Frequency> core::ops::Add<Duration<F>> for Instant<F> {
    type Output = Self;

    /// Saturates at the ends of the tick range.
    fn add(self, rhs: Duration<F>) -> Self::Output {
        let tick = if rhs.ticks >= 0 {
            self.tick.saturating_add(rhs.ticks as u64)
        } else {
            self.tick.saturating_sub(rhs.ticks.unsigned_abs())
        };
        Self::new(tick)
    }
}

impl<F: Frequency> core::ops::Add for Duration<F> {
    type Output = Self;

    fn add(self, rhs: Duration<F>) -> Self::Output {
        Self::new(self.ticks + rhs.ticks)
    }
}

impl<F: Frequency> core::ops::Mul<u32> for Duration<F> {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        Self::new(self.ticks * rhs as i64)
    }
}

impl<F: Frequency> core::fmt::Display for Instant<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "tick {}", self.tick)
    }
}

impl<F: Frequency> core::fmt::Display for Duration<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} µs", self.as_micros())
    }
}
