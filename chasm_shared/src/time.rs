//! Game time.
//!
//! `GameTime` is an opaque microsecond count. It is used both as a point in
//! game time (since server start) and as a duration; subtracting two points
//! yields a duration. Nothing here reads the platform clock, so simulation
//! stays reproducible from a tick count alone.

use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

const MICROS_PER_SECOND: f64 = 1_000_000.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct GameTime(i64);

impl GameTime {
    pub const ZERO: Self = Self(0);

    pub fn from_seconds(seconds: f64) -> Self {
        Self((seconds * MICROS_PER_SECOND).round() as i64)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis * 1000)
    }

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Length of one tick at the given rate.
    pub fn from_tick_rate(tick_hz: u32) -> Self {
        Self::from_seconds(1.0 / f64::from(tick_hz.max(1)))
    }

    pub fn to_seconds(self) -> f64 {
        self.0 as f64 / MICROS_PER_SECOND
    }

    pub fn to_seconds_f32(self) -> f32 {
        self.to_seconds() as f32
    }

    pub const fn as_micros(self) -> i64 {
        self.0
    }
}

impl Add for GameTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for GameTime {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for GameTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}
