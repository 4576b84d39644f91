//! Engine time and distance.
//!
//! Animation timing runs on integer [`Ticks`] at 10 MHz so that replays are
//! exact. [`Time`] is the floating point seconds value that configuration,
//! scripts and the clock conversions deal in.

use std::{
    fmt,
    ops::{Add, AddAssign, Mul, Sub},
};

/// Fixed-point clock resolution
pub const TICKS_PER_SECOND: i64 = 10_000_000;
const TICKS_PER_MILLI: i64 = TICKS_PER_SECOND / 1_000;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Ticks(i64);

impl fmt::Debug for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}t", self.0)
    }
}

impl Ticks {
    pub const ZERO: Ticks = Ticks(0);

    pub const fn from_ticks(ticks: i64) -> Ticks {
        Ticks(ticks)
    }

    pub fn from_secs(seconds: f64) -> Ticks {
        Ticks((seconds * TICKS_PER_SECOND as f64).round() as i64)
    }

    pub fn from_millis(millis: i64) -> Ticks {
        Ticks(millis.saturating_mul(TICKS_PER_MILLI))
    }

    pub fn from_time(t: Time) -> Ticks {
        Ticks::from_secs(t.as_secs())
    }

    pub const fn as_ticks(&self) -> i64 {
        self.0
    }

    pub fn as_secs(&self) -> f64 {
        self.0 as f64 / TICKS_PER_SECOND as f64
    }

    pub fn as_time(&self) -> Time {
        Time::from_secs(self.as_secs())
    }

    /// How far `self` is into a span of `whole`, unclamped. An empty span
    /// counts as already complete.
    pub fn fraction_of(self, whole: Ticks) -> f64 {
        if whole.0 == 0 {
            return 1.0;
        }
        self.0 as f64 / whole.0 as f64
    }
}

// Saturating so that "never" style far-future stamps don't wrap around
impl Add for Ticks {
    type Output = Ticks;

    fn add(self, rhs: Ticks) -> Ticks {
        Ticks(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Ticks) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Ticks {
    type Output = Ticks;

    fn sub(self, rhs: Ticks) -> Ticks {
        Ticks(self.0.saturating_sub(rhs.0))
    }
}

/// Stretches a span, e.g. for the duration multiplier
impl Mul<f64> for Ticks {
    type Output = Ticks;

    fn mul(self, factor: f64) -> Ticks {
        Ticks((self.0 as f64 * factor).round() as i64)
    }
}

#[derive(Copy, Clone, PartialEq, PartialOrd, Default)]
pub struct Time(f64);

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl Time {
    pub fn from_std_duration(d: std::time::Duration) -> Time {
        Time(d.as_secs_f64())
    }

    pub fn from_secs(seconds: f64) -> Time {
        Time(seconds)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }

    pub fn as_millis(&self) -> f64 {
        self.0 * 1_000.0
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time(self.0 + rhs.0)
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        self.0 += rhs.0;
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        Time(self.0 - rhs.0)
    }
}

/// Ground distance
#[derive(Copy, Clone, PartialEq, PartialOrd, Default)]
pub struct Length(f64);

impl fmt::Debug for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

impl Length {
    pub fn from_meters(meters: f64) -> Length {
        Length(meters)
    }

    pub fn as_meters(&self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tick_conversions() {
        assert_eq!(Ticks::from_secs(1.0).as_ticks(), TICKS_PER_SECOND);
        assert_eq!(Ticks::from_millis(250), Ticks::from_secs(0.25));
        assert_relative_eq!(Ticks::from_ticks(25_000_000).as_secs(), 2.5);
        assert_eq!(Ticks::from_secs(2.0) * 1.5, Ticks::from_secs(3.0));
        assert_relative_eq!(Ticks::from_time(Time::from_secs(0.5)).as_secs(), 0.5);
    }

    #[test]
    fn fraction_of_span() {
        let whole = Ticks::from_secs(4.0);
        assert_relative_eq!(Ticks::from_secs(1.0).fraction_of(whole), 0.25);
        assert_relative_eq!(Ticks::from_secs(6.0).fraction_of(whole), 1.5);
        assert_relative_eq!(Ticks::from_secs(1.0).fraction_of(Ticks::ZERO), 1.0);
    }

    #[test]
    fn tick_arithmetic_saturates() {
        let far = Ticks::from_ticks(i64::MAX);
        assert_eq!(far + Ticks::from_secs(1.0), far);
        let mut t = Ticks::from_ticks(i64::MAX - 1);
        t += Ticks::from_ticks(5);
        assert_eq!(t, far);
    }
}
