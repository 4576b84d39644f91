//! Deterministic draws from the engine's seeded prng

use crate::units::Time;
use oorandom::Rand64;
use std::ops::RangeInclusive;

/// Uniform wait in `range`, e.g. until the next periodic activation
pub fn gen_time(prng: &mut Rand64, range: &RangeInclusive<Time>) -> Time {
    let lo = range.start().as_secs();
    let hi = range.end().as_secs();
    Time::from_secs(lerp(lo, hi, prng.rand_float()))
}

/// Uniform offset in `[-spread, spread]`
pub fn gen_spread(prng: &mut Rand64, spread: f64) -> f64 {
    lerp(-spread, spread, prng.rand_float())
}

fn lerp(lo: f64, hi: f64, unit: f64) -> f64 {
    lo + (hi - lo) * unit
}
