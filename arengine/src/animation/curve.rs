//! Progress shaping

use poidsl::Interpolation;
use std::f64::consts::PI;

/// Maps linear progress in `[0, 1]` to the animated value between `from` and `to`.
///
/// The shaped progress is used by magnitude, so curves that dip negative
/// still land between the two endpoints.
pub fn factor(interpolation: Interpolation, from: f64, to: f64, progress: f64) -> f64 {
    let (from, to, shaped) = match interpolation {
        Interpolation::Linear => (from, to, progress),
        // Out and back: the second half runs the first half in reverse
        Interpolation::Cyclic if progress >= 0.5 => (to, from, (progress - 0.5) * 2.0),
        Interpolation::Cyclic => (from, to, progress * 2.0),
        Interpolation::Halfsine => (from, to, (PI * progress).sin()),
        Interpolation::Smooth => (from, to, ((PI * progress).cos() - 1.0) / 2.0),
        Interpolation::Sine => (from, to, ((2.0 * PI * progress).cos() - 1.0) / 2.0),
    };
    from + (to - from) * shaped.abs()
}
