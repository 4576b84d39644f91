//! One-dimensional Kalman smoothing of raw device fixes

use super::math::GeoPoint;
use tracing::{debug, trace};

/// Fixes are never trusted more than this [m]
pub const MIN_ACCURACY_METERS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// When disabled, fixes pass through unchanged
    pub enabled: bool,

    /// Expected device speed, grows the variance between fixes [m/s]
    pub process_noise: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            enabled: true,
            process_noise: 3.0,
        }
    }
}

/// A raw location sample as delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius [m]
    pub accuracy: f64,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone)]
pub struct PositionFilter {
    config: FilterConfig,
    estimate: GeoPoint,
    /// Negative until the first fix arrives
    variance: f64,
    timestamp_ms: i64,
}

impl PositionFilter {
    pub fn new(config: FilterConfig) -> Self {
        PositionFilter {
            config,
            estimate: GeoPoint::default(),
            variance: -1.0,
            timestamp_ms: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn reset(&mut self) {
        self.variance = -1.0;
        self.timestamp_ms = 0;
        self.estimate = GeoPoint::default();
    }

    /// Current estimate, `None` before the first fix.
    pub fn position(&self) -> Option<GeoPoint> {
        (self.variance >= 0.0).then_some(self.estimate)
    }

    pub fn variance(&self) -> Option<f64> {
        (self.variance >= 0.0).then_some(self.variance)
    }

    pub fn update(&mut self, fix: &LocationFix) -> GeoPoint {
        let raw = GeoPoint::new(fix.latitude, fix.longitude);
        if !self.config.enabled {
            self.estimate = raw;
            return raw;
        }

        let accuracy = fix.accuracy.max(MIN_ACCURACY_METERS);
        if self.variance < 0.0 {
            self.timestamp_ms = fix.timestamp_ms;
            self.estimate = raw;
            self.variance = accuracy * accuracy;
            debug!(
                latitude = raw.latitude,
                longitude = raw.longitude,
                accuracy,
                "Position filter initialized"
            );
            return self.estimate;
        }

        let dt_ms = fix.timestamp_ms - self.timestamp_ms;
        if dt_ms > 0 {
            let q = self.config.process_noise;
            self.variance += dt_ms as f64 / 1000.0 * q * q;
            self.timestamp_ms = fix.timestamp_ms;
        }

        let gain = self.variance / (self.variance + accuracy * accuracy);
        self.estimate.latitude += gain * (raw.latitude - self.estimate.latitude);
        self.estimate.longitude += gain * (raw.longitude - self.estimate.longitude);
        self.variance *= 1.0 - gain;

        trace!(
            latitude = self.estimate.latitude,
            longitude = self.estimate.longitude,
            variance = self.variance,
            gain,
            "Position filter updated"
        );

        self.estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fix(latitude: f64, longitude: f64, accuracy: f64, timestamp_ms: i64) -> LocationFix {
        LocationFix {
            latitude,
            longitude,
            accuracy,
            timestamp_ms,
        }
    }

    #[test]
    fn first_fix_initializes() {
        let mut f = PositionFilter::new(FilterConfig::default());
        assert!(f.position().is_none());
        let p = f.update(&fix(48.0, 16.0, 0.2, 1000));
        assert_eq!(p, GeoPoint::new(48.0, 16.0));
        // Accuracy is clamped to 1 m
        assert_relative_eq!(f.variance().unwrap(), 1.0);
    }

    #[test]
    fn repeated_fixes_converge_with_non_increasing_variance() {
        let mut f = PositionFilter::new(FilterConfig::default());
        f.update(&fix(48.0, 16.0, 10.0, 0));
        let mut prev = f.variance().unwrap();
        for _ in 0..50 {
            let p = f.update(&fix(48.001, 16.001, 10.0, 0));
            let v = f.variance().unwrap();
            assert!(v <= prev);
            prev = v;
            assert!(p.latitude <= 48.001);
        }
        let p = f.position().unwrap();
        assert_relative_eq!(p.latitude, 48.001, epsilon = 1e-4);
        assert_relative_eq!(p.longitude, 16.001, epsilon = 1e-4);
    }

    #[test]
    fn converges_within_ten_fixes_at_five_meters() {
        let mut f = PositionFilter::new(FilterConfig::default());
        // A poor first fix 0.01 degrees off
        f.update(&fix(48.01, 16.01, 50.0, 1000));
        let accuracies = [40.0, 30.0, 20.0, 10.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0];
        let mut prev = f.variance().unwrap();
        for accuracy in accuracies {
            f.update(&fix(48.0, 16.0, accuracy, 1000));
            let v = f.variance().unwrap();
            assert!(v <= prev);
            prev = v;
        }
        let p = f.position().unwrap();
        assert_relative_eq!(p.latitude, 48.0, max_relative = 0.01);
        assert_relative_eq!(p.longitude, 16.0, max_relative = 0.01);
        // Within 1% of the initial error, too
        assert!((p.latitude - 48.0).abs() < 0.01 * 0.01);
        assert!((p.longitude - 16.0).abs() < 0.01 * 0.01);
    }

    #[test]
    fn variance_grows_only_when_time_advances() {
        let mut f = PositionFilter::new(FilterConfig::default());
        f.update(&fix(0.0, 0.0, 5.0, 1000));
        f.update(&fix(0.0, 0.0, 5.0, 500));
        let stale = f.variance().unwrap();
        // k = 25 / 50, so the variance halves
        assert_relative_eq!(stale, 12.5);

        f.update(&fix(0.0, 0.0, 5.0, 2000));
        // 12.5 + 1 s * 3^2 = 21.5, then k = 21.5 / 46.5
        assert_relative_eq!(f.variance().unwrap(), 21.5 * (1.0 - 21.5 / 46.5));
    }

    #[test]
    fn disabled_filter_passes_fixes_through() {
        let mut f = PositionFilter::new(FilterConfig {
            enabled: false,
            process_noise: 3.0,
        });
        f.update(&fix(1.0, 1.0, 10.0, 0));
        let p = f.update(&fix(2.0, 3.0, 10.0, 1));
        assert_eq!(p, GeoPoint::new(2.0, 3.0));
        assert!(f.variance().is_none());
    }
}
