//! Spherical-earth helpers for placing POIs around the device.

use crate::units::Length;
use poitypes::prelude::GeoAnchor;

/// Mean earth radius used for all placement math [m]
pub const EARTH_RADIUS_METERS: f64 = 6_367_000.0;

/// A WGS84-ish coordinate, in degrees.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }
}

impl From<&GeoAnchor> for GeoPoint {
    fn from(anchor: &GeoAnchor) -> Self {
        GeoPoint::new(anchor.latitude, anchor.longitude)
    }
}

/// Great-circle distance between two points, using the haversine formula.
pub fn distance(a: GeoPoint, b: GeoPoint) -> Length {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    Length::from_meters(EARTH_RADIUS_METERS * c)
}

/// East and north offsets of `target` as seen from `origin`, in meters.
///
/// Each axis is measured as a haversine distance along that axis alone and
/// then signed by the direction of the coordinate difference.
pub fn local_offset(origin: GeoPoint, target: GeoPoint) -> (f64, f64) {
    let north = distance(origin, GeoPoint::new(target.latitude, origin.longitude)).as_meters();
    let east = distance(origin, GeoPoint::new(origin.latitude, target.longitude)).as_meters();

    let north = if target.latitude < origin.latitude {
        -north
    } else {
        north
    };
    let east = if target.longitude < origin.longitude {
        -east
    } else {
        east
    };
    (east, north)
}

/// Moves an anchor by a metric offset, keeping its relative altitude.
pub fn offset_anchor(anchor: &GeoAnchor, east: f64, north: f64) -> GeoAnchor {
    let meters_per_degree = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;
    let cos_lat = anchor.latitude.to_radians().cos().abs().max(1e-6);
    GeoAnchor {
        latitude: anchor.latitude + north / meters_per_degree,
        longitude: anchor.longitude + east / (meters_per_degree * cos_lat),
        relative_altitude: anchor.relative_altitude,
    }
}
