use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Absolute geographic anchor of a POI
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Display, Deserialize, Serialize)]
#[display(
    fmt = "{{lat: {}, lon: {}, alt: {}}}",
    "latitude",
    "longitude",
    "relative_altitude"
)]
#[serde(rename_all = "camelCase")]
pub struct GeoAnchor {
    /// [deg]
    pub latitude: f64,
    /// [deg]
    pub longitude: f64,
    /// Height above the device [m]
    #[serde(default)]
    pub relative_altitude: f64,
}

impl GeoAnchor {
    pub fn new(latitude: f64, longitude: f64, relative_altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            relative_altitude,
        }
    }
}
