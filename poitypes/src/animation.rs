use derive_more::Display;
use serde::{Deserialize, Serialize};

/// One raw animation record from the definition feed.
///
/// Strings are kept as-is; `poidsl` turns them into typed values.
#[derive(Clone, PartialEq, Debug, Display, Deserialize, Serialize)]
#[display(
    fmt = "{{name: {}, type: {}, length: {}, delay: {}, ...}}",
    "name",
    "kind",
    "length",
    "delay"
)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationDefinition {
    pub name: String,
    /// Behavior keyword, e.g. `rotate`, `fade`
    #[serde(rename = "type")]
    pub kind: String,
    /// [s]
    pub length: f64,
    /// [s]
    pub delay: f64,
    /// Curve keyword, e.g. `linear`, `cyclic`
    pub interpolation: String,
    pub persisting: bool,
    pub repeating: bool,
    pub from: f64,
    pub to: f64,
    pub axis: Axis,
    /// Comma separated follow-up names
    pub followed_by: String,
    pub audio: Option<AudioSettings>,
}

impl Default for AnimationDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: String::new(),
            length: 1.0,
            delay: 0.0,
            interpolation: String::new(),
            persisting: false,
            repeating: false,
            from: 0.0,
            to: 1.0,
            axis: Axis::default(),
            followed_by: String::new(),
            audio: None,
        }
    }
}

#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Display, Deserialize, Serialize)]
#[display(fmt = "({}, {}, {})", "x", "y", "z")]
#[serde(default)]
pub struct Axis {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Axis {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<Axis> for na::Vector3<f64> {
    fn from(a: Axis) -> Self {
        na::Vector3::new(a.x, a.y, a.z)
    }
}

/// Audio overrides applied right before playback starts
#[derive(Copy, Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioSettings {
    pub volume: Option<f64>,
    pub spatial_blend: Option<f64>,
    pub rolloff: Option<AudioRolloff>,
    pub spatialize: Option<bool>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioRolloff {
    Linear,
    Logarithmic,
}
