//! What an animation does with its factor

use crate::scene::SceneNode;
use na::{Unit, UnitQuaternion, Vector3};
use poidsl::BehaviorKind;

/// A behavior kind bound to its axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Transform { axis: Vector3<f64> },
    Rotate { axis: Vector3<f64> },
    Scale { axis: Vector3<f64> },
    Destroy,
    Duplicate,
    Fade,
    Grow,
    Volume,
    SpatialBlend,
    Buzz,
}

/// The single mutation one animation makes in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SideEffect {
    /// Offset from the rest position
    Translate(Vector3<f64>),
    /// Applied on top of the rest rotation
    Rotate(UnitQuaternion<f64>),
    /// Absolute scale, per axis
    Scale(Vector3<f64>),
    Alpha(f64),
    Volume(f64),
    SpatialBlend(f64),
    Destroy,
    Duplicate,
    Buzz,
}

impl Behavior {
    pub fn new(kind: BehaviorKind, axis: Vector3<f64>) -> Self {
        match kind {
            BehaviorKind::Transform => Behavior::Transform { axis },
            BehaviorKind::Rotate => Behavior::Rotate { axis },
            BehaviorKind::Scale => Behavior::Scale { axis },
            BehaviorKind::Destroy => Behavior::Destroy,
            BehaviorKind::Duplicate => Behavior::Duplicate,
            BehaviorKind::Fade => Behavior::Fade,
            BehaviorKind::Grow => Behavior::Grow,
            BehaviorKind::Volume => Behavior::Volume,
            BehaviorKind::SpatialBlend => Behavior::SpatialBlend,
            BehaviorKind::Buzz => Behavior::Buzz,
        }
    }

    pub fn apply(&self, factor: f64) -> SideEffect {
        match *self {
            Behavior::Transform { axis } => SideEffect::Translate(axis * factor),
            Behavior::Rotate { axis } => SideEffect::Rotate(
                Unit::try_new(axis, f64::EPSILON)
                    .map(|axis| UnitQuaternion::from_axis_angle(&axis, factor.to_radians()))
                    .unwrap_or_else(UnitQuaternion::identity),
            ),
            Behavior::Scale { axis } => {
                SideEffect::Scale(axis.map(|a| 1.0 + a * (factor - 1.0)))
            }
            Behavior::Grow => SideEffect::Scale(Vector3::repeat(factor)),
            Behavior::Fade => SideEffect::Alpha(factor.clamp(0.0, 1.0)),
            Behavior::Volume => SideEffect::Volume(factor.clamp(0.0, 1.0)),
            Behavior::SpatialBlend => SideEffect::SpatialBlend(factor.clamp(0.0, 1.0)),
            Behavior::Destroy => SideEffect::Destroy,
            Behavior::Duplicate => SideEffect::Duplicate,
            Behavior::Buzz => SideEffect::Buzz,
        }
    }
}

/// Node attributes as they were before an animation first touched them.
///
/// Each one is captured lazily, so animations only ever restore what they changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestState {
    position: Option<Vector3<f64>>,
    rotation: Option<UnitQuaternion<f64>>,
    scale: Option<Vector3<f64>>,
    alpha: Option<f64>,
    volume: Option<f64>,
    spatial_blend: Option<f64>,
}

impl RestState {
    /// Writes a node-level side effect, capturing the rest value on first
    /// use. Effects that are not node mutations are ignored.
    pub fn apply(&mut self, effect: SideEffect, node: &mut dyn SceneNode) {
        match effect {
            SideEffect::Translate(offset) => {
                let rest = *self.position.get_or_insert_with(|| node.position());
                node.set_position(rest + offset);
            }
            SideEffect::Rotate(rotation) => {
                let rest = *self.rotation.get_or_insert_with(|| node.rotation());
                node.set_rotation(rest * rotation);
            }
            SideEffect::Scale(scale) => {
                let rest = *self.scale.get_or_insert_with(|| node.scale());
                node.set_scale(rest.component_mul(&scale));
            }
            SideEffect::Alpha(alpha) => {
                let Some(current) = node.alpha() else {
                    return;
                };
                self.alpha.get_or_insert(current);
                node.set_alpha(alpha);
            }
            SideEffect::Volume(volume) => {
                let Some(current) = node.volume() else {
                    return;
                };
                self.volume.get_or_insert(current);
                node.set_volume(volume);
            }
            SideEffect::SpatialBlend(blend) => {
                let Some(current) = node.spatial_blend() else {
                    return;
                };
                self.spatial_blend.get_or_insert(current);
                node.set_spatial_blend(blend);
            }
            SideEffect::Destroy | SideEffect::Duplicate | SideEffect::Buzz => (),
        }
    }

    /// Restores everything that was captured and forgets it.
    pub fn revert(&mut self, node: &mut dyn SceneNode) {
        let rest = std::mem::take(self);
        if let Some(p) = rest.position {
            node.set_position(p);
        }
        if let Some(r) = rest.rotation {
            node.set_rotation(r);
        }
        if let Some(s) = rest.scale {
            node.set_scale(s);
        }
        if let Some(a) = rest.alpha {
            node.set_alpha(a);
        }
        if let Some(v) = rest.volume {
            node.set_volume(v);
        }
        if let Some(b) = rest.spatial_blend {
            node.set_spatial_blend(b);
        }
    }
}
