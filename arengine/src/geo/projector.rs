//! Maps geo anchors into the local frame around the device

use super::math::{distance, local_offset, GeoPoint};
use crate::{registry::SceneObjectRegistry, units::Time, FrameComponent};
use na::Vector3;
use tracing::debug;

/// Clearance below which objects near a tile edge are scaled down [m]
pub const EDGE_FADE_METERS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectorConfig {
    /// North/south tile footprint, wrapping is disabled when zero [m]
    pub area_size: f64,
    /// East/west tile footprint, wrapping is disabled when zero [m]
    pub area_width: f64,
    /// Multiplier on an object's visibility range
    pub visibility_tolerance: f64,
    /// Fraction of the remaining distance covered each frame
    pub position_lerp: f64,
    /// Objects jump instead of sliding when further than this fraction of the tile
    pub jump_fraction: f64,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        ProjectorConfig {
            area_size: 0.0,
            area_width: 0.0,
            visibility_tolerance: 1.25,
            position_lerp: 0.1,
            jump_fraction: 0.75,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectorEnvironment {
    /// Filtered device position, `None` until the first fix
    pub device: Option<GeoPoint>,
}

#[derive(Debug, Clone)]
pub struct GeoProjector {
    config: ProjectorConfig,
}

/// Wraps an offset into `[-extent/2, extent/2)`. A non-positive extent disables wrapping.
pub fn wrap(value: f64, extent: f64) -> f64 {
    if extent <= 0.0 {
        return value;
    }
    let half = extent / 2.0;
    (value + half).rem_euclid(extent) - half
}

/// Scale applied to a wrapped offset so objects shrink to nothing at the tile edge.
pub fn edge_scale(wrapped: f64, extent: f64) -> f64 {
    if extent <= 0.0 {
        return 1.0;
    }
    let clearance = extent / 2.0 - wrapped.abs();
    if clearance < EDGE_FADE_METERS {
        (clearance / EDGE_FADE_METERS).max(0.0)
    } else {
        1.0
    }
}

impl GeoProjector {
    pub fn new(config: ProjectorConfig) -> Self {
        GeoProjector { config }
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    /// Local target offset and edge scale for an anchor seen from `device`.
    ///
    /// x is east, y is the anchor's relative altitude, z is north.
    pub fn project(
        &self,
        device: GeoPoint,
        anchor: GeoPoint,
        altitude: f64,
    ) -> (Vector3<f64>, f64) {
        let (east, north) = local_offset(device, anchor);
        let x = wrap(east, self.config.area_width);
        let z = wrap(north, self.config.area_size);
        let scale =
            edge_scale(x, self.config.area_width).min(edge_scale(z, self.config.area_size));
        (Vector3::new(x, altitude, z), scale)
    }

    /// Recomputes targets and range-based visibility for every placed object.
    pub fn place(&self, registry: &mut SceneObjectRegistry, device: Option<GeoPoint>) {
        let tolerance = self.config.visibility_tolerance;

        if let Some(device) = device {
            for id in registry.placed_objects().to_vec() {
                let Some(obj) = registry.get_mut(id) else {
                    continue;
                };
                let Some(anchor) = obj.anchor else {
                    continue;
                };
                let anchor_point = GeoPoint::from(&anchor);

                let range = obj.definition.visibility_range;
                if range > 0.0 {
                    let d = distance(device, anchor_point).as_meters();
                    let in_range = d <= tolerance * range;
                    if obj.placement.in_range != Some(in_range) {
                        debug!(id, distance = d, range, in_range, "Visibility changed");
                        obj.placement.in_range = Some(in_range);
                        obj.node_mut().set_enabled(in_range);
                    }
                }

                let (target, scale) =
                    self.project(device, anchor_point, anchor.relative_altitude);
                obj.placement.target = target;
                obj.placement.scale = scale;
                obj.placement.targeted = true;
            }
        }

        for id in registry.relative_objects().to_vec() {
            if let Some(obj) = registry.get_mut(id) {
                obj.placement.target = obj.relative_offset.unwrap_or_else(Vector3::zeros);
                obj.placement.scale = 1.0;
                obj.placement.targeted = true;
            }
        }
    }

    /// Moves every object a step toward its target and writes the placement to its node.
    pub fn advance(&self, registry: &mut SceneObjectRegistry) {
        let roots: Vec<_> = registry
            .placed_objects()
            .iter()
            .chain(registry.relative_objects().iter())
            .copied()
            .collect();

        for id in roots {
            let Some(obj) = registry.get_mut(id) else {
                continue;
            };
            // Geo objects stay put until the first fix gives them a target
            if !obj.placement.targeted {
                continue;
            }

            let p = &mut obj.placement;
            let delta = p.target - p.current;
            if !p.placed || self.should_jump(&delta) {
                p.current = p.target;
                p.placed = true;
            } else {
                p.current += delta * self.config.position_lerp;
            }
            let (current, scale) = (p.current, p.scale);
            obj.node_mut().set_placement(current, scale);

            for child in registry.subtree(id).into_iter().skip(1) {
                let Some(parent_offset) = registry
                    .get(child)
                    .and_then(|c| c.parent)
                    .and_then(|parent| registry.get(parent))
                    .map(|parent| parent.placement.current)
                else {
                    continue;
                };
                if let Some(c) = registry.get_mut(child) {
                    let offset =
                        parent_offset + c.relative_offset.unwrap_or_else(Vector3::zeros);
                    c.placement.current = offset;
                    c.placement.target = offset;
                    c.placement.scale = scale;
                    c.placement.placed = true;
                    c.placement.targeted = true;
                    c.node_mut().set_placement(offset, scale);
                }
            }
        }
    }

    fn should_jump(&self, delta: &Vector3<f64>) -> bool {
        let f = self.config.jump_fraction;
        (self.config.area_width > 0.0 && delta.x.abs() > f * self.config.area_width)
            || (self.config.area_size > 0.0 && delta.z.abs() > f * self.config.area_size)
    }
}

impl<'a> FrameComponent<'a> for GeoProjector {
    type SharedState = SceneObjectRegistry;
    type Environment = ProjectorEnvironment;

    fn step(
        &mut self,
        _dt: Time,
        env: &'a ProjectorEnvironment,
        registry: &mut SceneObjectRegistry,
    ) {
        self.place(registry, env.device);
        self.advance(registry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryNodeFactory;
    use approx::assert_relative_eq;
    use poitypes::prelude::{GeoAnchor, PoiDefinition};

    #[test]
    fn wrap_into_centered_tile() {
        assert_relative_eq!(wrap(11.0, 20.0), -9.0);
        assert_relative_eq!(wrap(-11.0, 20.0), 9.0);
        assert_relative_eq!(wrap(5.0, 20.0), 5.0);
        assert_relative_eq!(wrap(47.0, 0.0), 47.0);
    }

    #[test]
    fn edge_fade_scales_near_boundary() {
        assert_relative_eq!(edge_scale(5.0, 20.0), 1.0);
        assert_relative_eq!(edge_scale(9.5, 20.0), 0.5);
        assert_relative_eq!(edge_scale(-9.75, 20.0), 0.25);
        assert_relative_eq!(edge_scale(123.0, 0.0), 1.0);
    }

    fn registry_with(def: PoiDefinition) -> SceneObjectRegistry {
        let mut reg = SceneObjectRegistry::new(Box::new(MemoryNodeFactory));
        reg.insert(def).unwrap();
        reg.set_ar_objects_to_place();
        reg
    }

    #[test]
    fn visibility_uses_tolerance() {
        // ~111 m north of the device
        let mut reg = registry_with(PoiDefinition {
            id: 1,
            anchor: Some(GeoAnchor::new(0.001, 0.0, 0.0)),
            visibility_range: 100.0,
            ..Default::default()
        });
        let projector = GeoProjector::new(ProjectorConfig::default());
        projector.place(&mut reg, Some(GeoPoint::new(0.0, 0.0)));
        assert!(reg.node(1).unwrap().is_enabled());

        let projector = GeoProjector::new(ProjectorConfig {
            visibility_tolerance: 1.0,
            ..Default::default()
        });
        projector.place(&mut reg, Some(GeoPoint::new(0.0, 0.0)));
        assert!(!reg.node(1).unwrap().is_enabled());
    }

    #[test]
    fn first_placement_jumps_then_lerps() {
        let mut reg = registry_with(PoiDefinition {
            id: 1,
            anchor: Some(GeoAnchor::new(0.0, 0.0001, 2.0)),
            ..Default::default()
        });
        let mut projector = GeoProjector::new(ProjectorConfig::default());
        let env = ProjectorEnvironment {
            device: Some(GeoPoint::new(0.0, 0.0)),
        };
        projector.step(Time::from_secs(0.1), &env, &mut reg);
        let first = reg.get(1).unwrap().placement;
        assert_eq!(first.current, first.target);
        assert_relative_eq!(first.current.y, 2.0);
        assert_relative_eq!(first.current.x, 11.11, max_relative = 0.01);

        let env = ProjectorEnvironment {
            device: Some(GeoPoint::new(0.0, 0.0001)),
        };
        projector.step(Time::from_secs(0.1), &env, &mut reg);
        let second = reg.get(1).unwrap().placement;
        assert_relative_eq!(second.current.x, first.current.x * 0.9, max_relative = 1e-6);
        assert_eq!(reg.node(1).unwrap().placement().0, second.current);
    }

    #[test]
    fn large_moves_jump_across_the_tile() {
        let mut reg = registry_with(PoiDefinition {
            id: 1,
            anchor: Some(GeoAnchor::new(0.0, 0.0, 0.0)),
            ..Default::default()
        });
        let projector = GeoProjector::new(ProjectorConfig {
            area_width: 20.0,
            area_size: 20.0,
            ..Default::default()
        });
        {
            let obj = reg.get_mut(1).unwrap();
            obj.placement.placed = true;
            obj.placement.targeted = true;
            obj.placement.current = Vector3::new(-9.0, 0.0, 0.0);
            obj.placement.target = Vector3::new(9.0, 0.0, 0.0);
        }
        projector.advance(&mut reg);
        assert_relative_eq!(reg.get(1).unwrap().placement.current.x, 9.0);
    }

    #[test]
    fn parts_follow_their_parent() {
        let mut reg = registry_with(PoiDefinition {
            id: 1,
            relative_location: Some("1,0,2".to_owned()),
            parts: vec![PoiDefinition {
                relative_location: Some("0,3,0".to_owned()),
                ..Default::default()
            }],
            ..Default::default()
        });
        let projector = GeoProjector::new(ProjectorConfig::default());
        projector.place(&mut reg, None);
        projector.advance(&mut reg);
        assert_eq!(reg.get(-1).unwrap().placement.current, Vector3::new(1.0, 3.0, 2.0));
    }
}
