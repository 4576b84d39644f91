//! The engine's view of a renderable scene node.
//!
//! The host rendering system implements [`SceneNode`] for whatever it uses to
//! draw a POI; the engine only ever manipulates nodes through this trait.

use na::{UnitQuaternion, Vector3};
use poitypes::prelude::{AudioRolloff, PoiDefinition, PoiId};

pub trait SceneNode: std::fmt::Debug {
    /// Local position inside the placement wrapper
    fn position(&self) -> Vector3<f64>;
    fn set_position(&mut self, position: Vector3<f64>);

    fn rotation(&self) -> UnitQuaternion<f64>;
    fn set_rotation(&mut self, rotation: UnitQuaternion<f64>);

    fn scale(&self) -> Vector3<f64>;
    fn set_scale(&mut self, scale: Vector3<f64>);

    fn is_enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);

    /// Material alpha, `None` when the node has nothing to fade
    fn alpha(&self) -> Option<f64>;
    fn set_alpha(&mut self, alpha: f64);

    /// Audio source volume, `None` when the node has no audio source
    fn volume(&self) -> Option<f64>;
    fn set_volume(&mut self, volume: f64);

    fn spatial_blend(&self) -> Option<f64>;
    fn set_spatial_blend(&mut self, blend: f64);

    fn set_rolloff(&mut self, rolloff: AudioRolloff);
    fn set_spatialize(&mut self, spatialize: bool);
    fn play_audio(&mut self);

    /// Offset and uniform scale of the wrapper the geo projector moves around
    fn placement(&self) -> (Vector3<f64>, f64);
    fn set_placement(&mut self, offset: Vector3<f64>, scale: f64);

    fn world_position(&self) -> Vector3<f64> {
        let (offset, scale) = self.placement();
        offset + self.position() * scale
    }
}

/// Builds the host-side node for a POI when it enters the registry.
pub trait NodeFactory {
    fn create_node(&mut self, id: PoiId, definition: &PoiDefinition) -> Box<dyn SceneNode>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSource {
    pub volume: f64,
    pub spatial_blend: f64,
    pub rolloff: AudioRolloff,
    pub spatialize: bool,
    pub plays: usize,
}

impl Default for AudioSource {
    fn default() -> Self {
        AudioSource {
            volume: 1.0,
            spatial_blend: 0.0,
            rolloff: AudioRolloff::Logarithmic,
            spatialize: false,
            plays: 0,
        }
    }
}

/// A node with no renderer behind it, used headless and in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryNode {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub scale: Vector3<f64>,
    pub enabled: bool,
    pub alpha: Option<f64>,
    pub audio: Option<AudioSource>,
    pub placement_offset: Vector3<f64>,
    pub placement_scale: f64,
}

impl Default for MemoryNode {
    fn default() -> Self {
        MemoryNode {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
            enabled: true,
            alpha: Some(1.0),
            audio: Some(AudioSource::default()),
            placement_offset: Vector3::zeros(),
            placement_scale: 1.0,
        }
    }
}

impl SceneNode for MemoryNode {
    fn position(&self) -> Vector3<f64> {
        self.position
    }

    fn set_position(&mut self, position: Vector3<f64>) {
        self.position = position;
    }

    fn rotation(&self) -> UnitQuaternion<f64> {
        self.rotation
    }

    fn set_rotation(&mut self, rotation: UnitQuaternion<f64>) {
        self.rotation = rotation;
    }

    fn scale(&self) -> Vector3<f64> {
        self.scale
    }

    fn set_scale(&mut self, scale: Vector3<f64>) {
        self.scale = scale;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn alpha(&self) -> Option<f64> {
        self.alpha
    }

    fn set_alpha(&mut self, alpha: f64) {
        if let Some(a) = self.alpha.as_mut() {
            *a = alpha;
        }
    }

    fn volume(&self) -> Option<f64> {
        self.audio.map(|a| a.volume)
    }

    fn set_volume(&mut self, volume: f64) {
        if let Some(a) = self.audio.as_mut() {
            a.volume = volume;
        }
    }

    fn spatial_blend(&self) -> Option<f64> {
        self.audio.map(|a| a.spatial_blend)
    }

    fn set_spatial_blend(&mut self, blend: f64) {
        if let Some(a) = self.audio.as_mut() {
            a.spatial_blend = blend;
        }
    }

    fn set_rolloff(&mut self, rolloff: AudioRolloff) {
        if let Some(a) = self.audio.as_mut() {
            a.rolloff = rolloff;
        }
    }

    fn set_spatialize(&mut self, spatialize: bool) {
        if let Some(a) = self.audio.as_mut() {
            a.spatialize = spatialize;
        }
    }

    fn play_audio(&mut self) {
        if let Some(a) = self.audio.as_mut() {
            a.plays += 1;
        }
    }

    fn placement(&self) -> (Vector3<f64>, f64) {
        (self.placement_offset, self.placement_scale)
    }

    fn set_placement(&mut self, offset: Vector3<f64>, scale: f64) {
        self.placement_offset = offset;
        self.placement_scale = scale;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryNodeFactory;

impl NodeFactory for MemoryNodeFactory {
    fn create_node(&mut self, _id: PoiId, _definition: &PoiDefinition) -> Box<dyn SceneNode> {
        Box::<MemoryNode>::default()
    }
}
