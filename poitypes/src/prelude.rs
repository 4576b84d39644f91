pub use crate::anchor::GeoAnchor;
pub use crate::animation::{AnimationDefinition, AudioRolloff, AudioSettings, Axis};
pub use crate::category::EventCategory;
pub use crate::poi::{PoiAnimations, PoiDefinition, PoiId};
