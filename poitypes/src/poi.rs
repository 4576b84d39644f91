use crate::{anchor::GeoAnchor, animation::AnimationDefinition, category::EventCategory};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Upstream POI ids are positive, synthetic ids are negative
pub type PoiId = i64;

#[derive(Clone, PartialEq, Debug, Default, Display, Deserialize, Serialize)]
#[display(
    fmt = "{{id: {}, title: {}, parts: {}, ...}}",
    "id",
    "title",
    "parts.len()"
)]
#[serde(default, rename_all = "camelCase")]
pub struct PoiDefinition {
    pub id: PoiId,
    pub title: String,

    /// Absolute anchor, ignored when `relative_location` is set
    pub anchor: Option<GeoAnchor>,

    /// Offset from the viewer or parent, `"x,y,z"` in meters
    pub relative_location: Option<String>,

    /// Object is only enabled within this distance [m], 0 disables the check
    pub visibility_range: f64,

    pub animations: PoiAnimations,

    /// Sub-objects of a multi-part POI, placed relative to this one
    pub parts: Vec<PoiDefinition>,
}

impl PoiDefinition {
    /// Anchored to the viewer/parent frame rather than to a geo position
    pub fn is_relative(&self) -> bool {
        self.relative_location.is_some() || self.anchor.is_none()
    }

    pub fn animation_count(&self) -> usize {
        EventCategory::ALL
            .iter()
            .map(|c| self.animations.get(*c).len())
            .sum()
    }
}

#[derive(Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoiAnimations {
    pub on_create: Vec<AnimationDefinition>,
    pub on_focus: Vec<AnimationDefinition>,
    pub in_focus: Vec<AnimationDefinition>,
    pub on_click: Vec<AnimationDefinition>,
    pub in_time_window: Vec<AnimationDefinition>,
    pub while_enabled: Vec<AnimationDefinition>,
    pub when_activated: Vec<AnimationDefinition>,
    pub when_deactivated: Vec<AnimationDefinition>,
    pub periodic: Vec<AnimationDefinition>,
    pub billboard: Vec<AnimationDefinition>,
}

impl PoiAnimations {
    pub fn get(&self, category: EventCategory) -> &[AnimationDefinition] {
        use EventCategory::*;
        match category {
            OnCreate => &self.on_create,
            OnFocus => &self.on_focus,
            InFocus => &self.in_focus,
            OnClick => &self.on_click,
            InTimeWindow => &self.in_time_window,
            WhileEnabled => &self.while_enabled,
            WhenActivated => &self.when_activated,
            WhenDeactivated => &self.when_deactivated,
            Periodic => &self.periodic,
            Billboard => &self.billboard,
        }
    }

    pub fn get_mut(&mut self, category: EventCategory) -> &mut Vec<AnimationDefinition> {
        use EventCategory::*;
        match category {
            OnCreate => &mut self.on_create,
            OnFocus => &mut self.on_focus,
            InFocus => &mut self.in_focus,
            OnClick => &mut self.on_click,
            InTimeWindow => &mut self.in_time_window,
            WhileEnabled => &mut self.while_enabled,
            WhenActivated => &mut self.when_activated,
            WhenDeactivated => &mut self.when_deactivated,
            Periodic => &mut self.periodic,
            Billboard => &mut self.billboard,
        }
    }
}
