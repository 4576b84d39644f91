//! Evaluates every animation of the current object population once per frame.
//!
//! Animations are stored by id and grouped by event category. Each pass
//! walks the categories in a fixed order to decide which animations start
//! or stop, then advances every animation exactly once, then walks the
//! follow-up chains of whatever stopped. Structural changes requested by
//! animations (destroy, duplicate) are only applied after evaluation.

use crate::{
    animation::{Animation, AnimationContext},
    host::{EngineHost, HitTester},
    random::gen_time,
    registry::SceneObjectRegistry,
    scene::SceneNode,
    units::{Ticks, Time},
};
use na::{Point2, UnitQuaternion, Vector3};
use oorandom::Rand64;
use poidsl::{Action, ChainEntry};
use poitypes::prelude::{EventCategory, PoiDefinition, PoiId};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    ops::RangeInclusive,
};
use tracing::{debug, trace};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct AnimationId(u64);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Delay between periodic activations is drawn uniformly from this range
    pub periodic_range: RangeInclusive<Time>,
    /// New objects ignore activations for this long
    pub activation_sleep: Time,
    pub duration_stretch: Option<f64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            periodic_range: Time::from_secs(5.0)..=Time::from_secs(30.0),
            activation_sleep: Time::from_secs(0.0),
            duration_stretch: None,
        }
    }
}

/// Per-frame input to [`AnimationOrchestrator::handle_animations`].
#[derive(Debug, Clone)]
pub struct FrameEvents {
    pub now: Ticks,
    pub minute_of_day: u32,
    /// Viewer position in the local frame, for billboards
    pub viewer_position: Vector3<f64>,
    /// Screen-space position of a click or tap this frame
    pub click: Option<Point2<f64>>,
}

pub struct AnimationOrchestrator {
    config: OrchestratorConfig,
    prng: Rand64,
    next_id: u64,

    animations: BTreeMap<AnimationId, Animation>,
    by_category: BTreeMap<EventCategory, Vec<AnimationId>>,
    /// Every animation in category order, rebuilt after any mutation
    all_view: Option<Vec<AnimationId>>,
    /// Animations by name for chain lookup, rebuilt after any mutation
    named_view: Option<HashMap<String, Vec<AnimationId>>>,

    pending_creation: Vec<AnimationId>,
    pois_to_activate: BTreeSet<PoiId>,
    pois_to_deactivate: BTreeSet<PoiId>,
    focused: HashSet<PoiId>,

    pending_actions: Vec<Action>,
    destroyed: Vec<PoiId>,
    objects_to_duplicate: Vec<PoiId>,
}

impl std::fmt::Debug for AnimationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationOrchestrator")
            .field("config", &self.config)
            .field("animations", &self.animations.len())
            .field("pois_to_activate", &self.pois_to_activate)
            .field("pois_to_deactivate", &self.pois_to_deactivate)
            .finish()
    }
}

fn node_enabled(registry: &SceneObjectRegistry, object_id: PoiId) -> bool {
    registry
        .node(object_id)
        .map(|n| n.is_enabled())
        .unwrap_or(false)
}

/// Yaws a node so it faces the viewer.
fn face_viewer(node: &mut dyn SceneNode, viewer: Vector3<f64>) {
    let mut dir = viewer - node.world_position();
    dir.y = 0.0;
    if dir.norm() > 1e-6 {
        node.set_rotation(UnitQuaternion::face_towards(&dir, &Vector3::y()));
    }
}

impl AnimationOrchestrator {
    pub fn new(config: OrchestratorConfig, seed: u64) -> Self {
        AnimationOrchestrator {
            config,
            prng: Rand64::new(seed.into()),
            next_id: 0,
            animations: BTreeMap::new(),
            by_category: BTreeMap::new(),
            all_view: None,
            named_view: None,
            pending_creation: Vec::new(),
            pois_to_activate: BTreeSet::new(),
            pois_to_deactivate: BTreeSet::new(),
            focused: HashSet::new(),
            pending_actions: Vec::new(),
            destroyed: Vec::new(),
            objects_to_duplicate: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn set_duration_stretch(&mut self, stretch: Option<f64>) {
        self.config.duration_stretch = stretch;
    }

    pub fn animation(&self, id: AnimationId) -> Option<&Animation> {
        self.animations.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnimationId, &Animation)> {
        self.animations.iter().map(|(id, a)| (*id, a))
    }

    /// First animation of an object with the given name.
    pub fn find(&self, object_id: PoiId, name: &str) -> Option<&Animation> {
        self.animations
            .values()
            .find(|a| a.object_id() == object_id && a.name() == name)
    }

    fn invalidate_views(&mut self) {
        self.all_view = None;
        self.named_view = None;
    }

    /// Instantiates every animation of an object. Creation animations are
    /// activated at the start of the next pass.
    pub fn add_object(
        &mut self,
        object_id: PoiId,
        lineage_id: PoiId,
        definition: &PoiDefinition,
        now: Ticks,
    ) -> usize {
        let asleep_until = now + Ticks::from_time(self.config.activation_sleep);
        let mut count = 0;
        for category in EventCategory::ALL {
            for def in definition.animations.get(category) {
                let mut animation = Animation::new(object_id, lineage_id, category, def);
                animation.asleep_until = asleep_until;
                if category == EventCategory::Periodic {
                    let wait = gen_time(&mut self.prng, &self.config.periodic_range);
                    animation.next_periodic = Some(now + Ticks::from_time(wait));
                }

                let id = AnimationId(self.next_id);
                self.next_id += 1;
                self.animations.insert(id, animation);
                self.by_category.entry(category).or_default().push(id);
                if category == EventCategory::OnCreate {
                    self.pending_creation.push(id);
                }
                count += 1;
            }
        }
        if count > 0 {
            self.invalidate_views();
        }
        trace!(object_id, lineage_id, count, "Added object animations");
        count
    }

    /// Drops every animation owned by an object.
    pub fn remove_object(&mut self, object_id: PoiId) -> usize {
        let before = self.animations.len();
        self.animations.retain(|_, a| a.object_id() != object_id);
        let removed = before - self.animations.len();
        if removed > 0 {
            let animations = &self.animations;
            for ids in self.by_category.values_mut() {
                ids.retain(|id| animations.contains_key(id));
            }
            self.pending_creation
                .retain(|id| animations.contains_key(id));
            self.invalidate_views();
        }
        self.focused.remove(&object_id);
        removed
    }

    /// Queues an external activation signal for all objects of a lineage.
    pub fn signal_activated(&mut self, poi: PoiId) {
        self.pois_to_activate.insert(poi);
    }

    /// Queues an external deactivation signal for all objects of a lineage.
    pub fn signal_deactivated(&mut self, poi: PoiId) {
        self.pois_to_deactivate.insert(poi);
    }

    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.pending_actions)
    }

    /// Objects torn down by destroy animations since the last call.
    pub fn take_destroyed(&mut self) -> Vec<PoiId> {
        std::mem::take(&mut self.destroyed)
    }

    /// Objects to clone, each reported once.
    pub fn take_objects_to_duplicate(&mut self) -> Vec<PoiId> {
        std::mem::take(&mut self.objects_to_duplicate)
    }

    fn ids(&self, category: EventCategory) -> Vec<AnimationId> {
        self.by_category
            .get(&category)
            .cloned()
            .unwrap_or_default()
    }

    fn all_ids(&mut self) -> Vec<AnimationId> {
        let by_category = &self.by_category;
        self.all_view
            .get_or_insert_with(|| {
                EventCategory::ALL
                    .iter()
                    .filter_map(|c| by_category.get(c))
                    .flatten()
                    .copied()
                    .collect()
            })
            .clone()
    }

    fn named(&mut self, name: &str) -> Vec<AnimationId> {
        let animations = &self.animations;
        self.named_view
            .get_or_insert_with(|| {
                let mut view: HashMap<String, Vec<AnimationId>> = HashMap::new();
                for (id, a) in animations.iter() {
                    if !a.name().is_empty() && !a.directives().is_internal() {
                        view.entry(a.name().to_owned()).or_default().push(*id);
                    }
                }
                view
            })
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    fn with_animation<R>(
        &mut self,
        id: AnimationId,
        registry: &mut SceneObjectRegistry,
        host: &mut dyn EngineHost,
        f: impl FnOnce(&mut Animation, &mut AnimationContext<'_>) -> R,
    ) -> Option<R> {
        let animation = self.animations.get_mut(&id)?;
        let mut ctx = AnimationContext {
            node: registry.node_mut(animation.object_id()),
            host,
            actions: &mut self.pending_actions,
            prng: &mut self.prng,
            stretch: self.config.duration_stretch,
        };
        Some(f(animation, &mut ctx))
    }

    fn activate(
        &mut self,
        id: AnimationId,
        now: Ticks,
        registry: &mut SceneObjectRegistry,
        host: &mut dyn EngineHost,
    ) {
        self.with_animation(id, registry, host, |a, ctx| a.activate(now, now, false, ctx));
    }

    /// Starts every animation with the given name on behalf of the remote relay.
    /// Unlike chain lookup this includes internal names, since those are
    /// relayed too.
    pub fn remote_activate(
        &mut self,
        name: &str,
        start: Ticks,
        now: Ticks,
        registry: &mut SceneObjectRegistry,
        host: &mut dyn EngineHost,
    ) -> usize {
        let ids: Vec<AnimationId> = self
            .animations
            .iter()
            .filter(|(_, a)| a.name() == name)
            .map(|(id, _)| *id)
            .collect();
        for id in ids.iter() {
            self.with_animation(*id, registry, host, |a, ctx| a.activate(start, now, true, ctx));
        }
        debug!(animation = name, count = ids.len(), "Remote activation");
        ids.len()
    }

    /// Runs one evaluation pass. Returns whether a click this frame hit anything.
    pub fn handle_animations(
        &mut self,
        frame: &FrameEvents,
        hit_tester: &dyn HitTester,
        registry: &mut SceneObjectRegistry,
        host: &mut dyn EngineHost,
    ) -> bool {
        let now = frame.now;
        let mut to_stop: HashSet<AnimationId> = HashSet::new();

        for id in std::mem::take(&mut self.pending_creation) {
            self.activate(id, now, registry, host);
        }

        // Billboards
        for id in self.ids(EventCategory::Billboard) {
            let Some(object_id) = self.animations.get(&id).map(Animation::object_id) else {
                continue;
            };
            if let Some(node) = registry.node_mut(object_id) {
                face_viewer(node, frame.viewer_position);
            }
        }

        // Focus
        let view_hits: HashSet<PoiId> = hit_tester.cast_view_ray().into_iter().collect();
        for id in self.ids(EventCategory::OnFocus) {
            let Some(a) = self.animations.get(&id) else {
                continue;
            };
            let object_id = a.object_id();
            if view_hits.contains(&object_id)
                && !self.focused.contains(&object_id)
                && !a.is_active()
            {
                self.activate(id, now, registry, host);
            }
        }
        for id in self.ids(EventCategory::InFocus) {
            let Some(a) = self.animations.get(&id) else {
                continue;
            };
            let hit = view_hits.contains(&a.object_id());
            if hit && !a.is_active() {
                self.activate(id, now, registry, host);
            } else if !hit && a.is_active() {
                to_stop.insert(id);
            }
        }
        self.focused = view_hits;

        // Time windows
        for id in self.ids(EventCategory::InTimeWindow) {
            let Some(a) = self.animations.get(&id) else {
                continue;
            };
            let inside = a.should_be_active(frame.minute_of_day);
            if inside && !a.is_active() {
                self.activate(id, now, registry, host);
            } else if !inside && a.is_active() {
                to_stop.insert(id);
            }
        }

        // While enabled
        for id in self.ids(EventCategory::WhileEnabled) {
            let Some(a) = self.animations.get_mut(&id) else {
                continue;
            };
            let enabled = node_enabled(registry, a.object_id());
            let was_enabled = std::mem::replace(&mut a.was_enabled, enabled);
            if !enabled && a.is_active() {
                to_stop.insert(id);
            } else if enabled && !was_enabled && !a.is_active() {
                self.activate(id, now, registry, host);
            }
        }

        // Click
        let mut had_click_hit = false;
        if let Some(pointer) = frame.click {
            let hits: HashSet<PoiId> = hit_tester.cast_pointer_ray(pointer).into_iter().collect();
            had_click_hit = !hits.is_empty();
            for id in self.ids(EventCategory::OnClick) {
                let hit = self
                    .animations
                    .get(&id)
                    .is_some_and(|a| hits.contains(&a.object_id()));
                if hit {
                    self.activate(id, now, registry, host);
                }
            }
        }

        self.handle_external_signals(now, registry, host);

        // Periodic
        for id in self.ids(EventCategory::Periodic) {
            let due = self
                .animations
                .get(&id)
                .is_some_and(|a| !a.is_active() && a.next_periodic.is_some_and(|t| t <= now));
            if !due {
                continue;
            }
            self.activate(id, now, registry, host);
            if let Some(a) = self.animations.get_mut(&id) {
                a.next_periodic = if a.is_active() {
                    None
                } else {
                    let wait = gen_time(&mut self.prng, &self.config.periodic_range);
                    Some(now + Ticks::from_time(wait))
                };
            }
        }

        // Advance everything once
        let mut stopped = Vec::new();
        for id in self.all_ids() {
            let stop = to_stop.contains(&id);
            let just_stopped = self.with_animation(id, registry, host, |a, ctx| {
                if stop {
                    a.stop(now, ctx);
                } else {
                    a.animate(now, ctx);
                }
                a.just_stopped()
            });
            if just_stopped == Some(true) {
                stopped.push(id);
            }
        }

        for id in stopped {
            self.after_stop(id, now, registry, host);
        }

        self.apply_destroy(registry);
        self.collect_duplicates();

        had_click_hit
    }

    fn handle_external_signals(
        &mut self,
        now: Ticks,
        registry: &mut SceneObjectRegistry,
        host: &mut dyn EngineHost,
    ) {
        let activations = self.ids(EventCategory::WhenActivated);
        let deactivations = self.ids(EventCategory::WhenDeactivated);

        for poi in std::mem::take(&mut self.pois_to_activate) {
            let deactivating = deactivations.iter().any(|id| {
                self.animations
                    .get(id)
                    .is_some_and(|a| a.lineage_id() == poi && a.is_active())
            });
            if deactivating {
                debug!(poi, "Activation signal ignored while deactivating");
                continue;
            }

            for id in activations.iter() {
                let Some(a) = self.animations.get(id) else {
                    continue;
                };
                if a.lineage_id() != poi {
                    continue;
                }
                if let Some(node) = registry.node_mut(a.object_id()) {
                    node.set_enabled(true);
                }
                self.activate(*id, now, registry, host);
            }
        }

        for poi in std::mem::take(&mut self.pois_to_deactivate) {
            for id in deactivations.iter() {
                let Some(a) = self.animations.get(id) else {
                    continue;
                };
                if a.lineage_id() != poi
                    || a.is_active()
                    || !node_enabled(registry, a.object_id())
                {
                    continue;
                }
                self.activate(*id, now, registry, host);
            }
        }
    }

    fn after_stop(
        &mut self,
        id: AnimationId,
        now: Ticks,
        registry: &mut SceneObjectRegistry,
        host: &mut dyn EngineHost,
    ) {
        let Some(a) = self.animations.get_mut(&id) else {
            return;
        };
        if a.category() == EventCategory::Periodic {
            let wait = gen_time(&mut self.prng, &self.config.periodic_range);
            a.next_periodic = Some(now + Ticks::from_time(wait));
        }

        let chain = a.chain().to_vec();
        let from = a.name().to_owned();
        for entry in chain {
            match entry {
                ChainEntry::Reload => host.request_reload(),
                ChainEntry::Action(action) => self.pending_actions.push(action),
                ChainEntry::Animation(name) => {
                    for target in self.named(&name) {
                        let Some(t) = self.animations.get(&target) else {
                            continue;
                        };
                        if t.category() == EventCategory::WhileEnabled
                            && !node_enabled(registry, t.object_id())
                        {
                            continue;
                        }
                        debug!(from = from.as_str(), to = name.as_str(), "Chain activation");
                        self.activate(target, now, registry, host);
                    }
                }
            }
        }
    }

    fn apply_destroy(&mut self, registry: &mut SceneObjectRegistry) {
        let mut doomed = BTreeSet::new();
        for a in self.animations.values_mut() {
            if a.take_to_be_destroyed() {
                doomed.insert(a.object_id());
            }
        }
        for object_id in doomed {
            for removed in registry.destroy(object_id) {
                self.remove_object(removed);
                self.destroyed.push(removed);
            }
        }
    }

    fn collect_duplicates(&mut self) {
        for a in self.animations.values_mut() {
            if a.take_to_be_duplicated() && !self.objects_to_duplicate.contains(&a.object_id()) {
                self.objects_to_duplicate.push(a.object_id());
            }
        }
    }
}
