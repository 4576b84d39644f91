//! The whole engine: registry, position filter, projector, tracking and the
//! animation orchestrator, stepped once per host frame.

use na::{Point2, Vector3};
use oorandom::Rand64;
use poidsl::Action;
use poitypes::prelude::{PoiDefinition, PoiId};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

use crate::{
    clock::FrameInfo,
    geo::{GeoPoint, GeoProjector, LocationFix, PositionFilter},
    host::{EngineHost, HitTester},
    orchestrator::{AnimationOrchestrator, FrameEvents},
    random::gen_spread,
    registry::SceneObjectRegistry,
    scenario::{Config, ConfigError},
    scene::NodeFactory,
    tracking::{TrackingEnvironment, TrackingTimeouts},
    units::{Ticks, Time},
    FrameComponent,
};

/// Everything the host observed since the previous frame.
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    pub now: Ticks,
    pub minute_of_day: u32,
    /// A new raw device fix, if one arrived
    pub fix: Option<LocationFix>,
    /// Viewer position in the local frame
    pub viewer_position: Vector3<f64>,
    pub click: Option<Point2<f64>>,
    /// External triggers currently tracked, by POI id
    pub tracked: BTreeSet<PoiId>,
}

#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub dt: Time,
    pub device: Option<GeoPoint>,
    /// A click this frame hit at least one object
    pub click_hit: bool,
    pub actions: usize,
    pub destroyed: Vec<PoiId>,
    /// Root ids of the duplicates created this frame
    pub duplicated: Vec<PoiId>,
}

pub struct Engine {
    config: Config,
    frame: FrameInfo,
    registry: SceneObjectRegistry,
    orchestrator: AnimationOrchestrator,
    filter: PositionFilter,
    projector: GeoProjector,
    tracking: TrackingTimeouts,
    prng: Rand64,
    poi_filter: Option<Regex>,
    device: Option<GeoPoint>,
}

impl Engine {
    pub fn new(config: Config, factory: Box<dyn NodeFactory>) -> Result<Self, ConfigError> {
        config.validate()?;
        let poi_filter = config.poi_filter()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        info!(seed, "Creating engine");

        let mut orchestrator = AnimationOrchestrator::new(config.orchestrator_config(), seed);
        orchestrator.set_duration_stretch(config.duration_stretch);

        Ok(Engine {
            frame: FrameInfo::default(),
            registry: SceneObjectRegistry::new(factory),
            orchestrator,
            filter: PositionFilter::new(config.filter_config()),
            projector: GeoProjector::new(config.projector_config()),
            tracking: TrackingTimeouts::new(config.tracking_config()),
            prng: Rand64::new(u128::from(seed) << 1 | 1),
            poi_filter,
            device: None,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn frame(&self) -> &FrameInfo {
        &self.frame
    }

    pub fn registry(&self) -> &SceneObjectRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SceneObjectRegistry {
        &mut self.registry
    }

    pub fn orchestrator(&self) -> &AnimationOrchestrator {
        &self.orchestrator
    }

    pub fn filter(&self) -> &PositionFilter {
        &self.filter
    }

    /// Filtered device position, `None` until the first fix
    pub fn device(&self) -> Option<GeoPoint> {
        self.device
    }

    /// Synchronizes the scene with a fresh definition feed.
    ///
    /// Unchanged POIs are kept along with their animation state, changed ones
    /// are rebuilt and POIs missing from the feed are removed together with
    /// their duplicates. A POI that cannot be added is skipped. Returns the
    /// number of objects created.
    pub fn load_definitions(&mut self, defs: Vec<PoiDefinition>) -> usize {
        let defs: Vec<PoiDefinition> = defs
            .into_iter()
            .filter(|d| match self.poi_filter.as_ref() {
                Some(re) => {
                    let keep = re.is_match(&d.title);
                    if !keep {
                        debug!(id = d.id, title = d.title.as_str(), "POI filtered out");
                    }
                    keep
                }
                None => true,
            })
            .collect();
        let feed_ids: HashSet<PoiId> = defs.iter().map(|d| d.id).filter(|id| *id > 0).collect();

        let stale: Vec<PoiId> = self
            .registry
            .roots()
            .filter(|o| !feed_ids.contains(&o.lineage_id))
            .map(|o| o.id)
            .collect();
        for id in stale {
            self.registry.mark_for_deletion(id, true);
        }
        for id in self.registry.gc() {
            self.orchestrator.remove_object(id);
        }

        let mut created = 0;
        for def in defs {
            if def.id > 0 {
                match self.registry.get(def.id) {
                    Some(existing) if existing.definition == def => continue,
                    Some(_) => {
                        debug!(id = def.id, "POI definition changed, rebuilding");
                        for id in self.registry.destroy(def.id) {
                            self.orchestrator.remove_object(id);
                        }
                    }
                    None => (),
                }
            }
            let id = def.id;
            match self.registry.insert(def) {
                Ok(ids) => {
                    created += ids.len();
                    self.instantiate(&ids);
                }
                Err(e) => warn!(id, err = %e, "Skipping POI"),
            }
        }

        self.registry.set_ar_objects_to_place();
        info!(
            objects = self.registry.len(),
            animations = self.orchestrator.len(),
            created,
            "Loaded definitions"
        );
        created
    }

    fn instantiate(&mut self, ids: &[PoiId]) {
        let now = self.frame.now;
        for id in ids.iter() {
            if let Some(obj) = self.registry.get(*id) {
                self.orchestrator
                    .add_object(obj.id, obj.lineage_id, &obj.definition, now);
            }
        }
    }

    pub fn signal_activated(&mut self, poi: PoiId) {
        self.orchestrator.signal_activated(poi);
    }

    pub fn signal_deactivated(&mut self, poi: PoiId) {
        self.orchestrator.signal_deactivated(poi);
    }

    /// Inbound side of the remote relay.
    pub fn remote_activate(&mut self, name: &str, start: Ticks, host: &mut dyn EngineHost) -> usize {
        let now = self.frame.now;
        self.orchestrator
            .remote_activate(name, start, now, &mut self.registry, host)
    }

    pub fn step(
        &mut self,
        input: &FrameInput,
        hit_tester: &dyn HitTester,
        host: &mut dyn EngineHost,
    ) -> FrameReport {
        let dt = self.frame.frame_step(input.now, input.minute_of_day);

        let tracking_env = TrackingEnvironment {
            visible: input.tracked.clone(),
        };
        self.tracking
            .step(dt, &tracking_env, &mut self.orchestrator);

        if let Some(fix) = input.fix.as_ref() {
            self.device = Some(self.filter.update(fix));
        }
        self.projector.place(&mut self.registry, self.device);

        let events = FrameEvents {
            now: input.now,
            minute_of_day: input.minute_of_day,
            viewer_position: input.viewer_position,
            click: input.click,
        };
        let click_hit =
            self.orchestrator
                .handle_animations(&events, hit_tester, &mut self.registry, host);

        let actions = self.orchestrator.take_actions();
        let action_count = actions.len();
        for action in actions {
            self.dispatch(action, host);
        }

        let destroyed = self.orchestrator.take_destroyed();

        let mut duplicated = Vec::new();
        for source in self.orchestrator.take_objects_to_duplicate() {
            let spread = self.config.duplicate_spread;
            let east = gen_spread(&mut self.prng, spread);
            let north = gen_spread(&mut self.prng, spread);
            match self.registry.duplicate(source, east, north) {
                Ok(ids) => {
                    self.instantiate(&ids);
                    if let Some(root) = ids.first() {
                        duplicated.push(*root);
                    }
                }
                Err(e) => warn!(source, err = %e, "Failed to duplicate scene object"),
            }
        }

        if self.registry.is_dirty() {
            self.registry.set_ar_objects_to_place();
        }
        self.projector.advance(&mut self.registry);

        if input.click.is_some() && !click_hit {
            host.take_screenshot();
        }

        FrameReport {
            dt,
            device: self.device,
            click_hit,
            actions: action_count,
            destroyed,
            duplicated,
        }
    }

    fn dispatch(&mut self, action: Action, host: &mut dyn EngineHost) {
        match action {
            Action::OpenUrl(url) => host.open_url(&url),
            Action::SetActive { name, active } => {
                if self.registry.set_enabled_by_title(&name, active) == 0 {
                    host.set_active_by_name(&name, active);
                }
            }
        }
    }
}
