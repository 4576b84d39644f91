//! A single animation instance and its activation state machine.
//!
//! An animation is inactive until activated. Once active it waits out its
//! delay, latches its start tick, and then drives its behavior with the
//! shaped progress of the current window until the window ends. Repeating
//! animations roll the window forward instead of stopping.

use crate::{host::EngineHost, scene::SceneNode, units::Ticks};
use oorandom::Rand64;
use poidsl::{parse_chain, Action, BehaviorKind, ChainEntry, Interpolation, NameDirectives};
use poitypes::prelude::{AnimationDefinition, AudioSettings, EventCategory, PoiId};
use tracing::{debug, trace};

pub use behavior::{Behavior, RestState, SideEffect};

pub mod behavior;
pub mod curve;

/// Everything an animation may touch while it is evaluated.
pub struct AnimationContext<'a> {
    /// The owning object's node, `None` when it is gone
    pub node: Option<&'a mut dyn SceneNode>,
    pub host: &'a mut dyn EngineHost,
    /// Name-encoded actions, resolved by the engine after the pass
    pub actions: &'a mut Vec<Action>,
    pub prng: &'a mut Rand64,
    pub stretch: Option<f64>,
}

impl<'a> AnimationContext<'a> {
    fn node_enabled(&self) -> bool {
        self.node.as_ref().map(|n| n.is_enabled()).unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct Animation {
    object_id: PoiId,
    lineage_id: PoiId,
    category: EventCategory,
    name: String,
    directives: NameDirectives,
    chain: Vec<ChainEntry>,

    behavior: Behavior,
    interpolation: Interpolation,
    from: f64,
    to: f64,
    length: Ticks,
    delay: Ticks,
    persisting: bool,
    repeating: bool,
    audio: Option<AudioSettings>,

    active: bool,
    just_activated: bool,
    just_stopped: bool,
    activated_at: Ticks,
    started_at: Option<Ticks>,
    /// The delay for the current activation, re-rolled for `RandomDelay` names
    effective_delay: Ticks,
    to_be_destroyed: bool,
    to_be_duplicated: bool,
    duplicated_this_activation: bool,
    buzzed_this_activation: bool,
    last_factor: Option<f64>,
    rest: RestState,

    pub(crate) asleep_until: Ticks,
    pub(crate) next_periodic: Option<Ticks>,
    pub(crate) was_enabled: bool,
}

impl Animation {
    pub fn new(
        object_id: PoiId,
        lineage_id: PoiId,
        category: EventCategory,
        definition: &AnimationDefinition,
    ) -> Self {
        let behavior = Behavior::new(
            BehaviorKind::from_keyword_or_default(&definition.kind),
            definition.axis.into(),
        );
        let delay = Ticks::from_secs(definition.delay);
        Animation {
            object_id,
            lineage_id,
            category,
            name: definition.name.clone(),
            directives: NameDirectives::parse(&definition.name),
            chain: parse_chain(&definition.followed_by),
            behavior,
            interpolation: Interpolation::from_keyword_or_default(&definition.interpolation),
            from: definition.from,
            to: definition.to,
            length: Ticks::from_secs(definition.length),
            delay,
            persisting: definition.persisting,
            repeating: definition.repeating,
            audio: definition.audio,
            active: false,
            just_activated: false,
            just_stopped: false,
            activated_at: Ticks::ZERO,
            started_at: None,
            effective_delay: delay,
            to_be_destroyed: false,
            to_be_duplicated: false,
            duplicated_this_activation: false,
            buzzed_this_activation: false,
            last_factor: None,
            rest: RestState::default(),
            asleep_until: Ticks::ZERO,
            next_periodic: None,
            was_enabled: false,
        }
    }

    pub fn object_id(&self) -> PoiId {
        self.object_id
    }

    pub fn lineage_id(&self) -> PoiId {
        self.lineage_id
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directives(&self) -> &NameDirectives {
        &self.directives
    }

    pub fn chain(&self) -> &[ChainEntry] {
        &self.chain
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn just_activated(&self) -> bool {
        self.just_activated
    }

    pub fn just_stopped(&self) -> bool {
        self.just_stopped
    }

    /// Factor applied on the most recent evaluation
    pub fn last_factor(&self) -> Option<f64> {
        self.last_factor
    }

    pub fn started_at(&self) -> Option<Ticks> {
        self.started_at
    }

    /// Whether the wall-clock minute falls in this animation's `Time:` window.
    pub fn should_be_active(&self, minute_of_day: u32) -> bool {
        self.directives.window.should_be_active(minute_of_day)
    }

    pub(crate) fn take_to_be_destroyed(&mut self) -> bool {
        std::mem::take(&mut self.to_be_destroyed)
    }

    pub(crate) fn take_to_be_duplicated(&mut self) -> bool {
        std::mem::take(&mut self.to_be_duplicated)
    }

    fn effective_timing(&self, stretch: Option<f64>) -> (Ticks, Ticks) {
        match stretch {
            Some(s) => (self.effective_delay * s, self.length * s),
            None => (self.effective_delay, self.length),
        }
    }

    pub fn activate(
        &mut self,
        start: Ticks,
        now: Ticks,
        is_remote: bool,
        ctx: &mut AnimationContext<'_>,
    ) {
        if self.directives.remoted
            && !is_remote
            && ctx.host.send_animation_to_remote(&self.name, start)
        {
            debug!(
                object_id = self.object_id,
                animation = self.name.as_str(),
                "Activation forwarded to remote relay"
            );
            return;
        }
        if self.category == EventCategory::WhileEnabled && !ctx.node_enabled() {
            trace!(
                object_id = self.object_id,
                animation = self.name.as_str(),
                "Activation deferred, node is disabled"
            );
            return;
        }
        if now < self.asleep_until {
            trace!(
                object_id = self.object_id,
                animation = self.name.as_str(),
                "Activation suppressed while asleep"
            );
            return;
        }

        self.active = true;
        self.started_at = None;
        self.activated_at = start;
        self.duplicated_this_activation = false;
        self.buzzed_this_activation = false;
        self.effective_delay = if self.directives.random_delay && self.delay > Ticks::ZERO {
            let range = self.delay.as_ticks() as u64 + 1;
            Ticks::from_ticks(ctx.prng.rand_range(0..range) as i64)
        } else {
            self.delay
        };

        debug!(
            object_id = self.object_id,
            animation = self.name.as_str(),
            category = %self.category,
            delay = self.effective_delay.as_secs(),
            remote = is_remote,
            "Animation activated"
        );

        self.animate(now, ctx);
    }

    pub fn animate(&mut self, now: Ticks, ctx: &mut AnimationContext<'_>) {
        self.just_activated = false;
        self.just_stopped = false;

        if !self.active || self.length < Ticks::from_ticks(1) || self.delay < Ticks::ZERO {
            return;
        }

        let (delay, length) = self.effective_timing(ctx.stretch);
        if length < Ticks::from_ticks(1) || now < self.activated_at + delay {
            return;
        }

        let mut start = match self.started_at {
            Some(start) => start,
            None => {
                self.started_at = Some(now);
                self.on_just_activated(ctx);
                now
            }
        };

        if start + length < now {
            let disabled = self.category == EventCategory::WhileEnabled && !ctx.node_enabled();
            if !self.repeating || disabled {
                self.apply_progress(1.0, ctx);
                self.finish(ctx);
                return;
            }

            let previous_end = start + length;
            start = if now < previous_end + length {
                previous_end
            } else {
                now
            };
            self.started_at = Some(start);
            trace!(
                object_id = self.object_id,
                animation = self.name.as_str(),
                "Animation repeated"
            );
            self.on_just_activated(ctx);
        }

        let progress = (now - start).fraction_of(length).clamp(0.0, 1.0);
        self.apply_progress(progress, ctx);
    }

    /// Runs one last evaluation, then deactivates.
    pub fn stop(&mut self, now: Ticks, ctx: &mut AnimationContext<'_>) {
        if !self.active {
            return;
        }
        self.animate(now, ctx);
        if self.active {
            self.finish(ctx);
        }
    }

    fn finish(&mut self, ctx: &mut AnimationContext<'_>) {
        self.active = false;
        self.just_stopped = true;
        self.started_at = None;
        if !self.persisting {
            if let Some(node) = ctx.node.as_deref_mut() {
                self.rest.revert(node);
            }
        }
        debug!(
            object_id = self.object_id,
            animation = self.name.as_str(),
            persisting = self.persisting,
            "Animation stopped"
        );
    }

    fn on_just_activated(&mut self, ctx: &mut AnimationContext<'_>) {
        self.just_activated = true;

        ctx.actions.extend(self.directives.actions.iter().cloned());
        if let Some(label) = self.directives.activity.as_deref() {
            ctx.host.report_activity(label);
        }

        if let Some(node) = ctx.node.as_deref_mut() {
            if node.volume().is_none() {
                return;
            }
            if let Some(audio) = self.audio {
                if let Some(volume) = audio.volume {
                    node.set_volume(volume);
                }
                if let Some(blend) = audio.spatial_blend {
                    node.set_spatial_blend(blend);
                }
                if let Some(rolloff) = audio.rolloff {
                    node.set_rolloff(rolloff);
                }
                if let Some(spatialize) = audio.spatialize {
                    node.set_spatialize(spatialize);
                }
            }
            node.play_audio();
        }
    }

    fn apply_progress(&mut self, progress: f64, ctx: &mut AnimationContext<'_>) {
        let factor = curve::factor(self.interpolation, self.from, self.to, progress);
        self.last_factor = Some(factor);

        match self.behavior.apply(factor) {
            SideEffect::Destroy => self.to_be_destroyed = true,
            SideEffect::Duplicate => {
                if !self.duplicated_this_activation {
                    self.duplicated_this_activation = true;
                    self.to_be_duplicated = true;
                }
            }
            SideEffect::Buzz => {
                if !self.buzzed_this_activation {
                    self.buzzed_this_activation = true;
                    ctx.host.buzz();
                }
            }
            effect => {
                if let Some(node) = ctx.node.as_deref_mut() {
                    self.rest.apply(effect, node);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostRequest, RecordingHost};
    use crate::scene::MemoryNode;
    use approx::assert_relative_eq;
    use na::Vector3;
    use poitypes::prelude::Axis;

    struct Harness {
        node: MemoryNode,
        host: RecordingHost,
        actions: Vec<Action>,
        prng: Rand64,
        stretch: Option<f64>,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                node: MemoryNode::default(),
                host: RecordingHost::new(),
                actions: Vec::new(),
                prng: Rand64::new(7),
                stretch: None,
            }
        }

        fn ctx(&mut self) -> AnimationContext<'_> {
            AnimationContext {
                node: Some(&mut self.node),
                host: &mut self.host,
                actions: &mut self.actions,
                prng: &mut self.prng,
                stretch: self.stretch,
            }
        }
    }

    fn definition(kind: &str, length: f64, delay: f64) -> AnimationDefinition {
        AnimationDefinition {
            name: "anim".to_owned(),
            kind: kind.to_owned(),
            length,
            delay,
            from: 0.0,
            to: 10.0,
            axis: Axis::new(1.0, 0.0, 0.0),
            ..Default::default()
        }
    }

    fn secs(s: f64) -> Ticks {
        Ticks::from_secs(s)
    }

    #[test]
    fn delay_gates_the_first_frame() {
        let mut h = Harness::new();
        let mut a = Animation::new(1, 1, EventCategory::OnClick, &definition("transform", 1.0, 0.5));
        let t = secs(10.0);

        a.activate(t, t, false, &mut h.ctx());
        assert!(a.is_active());
        assert!(!a.just_activated());
        assert_eq!(a.last_factor(), None);

        a.animate(t + secs(0.4), &mut h.ctx());
        assert!(!a.just_activated());

        a.animate(t + secs(0.5), &mut h.ctx());
        assert!(a.just_activated());
        assert_eq!(a.started_at(), Some(t + secs(0.5)));

        a.animate(t + secs(0.6), &mut h.ctx());
        assert!(!a.just_activated());
        assert_relative_eq!(a.last_factor().unwrap(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(h.node.position.x, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn non_repeating_stops_and_reverts() {
        let mut h = Harness::new();
        let mut a = Animation::new(1, 1, EventCategory::OnClick, &definition("transform", 1.0, 0.0));
        a.activate(secs(0.0), secs(0.0), false, &mut h.ctx());
        a.animate(secs(0.5), &mut h.ctx());
        assert_relative_eq!(h.node.position.x, 5.0);

        a.animate(secs(1.5), &mut h.ctx());
        assert!(!a.is_active());
        assert!(a.just_stopped());
        assert_eq!(h.node.position, Vector3::zeros());

        a.animate(secs(1.6), &mut h.ctx());
        assert!(!a.just_stopped());
    }

    #[test]
    fn persisting_keeps_the_final_state() {
        let mut h = Harness::new();
        let mut def = definition("transform", 1.0, 0.0);
        def.persisting = true;
        let mut a = Animation::new(1, 1, EventCategory::OnClick, &def);
        a.activate(secs(0.0), secs(0.0), false, &mut h.ctx());
        a.animate(secs(2.0), &mut h.ctx());
        assert!(!a.is_active());
        assert_relative_eq!(h.node.position.x, 10.0);
    }

    #[test]
    fn repeat_rolls_the_window_forward() {
        let mut h = Harness::new();
        let mut def = definition("transform", 1.0, 0.0);
        def.repeating = true;
        let mut a = Animation::new(1, 1, EventCategory::OnCreate, &def);
        let t = secs(3.0);
        a.activate(t, t, false, &mut h.ctx());

        // Next window already contains now: restart at the previous end
        a.animate(t + secs(1.4), &mut h.ctx());
        assert!(a.just_activated());
        assert_eq!(a.started_at(), Some(t + secs(1.0)));

        // Skipped a whole window: restart at now
        a.animate(t + secs(4.4), &mut h.ctx());
        assert!(a.just_activated());
        assert_eq!(a.started_at(), Some(t + secs(4.4)));
        assert!(a.is_active());
    }

    #[test]
    fn repeat_progress_stays_in_range() {
        let mut h = Harness::new();
        let mut def = definition("transform", 1.0, 0.0);
        def.repeating = true;
        def.to = 1.0;
        let mut a = Animation::new(1, 1, EventCategory::OnCreate, &def);
        let t = secs(0.0);
        a.activate(t, t, false, &mut h.ctx());
        a.animate(t + secs(1.2), &mut h.ctx());
        a.animate(t + secs(2.4), &mut h.ctx());
        let f = a.last_factor().unwrap();
        assert!((0.0..1.0).contains(&f), "factor {f}");
        assert_relative_eq!(f, 0.4, epsilon = 1e-9);
    }

    #[test]
    fn stop_deactivates_and_sets_just_stopped() {
        let mut h = Harness::new();
        let mut a = Animation::new(1, 1, EventCategory::InFocus, &definition("grow", 10.0, 0.0));
        a.activate(secs(0.0), secs(0.0), false, &mut h.ctx());
        a.animate(secs(1.0), &mut h.ctx());
        a.stop(secs(2.0), &mut h.ctx());
        assert!(!a.is_active());
        assert!(a.just_stopped());
        assert_eq!(h.node.scale, Vector3::repeat(1.0));
    }

    #[test]
    fn zero_length_never_animates() {
        let mut h = Harness::new();
        let mut a = Animation::new(1, 1, EventCategory::OnClick, &definition("transform", 0.0, 0.0));
        a.activate(secs(0.0), secs(0.0), false, &mut h.ctx());
        a.animate(secs(1.0), &mut h.ctx());
        assert_eq!(a.last_factor(), None);
        assert!(!a.just_activated());
    }

    #[test]
    fn stretch_scales_delay_and_length() {
        let mut h = Harness::new();
        h.stretch = Some(2.0);
        let mut a = Animation::new(1, 1, EventCategory::OnClick, &definition("transform", 1.0, 1.0));
        a.activate(secs(0.0), secs(0.0), false, &mut h.ctx());
        a.animate(secs(1.5), &mut h.ctx());
        assert!(a.started_at().is_none());
        a.animate(secs(2.0), &mut h.ctx());
        a.animate(secs(3.0), &mut h.ctx());
        assert_relative_eq!(a.last_factor().unwrap(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn duplicate_fires_once_per_activation() {
        let mut h = Harness::new();
        let mut def = definition("duplicate", 1.0, 0.0);
        def.repeating = true;
        let mut a = Animation::new(1, 1, EventCategory::OnClick, &def);
        a.activate(secs(0.0), secs(0.0), false, &mut h.ctx());
        assert!(a.take_to_be_duplicated());
        a.animate(secs(1.5), &mut h.ctx());
        assert!(!a.take_to_be_duplicated());
        a.activate(secs(2.0), secs(2.0), false, &mut h.ctx());
        assert!(a.take_to_be_duplicated());
    }

    #[test]
    fn just_activated_fires_name_directives() {
        let mut h = Harness::new();
        let mut def = definition("buzz", 1.0, 0.0);
        def.name = "hello Activity:greet openUrl:https://example.com/ SetActive:Door".to_owned();
        let mut a = Animation::new(1, 1, EventCategory::OnClick, &def);
        a.activate(secs(0.0), secs(0.0), false, &mut h.ctx());

        assert_eq!(h.actions.len(), 2);
        assert_eq!(
            h.host.requests(),
            &[HostRequest::Activity("greet".to_owned()), HostRequest::Buzz]
        );
        assert_eq!(h.node.audio.unwrap().plays, 1);
    }

    #[test]
    fn while_enabled_is_deferred_on_disabled_node() {
        let mut h = Harness::new();
        h.node.enabled = false;
        let mut a = Animation::new(1, 1, EventCategory::WhileEnabled, &definition("fade", 1.0, 0.0));
        a.activate(secs(0.0), secs(0.0), false, &mut h.ctx());
        assert!(!a.is_active());
    }

    #[test]
    fn remoted_activation_goes_through_the_host() {
        let mut hub = crate::relay::RelayHub::default();
        let mut h = Harness::new();
        h.host = RecordingHost::with_relay(hub.join(None));
        let mut def = definition("rotate", 1.0, 0.0);
        def.name = "spin Remoted".to_owned();
        let mut a = Animation::new(1, 1, EventCategory::OnClick, &def);

        a.activate(secs(0.0), secs(0.0), false, &mut h.ctx());
        assert!(!a.is_active());
        a.activate(secs(0.0), secs(0.1), true, &mut h.ctx());
        assert!(a.is_active());
    }

    #[test]
    fn random_delay_stays_within_configured_delay() {
        let mut h = Harness::new();
        let mut def = definition("transform", 1.0, 2.0);
        def.name = "wobble RandomDelay".to_owned();
        let mut a = Animation::new(1, 1, EventCategory::OnClick, &def);
        for _ in 0..20 {
            a.activate(secs(0.0), secs(0.0), false, &mut h.ctx());
            assert!(a.effective_delay >= Ticks::ZERO && a.effective_delay <= secs(2.0));
        }
    }
}
