//! Debounces external trigger tracking into activation signals.
//!
//! A trigger (an image marker, a beacon, ...) is reported visible or not on
//! every frame. Gaining a trigger signals activation right away; losing it
//! only signals deactivation once it has stayed lost for the hold period.

use crate::{orchestrator::AnimationOrchestrator, units::Time, FrameComponent};
use poitypes::prelude::PoiId;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// Amount of time a trigger must stay lost before the loss is signalled.
    /// Zero means immediately
    pub hold_period: Time,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig {
            hold_period: Time::from_secs(1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingSignal {
    Found,
    Lost,
}

#[derive(Debug, Clone)]
pub struct TrackedTrigger {
    poi: PoiId,
    config: TrackingConfig,

    /// Number of times the trigger was found
    triggered: usize,

    /// Timer started when the trigger goes missing
    lost_timer: Time,

    tracked: bool,
}

impl TrackedTrigger {
    pub fn new(poi: PoiId, config: TrackingConfig) -> Self {
        TrackedTrigger {
            poi,
            config,
            triggered: 0,
            lost_timer: Time::from_secs(0.0),
            tracked: false,
        }
    }

    pub fn triggered(&self) -> usize {
        self.triggered
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    pub fn reset(&mut self) {
        self.triggered = 0;
        self.lost_timer = Time::from_secs(0.0);
        self.tracked = false;
    }

    /// Returns a signal on the found edge and once the loss has been held long enough
    pub fn update(&mut self, dt: Time, visible: bool) -> Option<TrackingSignal> {
        if visible {
            self.lost_timer = Time::from_secs(0.0);
            if self.tracked {
                return None;
            }
            self.tracked = true;
            self.triggered = self.triggered.saturating_add(1);
            debug!(poi = self.poi, triggered = self.triggered, "Trigger found");
            return Some(TrackingSignal::Found);
        }

        if !self.tracked {
            return None;
        }

        self.lost_timer += dt;
        if self.lost_timer >= self.config.hold_period {
            self.tracked = false;
            debug!(
                poi = self.poi,
                lost_timer = ?self.lost_timer,
                "Trigger lost"
            );
            self.lost_timer = Time::from_secs(0.0);
            Some(TrackingSignal::Lost)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackingEnvironment {
    /// Triggers visible this frame, by POI id
    pub visible: BTreeSet<PoiId>,
}

#[derive(Debug, Clone, Default)]
pub struct TrackingTimeouts {
    config: TrackingConfig,
    triggers: BTreeMap<PoiId, TrackedTrigger>,
}

impl TrackingTimeouts {
    pub fn new(config: TrackingConfig) -> Self {
        TrackingTimeouts {
            config,
            triggers: BTreeMap::new(),
        }
    }

    pub fn trigger(&self, poi: PoiId) -> Option<&TrackedTrigger> {
        self.triggers.get(&poi)
    }
}

impl<'a> FrameComponent<'a> for TrackingTimeouts {
    type SharedState = AnimationOrchestrator;
    type Environment = TrackingEnvironment;

    fn reset(&mut self, _env: &'a TrackingEnvironment, _orchestrator: &mut AnimationOrchestrator) {
        for trigger in self.triggers.values_mut() {
            trigger.reset();
        }
    }

    fn step(
        &mut self,
        dt: Time,
        env: &'a TrackingEnvironment,
        orchestrator: &mut AnimationOrchestrator,
    ) {
        for poi in env.visible.iter() {
            self.triggers
                .entry(*poi)
                .or_insert_with(|| TrackedTrigger::new(*poi, self.config.clone()));
        }

        for (poi, trigger) in self.triggers.iter_mut() {
            match trigger.update(dt, env.visible.contains(poi)) {
                Some(TrackingSignal::Found) => orchestrator.signal_activated(*poi),
                Some(TrackingSignal::Lost) => orchestrator.signal_deactivated(*poi),
                None => (),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_is_immediate() {
        let mut t = TrackedTrigger::new(1, TrackingConfig::default());
        let dt = Time::from_secs(0.1);
        assert_eq!(t.update(dt, true), Some(TrackingSignal::Found));
        assert_eq!(t.update(dt, true), None);
        assert_eq!(t.triggered(), 1);
        assert!(t.is_tracked());
    }

    #[test]
    fn loss_is_held() {
        let mut t = TrackedTrigger::new(1, TrackingConfig {
            hold_period: Time::from_secs(1.0),
        });
        let dt = Time::from_secs(0.25);
        t.update(dt, true);

        // Brief dropouts reset the hold timer
        for _ in 0..3 {
            assert_eq!(t.update(dt, false), None);
        }
        assert_eq!(t.update(dt, true), None);

        for _ in 0..3 {
            assert_eq!(t.update(dt, false), None);
        }
        assert_eq!(t.update(dt, false), Some(TrackingSignal::Lost));
        assert!(!t.is_tracked());
        assert_eq!(t.update(dt, false), None);
    }

    #[test]
    fn immediate_loss() {
        let mut t = TrackedTrigger::new(1, TrackingConfig {
            hold_period: Time::from_secs(0.0),
        });
        let dt = Time::from_secs(0.1);
        t.update(dt, true);
        assert_eq!(t.update(dt, false), Some(TrackingSignal::Lost));
        assert_eq!(t.update(dt, true), Some(TrackingSignal::Found));
        assert_eq!(t.triggered(), 2);
    }
}
