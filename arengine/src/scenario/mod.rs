//! Replay scenarios: an engine configuration, a definition feed and a script
//! of device fixes and user/tracking events.

use crate::{geo::LocationFix, units::Time};
use poitypes::prelude::{PoiDefinition, PoiId};
use serde::Deserialize;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};
use tracing::info;

pub use self::config::{Config, ConfigError};
use self::config::{deserialize_time, read_file};

pub mod config;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Scenario {
    pub name: Option<String>,
    /// JSON definition feed, relative to the scenario file
    pub feed: PathBuf,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    #[serde(deserialize_with = "deserialize_time")]
    pub duration: Time,
    /// Wall clock minute of day at the start of the replay
    #[serde(default = "default_minute_of_day")]
    pub minute_of_day: u32,
    #[serde(default)]
    pub engine: Config,
    #[serde(default, alias = "fix")]
    pub fixes: Vec<ScriptedFix>,
    #[serde(default, alias = "signal")]
    pub signals: Vec<ScriptedSignal>,
    #[serde(default)]
    pub focus: Vec<ScriptedSpan>,
    #[serde(default, alias = "click")]
    pub clicks: Vec<ScriptedClick>,
    #[serde(default)]
    pub tracked: Vec<ScriptedSpan>,

    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_frame_rate() -> f64 {
    30.0
}

fn default_minute_of_day() -> u32 {
    12 * 60
}

fn default_accuracy() -> f64 {
    5.0
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScriptedFix {
    #[serde(deserialize_with = "deserialize_time")]
    pub at: Time,
    pub latitude: f64,
    pub longitude: f64,
    /// [m]
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,
}

impl From<&ScriptedFix> for LocationFix {
    fn from(f: &ScriptedFix) -> Self {
        LocationFix {
            latitude: f.latitude,
            longitude: f.longitude,
            accuracy: f.accuracy,
            timestamp_ms: f.at.as_millis() as i64,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    Activated,
    Deactivated,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScriptedSignal {
    #[serde(deserialize_with = "deserialize_time")]
    pub at: Time,
    pub poi: PoiId,
    pub kind: SignalKind,
}

/// A set of POIs hit (or tracked) over `[from, to)`
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScriptedSpan {
    #[serde(deserialize_with = "deserialize_time")]
    pub from: Time,
    #[serde(deserialize_with = "deserialize_time")]
    pub to: Time,
    pub poi: Vec<PoiId>,
}

impl ScriptedSpan {
    pub fn contains(&self, t: Time) -> bool {
        t >= self.from && t < self.to
    }
}

/// A tap; an empty `poi` list is a tap on nothing
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScriptedClick {
    #[serde(deserialize_with = "deserialize_time")]
    pub at: Time,
    #[serde(default)]
    pub poi: Vec<PoiId>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Whether `t` falls into the frame `(prev, now]`, or is the very first
/// frame's timestamp
fn in_frame(t: Time, prev: Option<Time>, now: Time) -> bool {
    match prev {
        Some(p) => t > p && t <= now,
        None => t <= now,
    }
}

impl Scenario {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading scenario '{}'", path.display());
        let content = read_file(path)?;
        let mut scenario = Self::from_str_checked(&content)?;
        scenario.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(scenario)
    }

    pub fn from_str_checked(s: &str) -> Result<Self, ConfigError> {
        let scenario: Scenario = toml::from_str(s)?;
        scenario.engine.validate()?;

        if !(scenario.frame_rate.is_finite() && scenario.frame_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "'frame-rate' must be positive, got {}",
                scenario.frame_rate
            )));
        }
        if scenario.minute_of_day >= poidsl::MINUTES_PER_DAY {
            return Err(ConfigError::Invalid(format!(
                "'minute-of-day' must be below {}, got {}",
                poidsl::MINUTES_PER_DAY,
                scenario.minute_of_day
            )));
        }
        for span in scenario.focus.iter().chain(scenario.tracked.iter()) {
            if span.from > span.to {
                return Err(ConfigError::Invalid(format!(
                    "Span from {:?} to {:?} ends before it starts",
                    span.from, span.to
                )));
            }
        }

        Ok(scenario)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    pub fn feed_path(&self) -> PathBuf {
        self.base_dir.join(&self.feed)
    }

    pub fn load_feed(&self) -> Result<Vec<PoiDefinition>, ConfigError> {
        let path = self.feed_path();
        let content = read_file(&path)?;
        let defs: Vec<PoiDefinition> = serde_json::from_str(&content)?;
        info!(
            pois = defs.len(),
            "Loaded definition feed '{}'",
            path.display()
        );
        Ok(defs)
    }

    pub fn frame_period(&self) -> Time {
        Time::from_secs(1.0 / self.frame_rate)
    }

    pub fn frame_count(&self) -> u64 {
        (self.duration.as_secs() * self.frame_rate).ceil() as u64
    }

    /// The most recent fix in `(prev, now]`
    pub fn fix_at(&self, prev: Option<Time>, now: Time) -> Option<LocationFix> {
        self.fixes
            .iter()
            .filter(|f| in_frame(f.at, prev, now))
            .last()
            .map(LocationFix::from)
    }

    pub fn signals_at(
        &self,
        prev: Option<Time>,
        now: Time,
    ) -> impl Iterator<Item = &ScriptedSignal> {
        self.signals.iter().filter(move |s| in_frame(s.at, prev, now))
    }

    pub fn click_at(&self, prev: Option<Time>, now: Time) -> Option<&ScriptedClick> {
        self.clicks.iter().find(|c| in_frame(c.at, prev, now))
    }

    pub fn focused_at(&self, t: Time) -> Vec<PoiId> {
        let ids: BTreeSet<PoiId> = self
            .focus
            .iter()
            .filter(|s| s.contains(t))
            .flat_map(|s| s.poi.iter().copied())
            .collect();
        ids.into_iter().collect()
    }

    pub fn tracked_at(&self, t: Time) -> BTreeSet<PoiId> {
        self.tracked
            .iter()
            .filter(|s| s.contains(t))
            .flat_map(|s| s.poi.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use indoc::indoc;

    const SCENARIO_TOML: &str = indoc! {r#"
        name = "plaza walk"
        feed = "plaza.json"
        frame-rate = 10.0
        duration = "3s"
        minute-of-day = 540

        [engine]
        area-size = 50.0
        seed = 7

        [[fix]]
        at = "0s"
        latitude = 48.2082
        longitude = 16.3738

        [[fix]]
        at = "1s"
        latitude = 48.2083
        longitude = 16.3738
        accuracy = 12.0

        [[signal]]
        at = "1500ms"
        poi = 3
        kind = "deactivated"

        [[focus]]
        from = "1s"
        to = "2s"
        poi = [1, 2]

        [[click]]
        at = "2s"
        poi = [1]

        [[tracked]]
        from = "0s"
        to = "1s"
        poi = [3]
    "#};

    #[test]
    fn parse_scenario() {
        let s = Scenario::from_str_checked(SCENARIO_TOML).unwrap();
        assert_eq!(s.display_name(), "plaza walk");
        assert_eq!(s.minute_of_day, 540);
        assert_eq!(s.frame_count(), 30);
        assert_relative_eq!(s.frame_period().as_secs(), 0.1);
        assert_relative_eq!(s.engine.area_size, 50.0);
        assert_eq!(s.engine.seed, Some(7));
        assert_eq!(s.fixes.len(), 2);
        assert_relative_eq!(s.fixes[0].accuracy, 5.0);
        assert_eq!(s.signals[0].kind, SignalKind::Deactivated);
        assert_eq!(s.feed_path(), PathBuf::from("plaza.json"));
    }

    #[test]
    fn script_lookups() {
        let s = Scenario::from_str_checked(SCENARIO_TOML).unwrap();
        let t = Time::from_secs;

        let fix = s.fix_at(None, t(0.0)).unwrap();
        assert_relative_eq!(fix.latitude, 48.2082);
        assert!(s.fix_at(Some(t(0.0)), t(0.5)).is_none());
        let fix = s.fix_at(Some(t(0.9)), t(1.0)).unwrap();
        assert_eq!(fix.timestamp_ms, 1000);
        assert_relative_eq!(fix.accuracy, 12.0);

        assert_eq!(s.signals_at(Some(t(1.4)), t(1.5)).count(), 1);
        assert_eq!(s.signals_at(Some(t(1.5)), t(1.6)).count(), 0);

        assert_eq!(s.focused_at(t(0.5)), Vec::<PoiId>::new());
        assert_eq!(s.focused_at(t(1.5)), vec![1, 2]);
        assert!(s.focused_at(t(2.0)).is_empty());

        assert!(s.click_at(Some(t(1.9)), t(2.0)).is_some());
        assert!(s.tracked_at(t(0.5)).contains(&3));
        assert!(s.tracked_at(t(1.0)).is_empty());
    }

    #[test]
    fn missing_feed_is_an_error() {
        let err = Scenario::from_str_checked("duration = '1s'").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn invalid_minute_of_day() {
        const TOML: &str = indoc! {r#"
            feed = "x.json"
            duration = "1s"
            minute-of-day = 1440
        "#};
        let err = Scenario::from_str_checked(TOML).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
