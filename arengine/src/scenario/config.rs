use crate::{
    geo::{FilterConfig, ProjectorConfig},
    orchestrator::OrchestratorConfig,
    tracking::TrackingConfig,
    units::Time,
};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::{fs, io, path::Path};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read '{path}'")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse the definition feed")]
    Json(#[from] serde_json::Error),

    #[error("Invalid poi-filter pattern")]
    Regex(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub(crate) fn read_file<P: AsRef<Path>>(path: P) -> Result<String, ConfigError> {
    fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
        path: path.as_ref().display().to_string(),
        source,
    })
}

/// Durations are written the humantime way, e.g. `"1500ms"` or `"2m 30s"`
pub(crate) fn deserialize_time<'de, D>(deserializer: D) -> Result<Time, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(&s)
        .map(Time::from_std_duration)
        .map_err(serde::de::Error::custom)
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub filter_enabled: bool,
    /// [m/s]
    pub process_noise: f64,

    /// [m]
    pub area_size: f64,
    /// [m]
    pub area_width: f64,
    pub visibility_tolerance: f64,
    pub position_lerp: f64,
    pub jump_fraction: f64,

    #[serde(deserialize_with = "deserialize_time")]
    pub periodic_min: Time,
    #[serde(deserialize_with = "deserialize_time")]
    pub periodic_max: Time,
    #[serde(deserialize_with = "deserialize_time")]
    pub activation_sleep: Time,
    #[serde(deserialize_with = "deserialize_time")]
    pub tracking_hold: Time,

    /// Duplicates land up to this far from their source, per axis [m]
    pub duplicate_spread: f64,

    pub seed: Option<u64>,
    /// Only POIs whose title matches are instantiated
    pub poi_filter: Option<String>,
    pub duration_stretch: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        let filter = FilterConfig::default();
        let projector = ProjectorConfig::default();
        let orchestrator = OrchestratorConfig::default();
        Config {
            filter_enabled: filter.enabled,
            process_noise: filter.process_noise,
            area_size: projector.area_size,
            area_width: projector.area_width,
            visibility_tolerance: projector.visibility_tolerance,
            position_lerp: projector.position_lerp,
            jump_fraction: projector.jump_fraction,
            periodic_min: *orchestrator.periodic_range.start(),
            periodic_max: *orchestrator.periodic_range.end(),
            activation_sleep: orchestrator.activation_sleep,
            tracking_hold: TrackingConfig::default().hold_period,
            duplicate_spread: 1.0,
            seed: None,
            poi_filter: None,
            duration_stretch: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = read_file(path)?;
        Self::from_str_checked(&content)
    }

    pub fn from_str_checked(s: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("process-noise", self.process_noise),
            ("area-size", self.area_size),
            ("area-width", self.area_width),
            ("duplicate-spread", self.duplicate_spread),
        ];
        for (name, value) in non_negative.iter() {
            if !value.is_finite() || *value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "'{name}' must be a non-negative number, got {value}"
                )));
            }
        }

        if self.visibility_tolerance <= 0.0 {
            return Err(ConfigError::Invalid(
                "'visibility-tolerance' must be positive".to_owned(),
            ));
        }
        if !(self.position_lerp > 0.0 && self.position_lerp <= 1.0) {
            return Err(ConfigError::Invalid(
                "'position-lerp' must be within (0, 1]".to_owned(),
            ));
        }
        if self.jump_fraction <= 0.0 {
            return Err(ConfigError::Invalid(
                "'jump-fraction' must be positive".to_owned(),
            ));
        }
        if self.periodic_min > self.periodic_max {
            return Err(ConfigError::Invalid(format!(
                "'periodic-min' ({:?}) is larger than 'periodic-max' ({:?})",
                self.periodic_min, self.periodic_max
            )));
        }
        if let Some(stretch) = self.duration_stretch {
            if stretch <= 0.0 {
                return Err(ConfigError::Invalid(
                    "'duration-stretch' must be positive".to_owned(),
                ));
            }
        }

        self.poi_filter()?;
        Ok(())
    }

    pub fn poi_filter(&self) -> Result<Option<Regex>, ConfigError> {
        Ok(self.poi_filter.as_deref().map(Regex::new).transpose()?)
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            enabled: self.filter_enabled,
            process_noise: self.process_noise,
        }
    }

    pub fn projector_config(&self) -> ProjectorConfig {
        ProjectorConfig {
            area_size: self.area_size,
            area_width: self.area_width,
            visibility_tolerance: self.visibility_tolerance,
            position_lerp: self.position_lerp,
            jump_fraction: self.jump_fraction,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            periodic_range: self.periodic_min..=self.periodic_max,
            activation_sleep: self.activation_sleep,
            duration_stretch: self.duration_stretch,
        }
    }

    pub fn tracking_config(&self) -> TrackingConfig {
        TrackingConfig {
            hold_period: self.tracking_hold,
        }
    }
}
