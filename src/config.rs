use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::events::{DetectorSettings, DEFAULT_DISCARD_TOLERANCE_S};
use crate::frames::{GroundStation, WGS84_A_M};
use crate::orbit::{ConfigurationError, EphemerisError, KeplerianElements, KeplerianOrbit};
use crate::scheduler::{default_workers, Satellite, SimulationContext};
use crate::time::checked_shifted_by;
use crate::visibility::{FovPolicy, GroundVisibility, InterSatelliteVisibility};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("no valid satellites ({} rejected)", .0.len())]
    NoValidSatellites(Vec<(usize, ConfigurationError)>),
    #[error("satellite #{index}: {source}")]
    Ephemeris {
        index: usize,
        source: EphemerisError,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub simulation: ScenarioConfig,
    #[serde(default)]
    pub visibility: VisibilityConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub start_time: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_duration")]
    pub duration: Option<Duration>,
    pub duration_seconds: Option<f64>,
    /// Kept as raw YAML so one malformed entry only rejects that satellite.
    pub satellites: Vec<serde_yaml::Value>,
    #[serde(default)]
    pub ground_stations: Vec<GroundStationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SatelliteConfig {
    pub name: Option<String>,
    #[serde(flatten)]
    pub elements: KeplerianElements,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroundStationConfig {
    pub id: Option<String>,
    pub lat_deg: f64,
    pub lon_deg: f64,
    #[serde(default)]
    pub alt_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisibilityConfig {
    #[serde(default)]
    pub ground: GroundConfig,
    #[serde(default)]
    pub inter_satellite: InterSatelliteConfig,
    #[serde(default = "default_discard_tolerance")]
    pub discard_tolerance_s: f64,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            ground: GroundConfig::default(),
            inter_satellite: InterSatelliteConfig::default(),
            discard_tolerance_s: DEFAULT_DISCARD_TOLERANCE_S,
        }
    }
}

fn default_discard_tolerance() -> f64 {
    DEFAULT_DISCARD_TOLERANCE_S
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroundConfig {
    #[serde(default)]
    pub min_elevation_deg: f64,
    #[serde(default = "default_fov_half_angle")]
    pub fov_half_angle_deg: f64,
    #[serde(default)]
    pub fov_policy: FovPolicy,
    #[serde(flatten)]
    pub detector: DetectorConfig,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            min_elevation_deg: 0.0,
            fov_half_angle_deg: default_fov_half_angle(),
            fov_policy: FovPolicy::default(),
            detector: DetectorConfig::default(),
        }
    }
}

fn default_fov_half_angle() -> f64 {
    45.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterSatelliteConfig {
    #[serde(default = "default_max_range")]
    pub max_range_m: f64,
    #[serde(flatten)]
    pub detector: DetectorConfig,
}

impl Default for InterSatelliteConfig {
    fn default() -> Self {
        Self {
            max_range_m: default_max_range(),
            detector: DetectorConfig::default(),
        }
    }
}

fn default_max_range() -> f64 {
    InterSatelliteVisibility::default().max_range_m
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_max_check", deserialize_with = "duration")]
    pub max_check: Duration,
    #[serde(default = "default_threshold", deserialize_with = "duration")]
    pub threshold: Duration,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_check: default_max_check(),
            threshold: default_threshold(),
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_max_check() -> Duration {
    Duration::from_secs_f64(DetectorSettings::default().max_check_s)
}

fn default_threshold() -> Duration {
    Duration::from_secs_f64(DetectorSettings::default().threshold_s)
}

fn default_max_iterations() -> usize {
    DetectorSettings::default().max_iterations
}

impl DetectorConfig {
    fn settings(&self, section: &str) -> Result<DetectorSettings, ConfigError> {
        let settings = DetectorSettings {
            max_check_s: self.max_check.as_secs_f64(),
            threshold_s: self.threshold.as_secs_f64(),
            max_iterations: self.max_iterations,
        };
        if settings.max_check_s <= 0.0 {
            return Err(invalid(format!("{section}.max_check must be positive")));
        }
        if settings.threshold_s <= 0.0 {
            return Err(invalid(format!("{section}.threshold must be positive")));
        }
        if settings.max_iterations == 0 {
            return Err(invalid(format!("{section}.max_iterations must be positive")));
        }
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutionConfig {
    pub workers: Option<usize>,
    #[serde(default, deserialize_with = "optional_duration")]
    pub timeout: Option<Duration>,
    #[serde(default, deserialize_with = "optional_duration")]
    pub ephemeris_step: Option<Duration>,
}

/// Durations may be written as humantime strings (`"90s"`, `"1h 30m"`) or plain seconds.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Text(String),
    Seconds(f64),
}

impl RawDuration {
    fn parse(self) -> Result<Duration, String> {
        match self {
            RawDuration::Text(s) => {
                humantime::parse_duration(s.trim()).map_err(|e| e.to_string())
            }
            RawDuration::Seconds(s) => {
                Duration::try_from_secs_f64(s).map_err(|e| format!("{s} seconds: {e}"))
            }
        }
    }
}

fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    RawDuration::deserialize(deserializer)?
        .parse()
        .map_err(serde::de::Error::custom)
}

fn optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawDuration>::deserialize(deserializer)?
        .map(RawDuration::parse)
        .transpose()
        .map_err(serde::de::Error::custom)
}

/// Entities and context ready for [`crate::scheduler::compute_all`].
#[derive(Debug, Clone)]
pub struct Scenario {
    pub context: SimulationContext,
    pub satellites: Vec<Satellite>,
    pub ground_stations: Vec<GroundStation>,
    /// Satellites left out, by their position in the file.
    pub rejected: Vec<(usize, ConfigurationError)>,
}

impl SimulationConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn duration_s(&self) -> Result<f64, ConfigError> {
        let sim = &self.simulation;
        let seconds = match (sim.duration, sim.duration_seconds) {
            (Some(d), None) => d.as_secs_f64(),
            (None, Some(s)) => s,
            (Some(_), Some(_)) => {
                return Err(invalid("set only one of duration and duration_seconds"))
            }
            (None, None) => return Err(invalid("missing duration or duration_seconds")),
        };
        if !positive(seconds) {
            return Err(invalid(format!("duration must be positive, got {seconds} s")));
        }
        Ok(seconds)
    }

    pub fn context(&self) -> Result<SimulationContext, ConfigError> {
        let start = self.simulation.start_time;
        let end = checked_shifted_by(start, self.duration_s()?)
            .ok_or_else(|| invalid("duration exceeds the representable time range"))?;
        let vis = &self.visibility;

        let ground = GroundVisibility {
            min_elevation_deg: vis.ground.min_elevation_deg,
            fov_half_angle_deg: vis.ground.fov_half_angle_deg,
            fov_policy: vis.ground.fov_policy,
        };
        if !(-90.0..=90.0).contains(&ground.min_elevation_deg) {
            return Err(invalid("ground.min_elevation_deg must lie in [-90, 90]"));
        }
        if !positive(ground.fov_half_angle_deg) {
            return Err(invalid("ground.fov_half_angle_deg must be positive"));
        }
        let inter_satellite = InterSatelliteVisibility {
            max_range_m: vis.inter_satellite.max_range_m,
        };
        if !positive(inter_satellite.max_range_m) {
            return Err(invalid("inter_satellite.max_range_m must be positive"));
        }
        if !(vis.discard_tolerance_s.is_finite() && vis.discard_tolerance_s >= 0.0) {
            return Err(invalid("discard_tolerance_s must not be negative"));
        }

        let workers = match self.execution.workers {
            Some(0) => return Err(invalid("execution.workers must be at least 1")),
            Some(n) => n,
            None => default_workers(),
        };

        Ok(SimulationContext {
            start,
            end,
            ground,
            ground_detector: vis.ground.detector.settings("ground")?,
            inter_satellite,
            inter_satellite_detector: vis.inter_satellite.detector.settings("inter_satellite")?,
            discard_tolerance_s: vis.discard_tolerance_s,
            workers,
            timeout: self.execution.timeout,
        })
    }

    pub fn ground_stations(&self) -> Result<Vec<GroundStation>, ConfigError> {
        let mut seen = HashSet::new();
        let mut stations = Vec::with_capacity(self.simulation.ground_stations.len());
        for (i, gs) in self.simulation.ground_stations.iter().enumerate() {
            let id = gs.id.clone().unwrap_or_else(|| format!("gs-{i}"));
            if !(-90.0..=90.0).contains(&gs.lat_deg) {
                return Err(invalid(format!(
                    "ground station {id}: lat_deg must lie in [-90, 90]"
                )));
            }
            if !(-180.0..=360.0).contains(&gs.lon_deg) {
                return Err(invalid(format!(
                    "ground station {id}: lon_deg must lie in [-180, 360]"
                )));
            }
            if !gs.alt_m.is_finite() {
                return Err(invalid(format!("ground station {id}: alt_m must be finite")));
            }
            if !seen.insert(id.clone()) {
                return Err(invalid(format!("duplicate ground station id {id}")));
            }
            stations.push(GroundStation::new(id, gs.lat_deg, gs.lon_deg, gs.alt_m));
        }
        Ok(stations)
    }

    /// Validates every entry and builds the run. Invalid satellites are logged
    /// and skipped; the remaining ones keep their position in the file as index.
    pub fn build_context(&self) -> Result<Scenario, ConfigError> {
        let context = self.context()?;
        let ground_stations = self.ground_stations()?;

        let mut satellites = Vec::new();
        let mut rejected = Vec::new();
        for (index, raw) in self.simulation.satellites.iter().enumerate() {
            match build_satellite(index, raw) {
                Ok(satellite) => satellites.push(satellite),
                Err(err) => {
                    warn!("Skipping satellite #{}: {}", index, err);
                    rejected.push((index, err));
                }
            }
        }
        if satellites.is_empty() {
            return Err(ConfigError::NoValidSatellites(rejected));
        }

        if let Some(step) = self.execution.ephemeris_step {
            let step_s = step.as_secs_f64();
            satellites = satellites
                .into_iter()
                .map(|satellite| {
                    let index = satellite.index;
                    satellite
                        .with_ephemeris(context.start, context.end, step_s)
                        .map_err(|source| ConfigError::Ephemeris { index, source })
                })
                .collect::<Result<_, _>>()?;
        }

        info!(
            "Loaded {} satellite(s) ({} rejected) and {} ground station(s) over {:.0}s",
            satellites.len(),
            rejected.len(),
            ground_stations.len(),
            context.duration_s()
        );

        Ok(Scenario {
            context,
            satellites,
            ground_stations,
            rejected,
        })
    }
}

fn build_satellite(
    index: usize,
    raw: &serde_yaml::Value,
) -> Result<Satellite, ConfigurationError> {
    let config: SatelliteConfig = serde_yaml::from_value(raw.clone())
        .map_err(|e| ConfigurationError::Malformed(e.to_string()))?;
    let elements = config.elements;
    elements.validate()?;
    if elements.perigee_radius_m() <= WGS84_A_M {
        warn!(
            "Satellite #{} has its perigee {:.0} m inside the earth's equatorial radius",
            index,
            WGS84_A_M - elements.perigee_radius_m()
        );
    }

    let orbit = KeplerianOrbit::new(elements).map_err(|_| ConfigurationError::InvalidElement {
        field: "eccentricity",
        value: elements.eccentricity,
        reason: "unsupported by two-body propagation",
    })?;
    let name = config.name.unwrap_or_else(|| format!("sat-{index}"));
    Ok(Satellite::keplerian(index, name, orbit))
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
