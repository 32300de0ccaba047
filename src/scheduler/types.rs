use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::events::{DetectorSettings, VisibilityWindow, DEFAULT_DISCARD_TOLERANCE_S};
use crate::orbit::{Ephemeris, EphemerisError, KeplerianOrbit, Propagator};
use crate::time::seconds_between;
use crate::visibility::{GroundVisibility, InterSatelliteVisibility};

#[derive(Clone)]
pub struct Satellite {
    /// Position in the scenario, kept stable when other satellites are rejected.
    pub index: usize,
    pub name: String,
    pub period_s: f64,
    pub orbit: Arc<dyn Propagator>,
}

impl Satellite {
    pub fn keplerian(index: usize, name: impl Into<String>, orbit: KeplerianOrbit) -> Self {
        Self {
            index,
            name: name.into(),
            period_s: orbit.period_s(),
            orbit: Arc::new(orbit),
        }
    }

    /// Replaces the propagator with an ephemeris sampled every `step_s` over `[start, end]`.
    pub fn with_ephemeris(
        self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step_s: f64,
    ) -> Result<Self, EphemerisError> {
        let ephemeris = Ephemeris::generate(self.orbit.as_ref(), start, end, step_s)?;
        Ok(Self {
            orbit: Arc::new(ephemeris),
            ..self
        })
    }
}

impl fmt::Debug for Satellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Satellite")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("period_s", &self.period_s)
            .finish_non_exhaustive()
    }
}

/// Everything a run needs besides the entities themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationContext {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub ground: GroundVisibility,
    pub ground_detector: DetectorSettings,
    pub inter_satellite: InterSatelliteVisibility,
    pub inter_satellite_detector: DetectorSettings,
    pub discard_tolerance_s: f64,
    pub workers: usize,
    /// Wall-clock limit on waiting for all pairs.
    pub timeout: Option<Duration>,
}

impl SimulationContext {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            ground: GroundVisibility::default(),
            ground_detector: DetectorSettings::default(),
            inter_satellite: InterSatelliteVisibility::default(),
            inter_satellite_detector: DetectorSettings::default(),
            discard_tolerance_s: DEFAULT_DISCARD_TOLERANCE_S,
            workers: default_workers(),
            timeout: None,
        }
    }

    pub fn duration_s(&self) -> f64 {
        seconds_between(self.start, self.end)
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// All windows involving one satellite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatResult {
    pub sat_index: usize,
    pub name: String,
    /// Ground station id to its windows.
    pub ground_stations: BTreeMap<String, Vec<VisibilityWindow>>,
    /// Index of a higher-indexed satellite to the windows shared with it.
    pub inter_satellite: BTreeMap<usize, Vec<VisibilityWindow>>,
}

impl SatResult {
    pub fn new(sat_index: usize, name: impl Into<String>) -> Self {
        Self {
            sat_index,
            name: name.into(),
            ground_stations: BTreeMap::new(),
            inter_satellite: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ground_stations.is_empty() && self.inter_satellite.is_empty()
    }

    pub fn window_count(&self) -> usize {
        self.ground_stations
            .values()
            .chain(self.inter_satellite.values())
            .map(Vec::len)
            .sum()
    }
}
