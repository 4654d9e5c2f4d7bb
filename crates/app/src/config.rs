use std::collections::BTreeMap;

use analysis::PairParams;
use monitoring::AlarmBandClassifier;
use pipeline::MissingObservationPolicy;
use serde::{Deserialize, Serialize};

/// Monitoring data families shown as separate visual layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MonitoringKind {
    ControlPoints,
    Extensometers,
    StrainGauges,
    WeatherStations,
    TrafficCameras,
}

impl MonitoringKind {
    pub fn layer_index(self) -> u64 {
        match self {
            MonitoringKind::ControlPoints => 0,
            MonitoringKind::Extensometers => 1,
            MonitoringKind::StrainGauges => 2,
            MonitoringKind::WeatherStations => 3,
            MonitoringKind::TrafficCameras => 4,
        }
    }
}

/// Pairing parameters as they appear in configuration documents.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingConfig {
    pub min_distance_m: f64,
    pub max_distance_m: f64,
    pub min_quota: f64,
    pub alarm_rate_m_per_day: f64,
}

impl From<PairingConfig> for PairParams {
    fn from(c: PairingConfig) -> Self {
        PairParams {
            min_distance_m: c.min_distance_m,
            max_distance_m: c.max_distance_m,
            min_quota: c.min_quota,
            alarm_rate_m_per_day: c.alarm_rate_m_per_day,
        }
    }
}

/// Per-module configuration. Restored preferences arrive through the same
/// document at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub kind: MonitoringKind,
    pub debounce_ms: u64,
    pub missing_observations: MissingObservationPolicy,
    /// Displacement (meters) treated as quota 1.0 for single-point coloring.
    pub alarm_displacement_m: f64,
    pub bands: AlarmBandClassifier,
    /// `None` disables pairing for this module.
    pub pairing: Option<PairingConfig>,
    /// Per-category drawable caps; unlisted categories are unlimited.
    pub plot_caps: BTreeMap<String, usize>,
}

impl ModuleConfig {
    pub fn standard(kind: MonitoringKind) -> Self {
        let pairing = match kind {
            MonitoringKind::ControlPoints => Some(PairingConfig {
                min_distance_m: 0.0,
                max_distance_m: 50.0,
                min_quota: 0.05,
                alarm_rate_m_per_day: 0.01,
            }),
            _ => None,
        };
        Self {
            kind,
            debounce_ms: 250,
            missing_observations: MissingObservationPolicy::Drop,
            alarm_displacement_m: 0.05,
            bands: AlarmBandClassifier::default(),
            pairing,
            plot_caps: BTreeMap::from([("points".to_string(), 2_000), ("pairs".to_string(), 500)]),
        }
    }
}

/// The explicit registration table: every module the workspace runs, built
/// at startup. No runtime service discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub modules: Vec<ModuleConfig>,
}

impl WorkspaceConfig {
    pub fn standard() -> Self {
        Self {
            modules: vec![
                ModuleConfig::standard(MonitoringKind::ControlPoints),
                ModuleConfig::standard(MonitoringKind::Extensometers),
                ModuleConfig::standard(MonitoringKind::StrainGauges),
                ModuleConfig::standard(MonitoringKind::WeatherStations),
                ModuleConfig::standard(MonitoringKind::TrafficCameras),
            ],
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
