use serde::{Deserialize, Serialize};

/// Discrete severity band for a quota (ratio of measured change to its alarm
/// limit). Band edges compare against `|quota|`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmBand {
    Quiet,
    Watch,
    Alert,
    Alarm,
}

impl AlarmBand {
    /// Stable style token for the renderer.
    pub fn token(self) -> &'static str {
        match self {
            AlarmBand::Quiet => "band-quiet",
            AlarmBand::Watch => "band-watch",
            AlarmBand::Alert => "band-alert",
            AlarmBand::Alarm => "band-alarm",
        }
    }

    pub fn color(self) -> [f32; 4] {
        match self {
            AlarmBand::Quiet => [0.20, 0.78, 0.35, 1.0],
            AlarmBand::Watch => [0.95, 0.85, 0.20, 1.0],
            AlarmBand::Alert => [0.95, 0.55, 0.10, 1.0],
            AlarmBand::Alarm => [0.90, 0.15, 0.15, 1.0],
        }
    }
}

/// Pure quota → band mapping with configurable edges.
///
/// Edges are lower bounds: `|quota| >= alarm` wins over `alert`, which wins
/// over `watch`. Non-finite quotas classify as `Alarm` so bad data is loud
/// rather than invisible.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmBandClassifier {
    pub watch: f64,
    pub alert: f64,
    pub alarm: f64,
}

impl Default for AlarmBandClassifier {
    fn default() -> Self {
        Self {
            watch: 0.5,
            alert: 0.8,
            alarm: 1.0,
        }
    }
}

impl AlarmBandClassifier {
    pub fn classify(&self, quota: f64) -> AlarmBand {
        if !quota.is_finite() {
            return AlarmBand::Alarm;
        }
        let q = quota.abs();
        if q >= self.alarm {
            AlarmBand::Alarm
        } else if q >= self.alert {
            AlarmBand::Alert
        } else if q >= self.watch {
            AlarmBand::Watch
        } else {
            AlarmBand::Quiet
        }
    }
}
