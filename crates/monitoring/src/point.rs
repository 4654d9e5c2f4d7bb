use chrono::{DateTime, Utc};
use foundation::math::{GeoPosition, Vec3};
use serde::{Deserialize, Serialize};

/// Which axes of a control point are actively measured.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    OneD,
    TwoD,
    ThreeD,
}

/// One measurement of a control point.
///
/// Values are per-axis displacements (meters) relative to the point's zero
/// coordinate. Observations are owned by exactly one `ControlPoint` and are
/// ordered by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub at: DateTime<Utc>,
    pub displacement: Vec3Ser,
    pub is_zero_measurement: bool,
    pub is_replacement_measurement: bool,
}

impl Observation {
    pub fn new(at: DateTime<Utc>, displacement: Vec3) -> Self {
        Self {
            at,
            displacement: Vec3Ser::from(displacement),
            is_zero_measurement: false,
            is_replacement_measurement: false,
        }
    }

    pub fn displacement(&self) -> Vec3 {
        self.displacement.into()
    }
}

/// Serde-friendly mirror of `foundation::Vec3`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vec3Ser {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Vec3> for Vec3Ser {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Vec3Ser> for Vec3 {
    fn from(v: Vec3Ser) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// A named monitoring point.
///
/// Publication contract: a `ControlPoint` is a value. The loader replaces the
/// whole collection on every reload; once a point is part of a published
/// snapshot no one mutates it, so readers may hold `Arc<ControlPoint>` across
/// load generations without locking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub name: String,
    pub group: String,
    pub category: String,
    pub status: String,
    pub dimension: Dimension,
    /// Reference position at the zero measurement, site-local meters.
    pub zero: Option<Vec3Ser>,
    /// Live geographic position for map placement.
    pub position: Option<GeoPositionSer>,
    /// Ordered by timestamp.
    pub observations: Vec<Observation>,
}

impl ControlPoint {
    pub fn zero_coordinate(&self) -> Option<Vec3> {
        self.zero.map(Vec3::from)
    }

    pub fn geo_position(&self) -> Option<GeoPosition> {
        self.position.map(GeoPosition::from)
    }

    pub fn has_observations(&self) -> bool {
        !self.observations.is_empty()
    }
}

/// Serde-friendly mirror of `foundation::GeoPosition`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPositionSer {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl From<GeoPosition> for GeoPositionSer {
    fn from(p: GeoPosition) -> Self {
        Self {
            lat_deg: p.lat_deg,
            lon_deg: p.lon_deg,
        }
    }
}

impl From<GeoPositionSer> for GeoPosition {
    fn from(p: GeoPositionSer) -> Self {
        GeoPosition::new(p.lat_deg, p.lon_deg)
    }
}
