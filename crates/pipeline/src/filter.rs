use std::collections::BTreeSet;

use foundation::math::{GeoPosition, haversine_distance_m};
use monitoring::{ControlPoint, GeoPositionSer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Evaluation failure for a single point. These never abort a recomputation;
/// the pipeline logs them and excludes the point from the pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("point {name} has a non-finite geographic position")]
    InvalidPosition { name: String },
    #[error("area polygon needs at least 3 vertices, got {got}")]
    DegeneratePolygon { got: usize },
}

/// Spatial constraint from the area selection controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AreaFilter {
    Circle {
        center: GeoPositionSer,
        radius_m: f64,
    },
    Polygon {
        vertices: Vec<GeoPositionSer>,
    },
}

impl AreaFilter {
    fn contains(&self, p: GeoPosition) -> Result<bool, FilterError> {
        match self {
            AreaFilter::Circle { center, radius_m } => {
                Ok(haversine_distance_m(GeoPosition::from(*center), p) <= *radius_m)
            }
            AreaFilter::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(FilterError::DegeneratePolygon {
                        got: vertices.len(),
                    });
                }
                Ok(point_in_polygon(p, vertices))
            }
        }
    }
}

/// Attribute/free-text/spatial predicate set applied to `All` to produce
/// `Filtered`. Opaque value object from the UI filter controls; restored
/// preferences enter through the same type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Case-insensitive substring over name, group, category and status.
    pub text: Option<String>,
    /// Accepted category values; `None` accepts all.
    pub categories: Option<BTreeSet<String>>,
    /// Accepted status labels; `None` accepts all.
    pub statuses: Option<BTreeSet<String>>,
    pub area: Option<AreaFilter>,
}

impl FilterSpec {
    pub fn accepts(&self, point: &ControlPoint) -> Result<bool, FilterError> {
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            if !needle.is_empty() && !matches_text(point, &needle) {
                return Ok(false);
            }
        }

        if let Some(categories) = &self.categories
            && !categories.contains(&point.category)
        {
            return Ok(false);
        }

        if let Some(statuses) = &self.statuses
            && !statuses.contains(&point.status)
        {
            return Ok(false);
        }

        if let Some(area) = &self.area {
            let Some(pos) = point.geo_position() else {
                // A point without a map position cannot satisfy an area
                // constraint.
                return Ok(false);
            };
            if !pos.is_finite() {
                return Err(FilterError::InvalidPosition {
                    name: point.name.clone(),
                });
            }
            return area.contains(pos);
        }

        Ok(true)
    }
}

fn matches_text(point: &ControlPoint, needle: &str) -> bool {
    point.name.to_lowercase().contains(needle)
        || point.group.to_lowercase().contains(needle)
        || point.category.to_lowercase().contains(needle)
        || point.status.to_lowercase().contains(needle)
}

/// Even-odd ray cast on the (lon, lat) plane. Good enough for the hand-drawn
/// selection polygons this receives; not meant for polygons spanning the
/// antimeridian.
fn point_in_polygon(p: GeoPosition, vertices: &[GeoPositionSer]) -> bool {
    let (px, py) = (p.lon_deg, p.lat_deg);
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].lon_deg, vertices[i].lat_deg);
        let (xj, yj) = (vertices[j].lon_deg, vertices[j].lat_deg);
        if ((yi > py) != (yj > py)) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
