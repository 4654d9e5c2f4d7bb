use std::sync::Arc;

use foundation::math::{GeoPosition, Vec3, great_circle_midpoint, planar_distance, vertical_offset};
use monitoring::{ControlPoint, Dimension, Observation};

/// Parameters for one pairing pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PairParams {
    /// Distance band on zero coordinates, half-open `[min, max)` so a zero
    /// lower bound admits coincident points.
    pub min_distance_m: f64,
    pub max_distance_m: f64,
    /// Negligible-motion cutoff: a pair is dropped when both quotas satisfy
    /// `|quota| < min_quota`. Zero keeps everything.
    pub min_quota: f64,
    /// Differential-movement rate treated as quota 1.0 (alarm limit).
    pub alarm_rate_m_per_day: f64,
}

impl Default for PairParams {
    fn default() -> Self {
        Self {
            min_distance_m: 0.0,
            max_distance_m: 50.0,
            min_quota: 0.05,
            alarm_rate_m_per_day: 0.01,
        }
    }
}

/// A spatially-close pair of control points ranked by differential movement.
///
/// Wholly recomputed every pass; never mutated after construction.
#[derive(Debug, Clone)]
pub struct PointPair {
    pub a: Arc<ControlPoint>,
    pub b: Arc<ControlPoint>,
    /// Horizontal separation of the zero coordinates.
    pub planar_distance_m: f64,
    /// Signed vertical separation of the zero coordinates (`a.z - b.z`).
    pub vertical_distance_m: f64,
    /// Rate of change of horizontal separation over the common observation
    /// window, normalized by the alarm rate.
    pub planar_quota: f64,
    /// Same for the vertical separation.
    pub vertical_quota: f64,
    pub common_observations: usize,
    /// Great-circle midpoint of the live geographic positions; placement
    /// only, `None` when either point has no map position.
    pub midpoint: Option<GeoPosition>,
}

/// Finds all point pairs within the distance band, deduplicated and ranked.
///
/// Ordering contract:
/// - Within a pair, `a.name < b.name` (canonical order; the symmetric twin is
///   never emitted).
/// - The list is sorted by descending `|planar_quota|`, ties broken by the
///   canonical name pair, so output is reproducible across runs.
///
/// Intentionally O(n²) over the restricted set; restricted sets are hundreds
/// of points. A grid or k-d pre-filter can replace the nested scan if that
/// stops holding, as long as this dedup and ordering contract is preserved.
pub fn pair_points(points: &[Arc<ControlPoint>], params: &PairParams) -> Vec<PointPair> {
    let mut restricted: Vec<&Arc<ControlPoint>> = points
        .iter()
        .filter(|p| {
            p.dimension == Dimension::ThreeD
                && p.observations.len() >= 2
                && p.zero_coordinate().is_some_and(Vec3::is_finite)
        })
        .collect();
    restricted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut pairs = Vec::new();
    for i in 0..restricted.len() {
        for j in (i + 1)..restricted.len() {
            let (a, b) = (restricted[i], restricted[j]);
            if let Some(pair) = evaluate_pair(a, b, params) {
                pairs.push(pair);
            }
        }
    }

    pairs.sort_by(|x, y| {
        y.planar_quota
            .abs()
            .partial_cmp(&x.planar_quota.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (x.a.name.as_str(), x.b.name.as_str()).cmp(&(y.a.name.as_str(), y.b.name.as_str())))
    });
    pairs
}

fn evaluate_pair(
    a: &Arc<ControlPoint>,
    b: &Arc<ControlPoint>,
    params: &PairParams,
) -> Option<PointPair> {
    let zero_a = a.zero_coordinate()?;
    let zero_b = b.zero_coordinate()?;

    let distance = planar_distance(zero_a, zero_b);
    if distance < params.min_distance_m || distance >= params.max_distance_m {
        return None;
    }

    let common = common_observations(&a.observations, &b.observations);
    if common.len() < 2 {
        return None;
    }

    let (first_a, first_b) = common[0];
    let (last_a, last_b) = common[common.len() - 1];
    let elapsed_days = (last_a.at - first_a.at).num_seconds() as f64 / 86_400.0;
    if elapsed_days <= 0.0 {
        return None;
    }

    let sep_first = separation(zero_a, first_a, zero_b, first_b);
    let sep_last = separation(zero_a, last_a, zero_b, last_b);

    let planar_rate = (sep_last.planar_length() - sep_first.planar_length()) / elapsed_days;
    let vertical_rate = (sep_last.z - sep_first.z) / elapsed_days;
    let planar_quota = planar_rate / params.alarm_rate_m_per_day;
    let vertical_quota = vertical_rate / params.alarm_rate_m_per_day;

    if planar_quota.abs() < params.min_quota && vertical_quota.abs() < params.min_quota {
        return None;
    }

    let midpoint = match (a.geo_position(), b.geo_position()) {
        (Some(pa), Some(pb)) => Some(great_circle_midpoint(pa, pb)),
        _ => None,
    };

    Some(PointPair {
        a: a.clone(),
        b: b.clone(),
        planar_distance_m: distance,
        vertical_distance_m: vertical_offset(zero_a, zero_b),
        planar_quota,
        vertical_quota,
        common_observations: common.len(),
        midpoint,
    })
}

fn separation(zero_a: Vec3, obs_a: &Observation, zero_b: Vec3, obs_b: &Observation) -> Vec3 {
    (zero_a + obs_a.displacement()) - (zero_b + obs_b.displacement())
}

/// Date-aligned overlap of two observation sequences (merge join on the
/// timestamp; both sequences are ordered).
fn common_observations<'a>(
    a: &'a [Observation],
    b: &'a [Observation],
) -> Vec<(&'a Observation, &'a Observation)> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].at.cmp(&b[j].at) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push((&a[i], &b[j]));
                i += 1;
                j += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{PairParams, pair_points};
    use chrono::{TimeZone, Utc};
    use foundation::math::Vec3;
    use monitoring::{ControlPoint, Dimension, GeoPositionSer, Observation};
    use std::sync::Arc;

    fn day(d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn point(name: &str, zero: Vec3, obs: &[(u32, Vec3)]) -> Arc<ControlPoint> {
        Arc::new(ControlPoint {
            name: name.into(),
            group: "dam".into(),
            category: "crest".into(),
            status: "active".into(),
            dimension: Dimension::ThreeD,
            zero: Some(zero.into()),
            position: Some(GeoPositionSer {
                lat_deg: 46.0,
                lon_deg: 8.0,
            }),
            observations: obs
                .iter()
                .map(|(d, v)| Observation::new(day(*d), *v))
                .collect(),
        })
    }

    fn still(name: &str, zero: Vec3) -> Arc<ControlPoint> {
        point(name, zero, &[(1, Vec3::zero()), (11, Vec3::zero())])
    }

    fn params() -> PairParams {
        PairParams {
            min_distance_m: 0.0,
            max_distance_m: 10.0,
            min_quota: 0.0,
            alarm_rate_m_per_day: 0.01,
        }
    }

    #[test]
    fn symmetric_pairs_are_deduplicated() {
        let pairs = pair_points(
            &[still("B", Vec3::new(3.0, 0.0, 0.0)), still("A", Vec3::zero())],
            &params(),
        );
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].a.name, "A");
        assert_eq!(pairs[0].b.name, "B");
    }

    #[test]
    fn distance_band_is_half_open() {
        let p = PairParams {
            min_distance_m: 0.0,
            max_distance_m: 3.0,
            ..params()
        };
        // Coincident points pass the zero lower bound.
        let coincident = pair_points(&[still("A", Vec3::zero()), still("B", Vec3::zero())], &p);
        assert_eq!(coincident.len(), 1);

        // Distance exactly at the upper bound is excluded.
        let at_max = pair_points(
            &[still("A", Vec3::zero()), still("B", Vec3::new(3.0, 0.0, 0.0))],
            &p,
        );
        assert!(at_max.is_empty());
    }

    #[test]
    fn restriction_excludes_non_3d_and_sparse_points() {
        let mut flat = ControlPoint::clone(&still("F", Vec3::new(1.0, 0.0, 0.0)));
        flat.dimension = Dimension::TwoD;
        let sparse = point("S", Vec3::new(2.0, 0.0, 0.0), &[(1, Vec3::zero())]);
        let mut no_zero = ControlPoint::clone(&still("Z", Vec3::new(4.0, 0.0, 0.0)));
        no_zero.zero = None;

        let pairs = pair_points(
            &[
                still("A", Vec3::zero()),
                Arc::new(flat),
                sparse,
                Arc::new(no_zero),
            ],
            &params(),
        );
        assert!(pairs.is_empty());
    }

    #[test]
    fn fewer_than_two_common_observations_discards_pair() {
        // Observation dates never line up.
        let a = point(
            "A",
            Vec3::zero(),
            &[(1, Vec3::zero()), (3, Vec3::zero()), (5, Vec3::zero())],
        );
        let b = point(
            "B",
            Vec3::new(2.0, 0.0, 0.0),
            &[(2, Vec3::zero()), (4, Vec3::zero())],
        );
        assert!(pair_points(&[a, b], &params()).is_empty());
    }

    #[test]
    fn negligible_motion_is_rejected_strictly() {
        let a = still("A", Vec3::zero());
        let b = still("B", Vec3::new(2.0, 0.0, 0.0));

        let mut p = params();
        p.min_quota = 0.1;
        assert!(pair_points(&[a.clone(), b.clone()], &p).is_empty());

        // Strict comparison: epsilon zero keeps motionless pairs.
        p.min_quota = 0.0;
        assert_eq!(pair_points(&[a, b], &p).len(), 1);
    }

    #[test]
    fn quota_is_rate_over_alarm_rate() {
        // B drifts 0.1 m away from A over 10 days: 0.01 m/day, quota 1.0.
        let a = point("A", Vec3::zero(), &[(1, Vec3::zero()), (11, Vec3::zero())]);
        let b = point(
            "B",
            Vec3::new(2.0, 0.0, 0.0),
            &[(1, Vec3::zero()), (11, Vec3::new(0.1, 0.0, 0.0))],
        );
        let pairs = pair_points(&[a, b], &params());
        assert_eq!(pairs.len(), 1);
        assert!((pairs[0].planar_quota - 1.0).abs() < 1e-9);
        assert!(pairs[0].vertical_quota.abs() < 1e-9);
    }

    #[test]
    fn ranking_is_descending_absolute_planar_quota() {
        // Three disjoint clusters far apart so only intra-cluster pairs form.
        let mk = |name_a: &str, name_b: &str, offset: f64, drift: f64| {
            [
                point(
                    name_a,
                    Vec3::new(offset, 0.0, 0.0),
                    &[(1, Vec3::zero()), (11, Vec3::zero())],
                ),
                point(
                    name_b,
                    Vec3::new(offset + 2.0, 0.0, 0.0),
                    &[(1, Vec3::zero()), (11, Vec3::new(drift, 0.0, 0.0))],
                ),
            ]
        };
        // Quotas 0.9, 0.3, 0.6 (drift of 0.01 m/day is quota 1.0).
        let mut pts = Vec::new();
        pts.extend(mk("A1", "A2", 0.0, 0.09));
        pts.extend(mk("B1", "B2", 1000.0, 0.03));
        pts.extend(mk("C1", "C2", 2000.0, 0.06));

        let pairs = pair_points(&pts, &params());
        let quotas: Vec<f64> = pairs.iter().map(|p| p.planar_quota).collect();
        assert_eq!(pairs.len(), 3);
        assert!((quotas[0] - 0.9).abs() < 1e-9);
        assert!((quotas[1] - 0.6).abs() < 1e-9);
        assert!((quotas[2] - 0.3).abs() < 1e-9);
    }

    #[test]
    fn midpoint_comes_from_live_positions() {
        let mut a = ControlPoint::clone(&still("A", Vec3::zero()));
        a.position = Some(GeoPositionSer {
            lat_deg: 0.0,
            lon_deg: 0.0,
        });
        let mut b = ControlPoint::clone(&still("B", Vec3::new(2.0, 0.0, 0.0)));
        b.position = Some(GeoPositionSer {
            lat_deg: 0.0,
            lon_deg: 10.0,
        });
        let pairs = pair_points(&[Arc::new(a), Arc::new(b)], &params());
        let mid = pairs[0].midpoint.expect("both points have positions");
        assert!((mid.lon_deg - 5.0).abs() < 1e-9);

        let mut c = ControlPoint::clone(&still("C", Vec3::zero()));
        c.position = None;
        let d = still("D", Vec3::new(2.0, 0.0, 0.0));
        let pairs = pair_points(&[Arc::new(c), d], &params());
        assert!(pairs[0].midpoint.is_none());
    }
}
