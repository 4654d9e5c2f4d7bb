use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use monitoring::ControlPoint;
use parking_lot::RwLock;
use tracing::debug;

use crate::pairs::{PairParams, PointPair, pair_points};

/// Generation-guarded pair recomputation.
///
/// Recompute runs off the interactive thread (the upstream `TimeFiltered`
/// sequence changes often) and publication is last-write-wins: a recompute
/// that was overtaken by a newer one finishes, but its result is discarded
/// instead of published. Readers only ever see complete pair lists.
pub struct PairAnalyzer {
    params: RwLock<PairParams>,
    generation: AtomicU64,
    published: RwLock<Arc<Vec<PointPair>>>,
}

impl PairAnalyzer {
    pub fn new(params: PairParams) -> Self {
        Self {
            params: RwLock::new(params),
            generation: AtomicU64::new(0),
            published: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn params(&self) -> PairParams {
        *self.params.read()
    }

    /// Replaces the pairing parameters. Takes effect on the next recompute.
    pub fn set_params(&self, params: PairParams) {
        *self.params.write() = params;
    }

    /// The most recently published pair list.
    pub fn latest(&self) -> Arc<Vec<PointPair>> {
        self.published.read().clone()
    }

    /// Runs one recompute on a blocking worker thread.
    ///
    /// Must be called from within a tokio runtime. The returned handle
    /// resolves to `true` when this recompute's result was published and
    /// `false` when it was discarded as stale.
    pub fn spawn_recompute(
        self: &Arc<Self>,
        points: Arc<Vec<Arc<ControlPoint>>>,
    ) -> tokio::task::JoinHandle<bool> {
        let analyzer = self.clone();
        let generation = analyzer.begin();
        tokio::task::spawn_blocking(move || {
            let params = analyzer.params();
            let pairs = pair_points(&points, &params);
            analyzer.publish_if_current(generation, pairs)
        })
    }

    /// Synchronous recompute on the caller's thread, with the same
    /// generation discipline as `spawn_recompute`.
    pub fn recompute_blocking(&self, points: &[Arc<ControlPoint>]) -> bool {
        let generation = self.begin();
        let params = self.params();
        let pairs = pair_points(points, &params);
        self.publish_if_current(generation, pairs)
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn publish_if_current(&self, generation: u64, pairs: Vec<PointPair>) -> bool {
        // Re-check under the write lock so a stale pass can never overwrite
        // a fresher publication.
        let mut slot = self.published.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "discarding stale pair recompute");
            return false;
        }
        *slot = Arc::new(pairs);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::PairAnalyzer;
    use crate::pairs::PairParams;
    use chrono::{TimeZone, Utc};
    use foundation::math::Vec3;
    use monitoring::{ControlPoint, Dimension, Observation};
    use std::sync::Arc;

    fn points() -> Vec<Arc<ControlPoint>> {
        let day = |d: u32| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let mk = |name: &str, x: f64| {
            Arc::new(ControlPoint {
                name: name.into(),
                group: "dam".into(),
                category: "crest".into(),
                status: "active".into(),
                dimension: Dimension::ThreeD,
                zero: Some(Vec3::new(x, 0.0, 0.0).into()),
                position: None,
                observations: vec![
                    Observation::new(day(1), Vec3::zero()),
                    Observation::new(day(11), Vec3::zero()),
                ],
            })
        };
        vec![mk("A", 0.0), mk("B", 3.0)]
    }

    fn open_params() -> PairParams {
        PairParams {
            min_distance_m: 0.0,
            max_distance_m: 10.0,
            min_quota: 0.0,
            alarm_rate_m_per_day: 0.01,
        }
    }

    #[test]
    fn blocking_recompute_publishes() {
        let analyzer = PairAnalyzer::new(open_params());
        assert!(analyzer.latest().is_empty());
        assert!(analyzer.recompute_blocking(&points()));
        assert_eq!(analyzer.latest().len(), 1);
    }

    #[test]
    fn stale_generation_is_discarded() {
        let analyzer = PairAnalyzer::new(open_params());
        let stale = analyzer.begin();
        let fresh = analyzer.begin();

        // The overtaken recompute finishes second but must not publish.
        assert!(analyzer.publish_if_current(fresh, Vec::new()));
        let pairs = crate::pairs::pair_points(&points(), &open_params());
        assert!(!analyzer.publish_if_current(stale, pairs));
        assert!(analyzer.latest().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn spawn_recompute_publishes_atomically() {
        let analyzer = Arc::new(PairAnalyzer::new(open_params()));
        let published = analyzer
            .spawn_recompute(Arc::new(points()))
            .await
            .expect("recompute task");
        assert!(published);
        assert_eq!(analyzer.latest().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn newer_spawn_wins() {
        let analyzer = Arc::new(PairAnalyzer::new(open_params()));
        let first = analyzer.spawn_recompute(Arc::new(points()));
        let second = analyzer.spawn_recompute(Arc::new(Vec::new()));
        // Either interleaving is allowed, but the empty (newer) input is the
        // one that must end up published.
        let _ = first.await;
        let second_published = second.await.expect("recompute task");
        assert!(second_published);
        assert!(analyzer.latest().is_empty());
    }
}
