use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use monitoring::{ControlPoint, TimeRange};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::filter::FilterSpec;

/// A published, immutable point sequence. New revisions are new `Arc`s; a
/// reader holding an old snapshot never observes an in-place edit.
pub type PointSet = Arc<Vec<Arc<ControlPoint>>>;

/// Which published sequence changed, for change notifications.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    All,
    Filtered,
    TimeFiltered,
}

/// Whether a point without any observation survives the temporal filter.
///
/// The monitoring modules disagree on this, so it is a per-pipeline flag
/// rather than a global answer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingObservationPolicy {
    Retain,
    Drop,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Callback = Arc<dyn Fn(Stage) + Send + Sync>;

struct State {
    all: PointSet,
    filtered: PointSet,
    time_filtered: PointSet,
    spec: FilterSpec,
    range: Option<TimeRange>,
    revision: u64,
}

/// Three-stage data funnel: `All` → (attribute/area predicates) → `Filtered`
/// → (date range) → `TimeFiltered`.
///
/// Invariants:
/// - `TimeFiltered ⊆ Filtered ⊆ All` at every published revision; all three
///   sequences for one revision are derived inside a single critical section.
/// - Derived sequences preserve the order of `All`, so re-applying the same
///   predicates yields the same sequence in the same order.
/// - A point whose predicate evaluation fails is excluded and logged; one
///   malformed point never blanks the view.
pub struct FilterPipeline {
    policy: MissingObservationPolicy,
    state: RwLock<State>,
    subscribers: RwLock<Vec<(SubscriberId, Callback)>>,
    next_subscriber: AtomicU64,
}

impl FilterPipeline {
    pub fn new(policy: MissingObservationPolicy) -> Self {
        let empty: PointSet = Arc::new(Vec::new());
        Self {
            policy,
            state: RwLock::new(State {
                all: empty.clone(),
                filtered: empty.clone(),
                time_filtered: empty,
                spec: FilterSpec::default(),
                range: None,
                revision: 0,
            }),
            subscribers: RwLock::new(Vec::new()),
            next_subscriber: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> MissingObservationPolicy {
        self.policy
    }

    /// Replaces the base collection wholesale (loader entry point) and
    /// recomputes both derived sequences.
    pub fn set_all(&self, points: Vec<Arc<ControlPoint>>) {
        {
            let mut state = self.state.write();
            state.all = Arc::new(points);
            state.filtered = apply_spec(&state.spec, &state.all);
            state.time_filtered = apply_range(self.policy, state.range, &state.filtered);
            state.revision += 1;
        }
        self.notify(&[Stage::All, Stage::Filtered, Stage::TimeFiltered]);
    }

    /// Replaces the predicate set and recomputes `Filtered` (and therefore
    /// `TimeFiltered`).
    pub fn set_filter(&self, spec: FilterSpec) {
        {
            let mut state = self.state.write();
            state.spec = spec;
            state.filtered = apply_spec(&state.spec, &state.all);
            state.time_filtered = apply_range(self.policy, state.range, &state.filtered);
            state.revision += 1;
        }
        self.notify(&[Stage::Filtered, Stage::TimeFiltered]);
    }

    /// Sets or clears the inclusive date bound and recomputes `TimeFiltered`.
    pub fn set_time_range(&self, range: Option<TimeRange>) {
        {
            let mut state = self.state.write();
            state.range = range;
            state.time_filtered = apply_range(self.policy, state.range, &state.filtered);
            state.revision += 1;
        }
        self.notify(&[Stage::TimeFiltered]);
    }

    pub fn all(&self) -> PointSet {
        self.state.read().all.clone()
    }

    pub fn filtered(&self) -> PointSet {
        self.state.read().filtered.clone()
    }

    pub fn time_filtered(&self) -> PointSet {
        self.state.read().time_filtered.clone()
    }

    /// Monotonic counter bumped on every publication, so readers can
    /// correlate snapshots taken across accessor calls.
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Registers a change listener. The callback runs on whichever thread
    /// triggered the mutation, once per changed stage.
    pub fn subscribe(&self, callback: impl Fn(Stage) + Send + Sync + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Removes a listener. Returns `true` if it was still registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subs = self.subscribers.write();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    fn notify(&self, stages: &[Stage]) {
        // Snapshot the callbacks so a callback may (un)subscribe without
        // deadlocking against the registry lock.
        let callbacks: Vec<Callback> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for stage in stages {
            for cb in &callbacks {
                cb(*stage);
            }
        }
    }
}

fn apply_spec(spec: &FilterSpec, all: &PointSet) -> PointSet {
    let mut out = Vec::with_capacity(all.len());
    for point in all.iter() {
        match spec.accepts(point) {
            Ok(true) => out.push(point.clone()),
            Ok(false) => {}
            Err(err) => {
                warn!(point = %point.name, error = %err, "excluding point from filter pass");
            }
        }
    }
    Arc::new(out)
}

fn apply_range(
    policy: MissingObservationPolicy,
    range: Option<TimeRange>,
    filtered: &PointSet,
) -> PointSet {
    let Some(range) = range else {
        return filtered.clone();
    };
    let mut out = Vec::with_capacity(filtered.len());
    for point in filtered.iter() {
        let keep = if point.has_observations() {
            point.observations.iter().any(|o| range.contains(o.at))
        } else {
            policy == MissingObservationPolicy::Retain
        };
        if keep {
            out.push(point.clone());
        }
    }
    Arc::new(out)
}
