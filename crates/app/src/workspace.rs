use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use analysis::PairAnalyzer;
use monitoring::ControlPoint;
use painting::{
    Drawable, LayerId, LayerStore, MarkerStyle, PaintError, PickTarget, PlotLimiter,
    RepaintScheduler,
};
use parking_lot::Mutex;
use pipeline::{FilterPipeline, Stage};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::config::{ModuleConfig, MonitoringKind, WorkspaceConfig};

pub const CATEGORY_POINTS: &str = "points";
pub const CATEGORY_PAIRS: &str = "pairs";

/// One monitoring module: its filter funnel, optional pair analyzer, layer
/// drawable store and repaint scheduler, wired together.
pub struct Module {
    kind: MonitoringKind,
    pipeline: Arc<FilterPipeline>,
    analyzer: Option<Arc<PairAnalyzer>>,
    store: Arc<LayerStore>,
    scheduler: Arc<RepaintScheduler>,
}

impl Module {
    pub fn kind(&self) -> MonitoringKind {
        self.kind
    }

    pub fn layer(&self) -> LayerId {
        self.scheduler.layer()
    }

    pub fn pipeline(&self) -> &Arc<FilterPipeline> {
        &self.pipeline
    }

    pub fn analyzer(&self) -> Option<&Arc<PairAnalyzer>> {
        self.analyzer.as_ref()
    }

    pub fn store(&self) -> &Arc<LayerStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<RepaintScheduler> {
        &self.scheduler
    }
}

/// Explicit ownership of every per-module pipeline, analyzer and scheduler,
/// constructed once at startup from the registration table. There is no
/// ambient global lookup; callers hold a reference to the workspace.
///
/// Must be constructed inside a tokio runtime: paint passes, debounce timers
/// and pair recomputes all run on it.
pub struct Workspace {
    modules: BTreeMap<MonitoringKind, Module>,
}

impl Workspace {
    pub fn new(config: WorkspaceConfig) -> (Self, mpsc::UnboundedReceiver<LayerId>) {
        let (redraw_tx, redraw_rx) = mpsc::unbounded_channel();
        let mut modules = BTreeMap::new();
        for module_config in config.modules {
            let module = build_module(module_config, redraw_tx.clone());
            modules.insert(module.kind, module);
        }
        (Self { modules }, redraw_rx)
    }

    pub fn module(&self, kind: MonitoringKind) -> Option<&Module> {
        self.modules.get(&kind)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }
}

fn build_module(config: ModuleConfig, redraw_tx: mpsc::UnboundedSender<LayerId>) -> Module {
    let pipeline = Arc::new(FilterPipeline::new(config.missing_observations));
    let analyzer = config
        .pairing
        .map(|p| Arc::new(PairAnalyzer::new(p.into())));
    let store = Arc::new(LayerStore::new());
    let limiter = Arc::new(Mutex::new(PlotLimiter::with_limits(config.plot_caps.clone())));
    let layer = LayerId(config.kind.layer_index());

    // Weak reference breaks the pipeline → scheduler → paint → pipeline
    // cycle; the module owns the strong references.
    let paint_pipeline: Weak<FilterPipeline> = Arc::downgrade(&pipeline);
    let paint_analyzer = analyzer.clone();
    let paint_store = store.clone();
    let bands = config.bands;
    let alarm_displacement_m = config.alarm_displacement_m;
    let paint = move || -> Result<(), PaintError> {
        let Some(pipeline) = paint_pipeline.upgrade() else {
            return Ok(());
        };
        let mut limiter = limiter.lock();
        limiter.reset();

        let mut drawables = Vec::new();
        for point in pipeline.time_filtered().iter() {
            let Some(position) = point.geo_position() else {
                continue;
            };
            if !limiter.try_acquire(CATEGORY_POINTS) {
                continue;
            }
            let band = bands.classify(point_quota(point, alarm_displacement_m));
            drawables.push(Drawable {
                position,
                style: MarkerStyle::from_band(band),
                label: Some(point.name.clone()),
                pick: Some(PickTarget::Point {
                    name: point.name.clone(),
                }),
            });
        }

        if let Some(analyzer) = &paint_analyzer {
            for pair in analyzer.latest().iter() {
                let Some(midpoint) = pair.midpoint else {
                    continue;
                };
                if !limiter.try_acquire(CATEGORY_PAIRS) {
                    continue;
                }
                let band = bands.classify(pair.planar_quota);
                drawables.push(Drawable {
                    position: midpoint,
                    style: MarkerStyle::from_band(band),
                    label: Some(format!("{}/{}", pair.a.name, pair.b.name)),
                    pick: Some(PickTarget::Pair {
                        a: pair.a.name.clone(),
                        b: pair.b.name.clone(),
                    }),
                });
            }
        }

        paint_store.publish(drawables);
        Ok(())
    };

    let scheduler = Arc::new(RepaintScheduler::new(
        layer,
        Duration::from_millis(config.debounce_ms),
        paint,
        redraw_tx,
    ));

    let sub_pipeline = Arc::downgrade(&pipeline);
    let sub_analyzer = analyzer.clone();
    let sub_scheduler = scheduler.clone();
    let runtime = Handle::current();
    pipeline.subscribe(move |stage| {
        if stage != Stage::TimeFiltered {
            return;
        }
        if let (Some(pipeline), Some(analyzer)) = (sub_pipeline.upgrade(), &sub_analyzer) {
            // Notifications may come from non-runtime threads.
            let _guard = runtime.enter();
            let handle = analyzer.spawn_recompute(pipeline.time_filtered());
            // Pairing usually outlasts the debounce window, so a freshly
            // published pair list schedules its own follow-up pass.
            let scheduler = sub_scheduler.clone();
            runtime.spawn(async move {
                if let Ok(true) = handle.await {
                    scheduler.trigger();
                }
            });
        }
        sub_scheduler.trigger();
    });

    Module {
        kind: config.kind,
        pipeline,
        analyzer,
        store,
        scheduler,
    }
}

fn point_quota(point: &ControlPoint, alarm_displacement_m: f64) -> f64 {
    if alarm_displacement_m <= 0.0 {
        return 0.0;
    }
    let Some(last) = point.observations.last() else {
        return 0.0;
    };
    last.displacement().length() / alarm_displacement_m
}
