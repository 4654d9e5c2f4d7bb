use std::sync::Arc;

use app::{MonitoringKind, Workspace, WorkspaceConfig};
use chrono::{TimeZone, Utc};
use foundation::math::Vec3;
use monitoring::{ControlPoint, Dimension, GeoPositionSer, Observation};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn demo_points() -> Vec<Arc<ControlPoint>> {
    let day = |d: u32| {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0)
            .single()
            .expect("valid demo date")
    };
    let mk = |name: &str, zero: Vec3, lat: f64, lon: f64, drift: Vec3| {
        Arc::new(ControlPoint {
            name: name.into(),
            group: "demo-dam".into(),
            category: "crest".into(),
            status: "active".into(),
            dimension: Dimension::ThreeD,
            zero: Some(zero.into()),
            position: Some(GeoPositionSer {
                lat_deg: lat,
                lon_deg: lon,
            }),
            observations: vec![
                Observation::new(day(1), Vec3::zero()),
                Observation::new(day(11), drift),
            ],
        })
    };
    vec![
        mk("KP-01", Vec3::zero(), 46.500, 8.100, Vec3::zero()),
        mk(
            "KP-02",
            Vec3::new(4.0, 0.0, 0.0),
            46.501,
            8.101,
            Vec3::new(0.06, 0.0, -0.01),
        ),
        mk(
            "KP-03",
            Vec3::new(0.0, 6.0, 0.0),
            46.502,
            8.100,
            Vec3::new(0.0, 0.02, 0.0),
        ),
    ]
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (workspace, mut redraw_rx) = Workspace::new(WorkspaceConfig::standard());
    let module = workspace
        .module(MonitoringKind::ControlPoints)
        .expect("control points module is registered");

    module.pipeline().set_all(demo_points());

    let layer = redraw_rx.recv().await.expect("first paint pass");
    info!(
        ?layer,
        drawables = module.store().snapshot().len(),
        "first paint pass published"
    );

    let analyzer = module.analyzer().expect("pairing enabled");
    for pair in analyzer.latest().iter() {
        info!(
            a = %pair.a.name,
            b = %pair.b.name,
            distance_m = pair.planar_distance_m,
            quota = pair.planar_quota,
            "pair"
        );
    }
}
