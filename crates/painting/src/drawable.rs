use std::sync::Arc;

use foundation::math::GeoPosition;
use monitoring::AlarmBand;
use parking_lot::RwLock;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// Visual style for one marker.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MarkerStyle {
    /// Stable token the renderer maps to its own symbology.
    pub token: &'static str,
    pub color: [f32; 4],
    pub size: f32,
}

impl MarkerStyle {
    pub fn from_band(band: AlarmBand) -> Self {
        Self {
            token: band.token(),
            color: band.color(),
            size: 1.0,
        }
    }
}

/// Routing target for click/hover interactions, resolved by the host
/// application; the core never holds widget callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickTarget {
    Point { name: String },
    Pair { a: String, b: String },
}

/// One drawable-primitive descriptor emitted by a paint pass. The renderer
/// decides how it is actually displayed; the core never touches pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub position: GeoPosition,
    pub style: MarkerStyle,
    pub label: Option<String>,
    pub pick: Option<PickTarget>,
}

/// Per-layer drawable collection.
///
/// Ownership contract: only the layer's running paint pass writes; everyone
/// else reads published snapshots. Publication is a wholesale `Arc` swap, so
/// a reader holding an old snapshot never observes a half-built pass.
#[derive(Default)]
pub struct LayerStore {
    published: RwLock<Arc<Vec<Drawable>>>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, drawables: Vec<Drawable>) {
        *self.published.write() = Arc::new(drawables);
    }

    pub fn snapshot(&self) -> Arc<Vec<Drawable>> {
        self.published.read().clone()
    }
}
