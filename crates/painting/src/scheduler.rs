use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::warn;

use crate::drawable::LayerId;

/// Recoverable failure inside a paint callback. Logged and treated as pass
/// completion; the layer stays usable on the next trigger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaintError {
    #[error("paint pass failed: {0}")]
    Failed(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum PassState {
    Idle,
    /// A trigger arrived; waiting out the coalescing delay.
    Pending,
    /// The paint callback is executing.
    Running,
    /// A trigger arrived while running; one more pass is owed.
    RunningDirty,
}

type PaintFn = dyn Fn() -> Result<(), PaintError> + Send + Sync;

/// Per-layer repaint scheduling: coalesces bursts of change notifications
/// into one delayed pass, and guarantees at most one running paint callback
/// per layer at any instant. Different layers paint independently.
///
/// State machine: `Idle --trigger--> Pending --delay--> Running --> Idle`,
/// with `Running --trigger--> RunningDirty --completion--> Pending` (the
/// debounce re-arms rather than running back-to-back passes). A trigger while
/// `Pending` restarts the delay.
///
/// Must be constructed inside a tokio runtime; the debounce timer and paint
/// passes run on it.
pub struct RepaintScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    layer: LayerId,
    delay: Duration,
    runtime: Handle,
    state: Mutex<PassState>,
    /// Bumped on every (re)arm; a woken debounce task whose epoch is stale
    /// lost a restart race and must do nothing.
    epoch: AtomicU64,
    enabled: AtomicBool,
    paint: Box<PaintFn>,
    redraw_tx: mpsc::UnboundedSender<LayerId>,
}

impl RepaintScheduler {
    pub fn new(
        layer: LayerId,
        delay: Duration,
        paint: impl Fn() -> Result<(), PaintError> + Send + Sync + 'static,
        redraw_tx: mpsc::UnboundedSender<LayerId>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                layer,
                delay,
                runtime: Handle::current(),
                state: Mutex::new(PassState::Idle),
                epoch: AtomicU64::new(0),
                enabled: AtomicBool::new(true),
                paint: Box::new(paint),
                redraw_tx,
            }),
        }
    }

    pub fn layer(&self) -> LayerId {
        self.inner.layer
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Requests a repaint. Bursts within the debounce window collapse into
    /// one pass; a trigger during a running pass owes exactly one more.
    pub fn trigger(&self) {
        if !self.inner.enabled.load(Ordering::SeqCst) {
            return;
        }
        let mut state = self.inner.state.lock();
        match *state {
            PassState::Idle | PassState::Pending => {
                *state = PassState::Pending;
                let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
                Inner::arm(self.inner.clone(), epoch);
            }
            PassState::Running => *state = PassState::RunningDirty,
            PassState::RunningDirty => {}
        }
    }

    /// Stops scheduling. A pending pass is dropped; a running callback is
    /// allowed to finish, after which the layer settles in `Idle`.
    pub fn disable(&self) {
        self.inner.enabled.store(false, Ordering::SeqCst);
        // Invalidate any armed debounce.
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        let mut state = self.inner.state.lock();
        match *state {
            PassState::Pending => *state = PassState::Idle,
            PassState::RunningDirty => *state = PassState::Running,
            PassState::Idle | PassState::Running => {}
        }
    }

    /// Re-enables the layer and immediately arms a fresh pass (full debounce
    /// window, no stale delay carried over).
    pub fn enable(&self) {
        if !self.inner.enabled.swap(true, Ordering::SeqCst) {
            self.trigger();
        }
    }
}

impl Inner {
    fn arm(inner: Arc<Inner>, epoch: u64) {
        let runtime = inner.runtime.clone();
        runtime.spawn(async move {
            tokio::time::sleep(inner.delay).await;
            Inner::fire(inner, epoch);
        });
    }

    fn fire(inner: Arc<Inner>, epoch: u64) {
        {
            let mut state = inner.state.lock();
            if inner.epoch.load(Ordering::SeqCst) != epoch
                || *state != PassState::Pending
                || !inner.enabled.load(Ordering::SeqCst)
            {
                return;
            }
            // Single-flight: exactly one task wins this transition per layer.
            *state = PassState::Running;
        }

        match catch_unwind(AssertUnwindSafe(|| (inner.paint)())) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(layer = ?inner.layer, error = %err, "paint pass failed");
            }
            Err(_) => {
                warn!(layer = ?inner.layer, "paint pass panicked");
            }
        }

        let rearm_epoch = {
            let mut state = inner.state.lock();
            if *state == PassState::RunningDirty && inner.enabled.load(Ordering::SeqCst) {
                *state = PassState::Pending;
                Some(inner.epoch.fetch_add(1, Ordering::SeqCst) + 1)
            } else {
                *state = PassState::Idle;
                None
            }
        };

        match rearm_epoch {
            Some(epoch) => Inner::arm(inner, epoch),
            None => {
                // Downstream redraw request; the receiver may be gone during
                // shutdown.
                let _ = inner.redraw_tx.send(inner.layer);
            }
        }
    }
}
