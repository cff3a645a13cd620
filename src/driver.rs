//! Background clock for a shared [`ProjectRegistry`].
//!
//! The registry keeps its own timer queue and never sleeps. This task feeds
//! it wall-clock time on a fixed tick so debounced work (snapshot
//! materialization, structure updates, manifest re-reads) runs without
//! the embedder having to drive it.
//!
//! # Shutdown
//!
//! [`DriverHandle::shutdown`] sends a stop signal and waits for the loop to
//! exit. Dropping the handle without calling it aborts the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::registry::ProjectRegistry;

const LOG_TARGET: &str = "project_service::driver";

/// Tick used when none is given.
pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

pub type SharedRegistry = Arc<Mutex<ProjectRegistry>>;

pub struct RegistryDriver {
    registry: SharedRegistry,
    tick: Duration,
}

impl RegistryDriver {
    pub fn new(registry: ProjectRegistry) -> Self {
        Self::with_shared(Arc::new(Mutex::new(registry)))
    }

    pub fn with_shared(registry: SharedRegistry) -> Self {
        Self {
            registry,
            tick: DEFAULT_TICK,
        }
    }

    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// Start advancing the registry clock. Must be called inside a tokio
    /// runtime.
    pub fn spawn(self) -> DriverHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let registry = Arc::clone(&self.registry);
        let task = tokio::spawn(drive(registry, self.tick, stop_rx));
        log::debug!(target: LOG_TARGET, "Driver started with {:?} tick", self.tick);
        DriverHandle {
            registry: self.registry,
            task: Some(task),
            stop_tx: Some(stop_tx),
        }
    }
}

async fn drive(registry: SharedRegistry, tick: Duration, mut stop_rx: oneshot::Receiver<()>) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            now = interval.tick() => {
                let elapsed = now.saturating_duration_since(last);
                last = now;
                if elapsed.is_zero() {
                    continue;
                }
                registry.lock().await.advance_time(elapsed);
            }
        }
    }
    log::debug!(target: LOG_TARGET, "Driver stopped");
}

/// Handle to a running driver task.
pub struct DriverHandle {
    registry: SharedRegistry,
    task: Option<JoinHandle<()>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl DriverHandle {
    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// Stop the loop and wait for it to finish. Timers that have not come
    /// due stay queued in the registry.
    pub async fn shutdown(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                log::warn!(target: LOG_TARGET, "Driver task ended abnormally: {}", err);
            }
        }
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
