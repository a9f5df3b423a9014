// src/manager/renderer.rs
use std::sync::Arc;
use std::thread;
use ahash::AHashMap;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};

use crate::cluster::Cluster;
use crate::error::Result;
use super::task::TaskHandle;
use super::{AlgorithmId, Shared};

/// Per-algorithm outcome of a recompute. `None` tells the renderer to clear
/// whatever it drew for that algorithm.
pub type ClusterResults<T> = AHashMap<AlgorithmId, Option<Vec<Cluster<T>>>>;

/// Sink for clustering results.
///
/// All calls happen on one dedicated delivery thread, never concurrently and
/// never while the manager holds a lock.
pub trait ClusterRenderer<T>: Send {
    fn on_clusters_changed(&mut self, results: ClusterResults<T>);

    /// Called once when the renderer is attached to a manager.
    fn on_add(&mut self) {}

    /// Called once when the renderer is replaced.
    fn on_remove(&mut self) {}

    /// Drop any cached drawing state, e.g. after every item was removed.
    fn clear_cache(&mut self) {}
}

pub(crate) enum Delivery<T> {
    /// Output of a recompute task; delivered only if the task is still current.
    Results { task: TaskHandle, results: ClusterResults<T> },
    /// A recompute task panicked; retire it without rendering.
    Failed { task: TaskHandle },
    /// Unconditional notification, e.g. an algorithm was unregistered.
    Notify(ClusterResults<T>),
    ClearCache,
    Replace(Box<dyn ClusterRenderer<T>>),
}

/// Starts the delivery thread. It owns the renderer and exits once every
/// sender has been dropped.
pub(crate) fn spawn_delivery<T>(
    renderer: Box<dyn ClusterRenderer<T>>,
    shared: Arc<Shared<T>>,
) -> Result<Sender<Delivery<T>>>
where
    T: Send + Sync + 'static,
{
    let (sender, receiver) = unbounded();
    thread::Builder::new()
        .name("cluster-delivery".to_string())
        .spawn(move || run_delivery(renderer, shared, receiver))?;
    Ok(sender)
}

fn run_delivery<T>(
    mut renderer: Box<dyn ClusterRenderer<T>>,
    shared: Arc<Shared<T>>,
    receiver: Receiver<Delivery<T>>,
) {
    renderer.on_add();

    for message in receiver {
        match message {
            Delivery::Results { task, mut results } => {
                let current = shared.tasks.write().finish(&task);
                if !current {
                    debug!("Dropping result of superseded task {}", task.id());
                    continue;
                }

                // A global pass may have snapshotted an algorithm that has
                // since been unregistered and cleared.
                {
                    let algorithms = shared.algorithms.read();
                    results.retain(|id, _| algorithms.iter().any(|r| r.id == *id));
                }
                if results.is_empty() {
                    debug!("Task {} only covered unregistered algorithms", task.id());
                    continue;
                }
                debug!("Delivering task {} ({:?}) for {} algorithms",
                       task.id(), task.scope(), results.len());
                renderer.on_clusters_changed(results);
            }
            Delivery::Failed { task } => {
                shared.tasks.write().finish(&task);
                warn!("Recompute task {} ({:?}) failed, nothing delivered", task.id(), task.scope());
            }
            Delivery::Notify(results) => renderer.on_clusters_changed(results),
            Delivery::ClearCache => renderer.clear_cache(),
            Delivery::Replace(next) => {
                renderer.on_remove();
                renderer = next;
                renderer.on_add();
                info!("Cluster renderer replaced");
            }
        }
    }

    renderer.on_remove();
    debug!("Delivery thread stopped");
}
