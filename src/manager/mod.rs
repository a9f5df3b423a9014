//! Orchestration of clustering passes across several algorithms.
//!
//! [`ClusterManager`] runs passes on a worker pool, cancels work that a newer
//! request supersedes, debounces zoom changes and hands results to a
//! [`ClusterRenderer`] on a single delivery thread.
//!
//! Lock domains:
//! - the registered algorithm list (`RwLock`), read for dispatch and bulk
//!   item removal, written when algorithms are added or removed;
//! - the task table (`RwLock`), written whenever tasks are scheduled,
//!   cancelled or retired.
//!
//! The two are never held at the same time, and neither is held while the
//! renderer runs.

pub mod camera;
pub mod debounce;
pub mod renderer;
pub mod task;

use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};
use log::{debug, info, trace, warn};

use crate::algo::Algorithm;
use crate::config::subsystems::ManagerConfig;
use crate::error::{Error, Result};
use crate::types::{Bounds, ClusterItem};

pub use self::camera::{CameraPosition, CameraSource, SharedCamera};
pub use self::debounce::Debouncer;
pub use self::renderer::{ClusterRenderer, ClusterResults};
pub use self::task::{TaskHandle, TaskScope, TaskTable};

use self::renderer::{spawn_delivery, Delivery};

/// Identifies an algorithm registered with a [`ClusterManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlgorithmId(u64);

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "algo#{}", self.0)
    }
}

struct Registered<T> {
    id: AlgorithmId,
    algorithm: Arc<dyn Algorithm<T>>,
}

impl<T> Clone for Registered<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            algorithm: Arc::clone(&self.algorithm),
        }
    }
}

/// State shared with the workers and the delivery thread.
pub(crate) struct Shared<T> {
    algorithms: RwLock<Vec<Registered<T>>>,
    tasks: RwLock<TaskTable>,
}

struct ManagerInner<T> {
    shared: Arc<Shared<T>>,
    camera: Arc<dyn CameraSource>,
    pool: rayon::ThreadPool,
    delivery: Sender<Delivery<T>>,
}

impl<T> ManagerInner<T>
where
    T: ClusterItem + Eq + Hash + Clone + Send + Sync + 'static,
{
    fn cluster_all(&self) {
        let Some(camera) = self.camera.camera_position() else {
            debug!("No camera position yet, skipping global recompute");
            return;
        };

        let task = self.shared.tasks.write().begin_global();
        debug!("Scheduling global recompute task {} at zoom {}", task.id(), camera.zoom);

        let shared = Arc::clone(&self.shared);
        let delivery = self.delivery.clone();
        self.pool.spawn(move || {
            if task.is_cancelled() {
                return;
            }
            let algorithms: Vec<Registered<T>> = shared.algorithms.read().clone();

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut results = ClusterResults::default();
                for registered in &algorithms {
                    if task.is_cancelled() {
                        return None;
                    }
                    let clusters = registered.algorithm.get_clusters(camera.zoom, &camera.visible_bounds);
                    results.insert(registered.id, clusters);
                }
                Some(results)
            }));
            deliver(&delivery, task, outcome);
        });
    }

    fn cluster_algorithm(&self, registered: Registered<T>) {
        let Some(camera) = self.camera.camera_position() else {
            debug!("No camera position yet, skipping recompute of {}", registered.id);
            return;
        };

        let Some(task) = self.shared.tasks.write().begin_algorithm(registered.id) else {
            trace!("Global recompute in flight, skipping {}", registered.id);
            return;
        };
        debug!("Scheduling task {} for {} at zoom {}", task.id(), registered.id, camera.zoom);

        let delivery = self.delivery.clone();
        self.pool.spawn(move || {
            if task.is_cancelled() {
                return;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let clusters = registered.algorithm.get_clusters(camera.zoom, &camera.visible_bounds);
                let mut results = ClusterResults::default();
                results.insert(registered.id, clusters);
                Some(results)
            }));
            deliver(&delivery, task, outcome);
        });
    }

    fn send(&self, message: Delivery<T>) -> Result<()> {
        self.delivery
            .send(message)
            .map_err(|_| Error::async_err("Delivery thread has stopped"))
    }
}

fn deliver<T>(
    delivery: &Sender<Delivery<T>>,
    task: TaskHandle,
    outcome: std::thread::Result<Option<ClusterResults<T>>>,
) {
    let message = match outcome {
        Ok(Some(results)) => {
            if task.is_cancelled() {
                trace!("Task {} cancelled before delivery", task.id());
                return;
            }
            Delivery::Results { task, results }
        }
        Ok(None) => return,
        Err(_) => Delivery::Failed { task },
    };
    if delivery.send(message).is_err() {
        debug!("Delivery thread has stopped, dropping result");
    }
}

/// Schedules clustering passes for a set of independently configured
/// algorithms and delivers the most recently requested results.
pub struct ClusterManager<T> {
    inner: Arc<ManagerInner<T>>,
    debouncer: Debouncer,
    next_id: AtomicU64,
    previous_zoom: Mutex<Option<f64>>,
}

impl<T> ClusterManager<T>
where
    T: ClusterItem + Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new(
        config: &ManagerConfig,
        camera: Arc<dyn CameraSource>,
        renderer: Box<dyn ClusterRenderer<T>>,
    ) -> Result<Self> {
        config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("cluster-worker-{}", i))
            .build()?;

        let shared = Arc::new(Shared {
            algorithms: RwLock::new(Vec::new()),
            tasks: RwLock::new(TaskTable::new()),
        });
        let delivery = spawn_delivery(renderer, Arc::clone(&shared))?;

        let inner = Arc::new(ManagerInner {
            shared,
            camera,
            pool,
            delivery,
        });

        let weak = Arc::downgrade(&inner);
        let debouncer = Debouncer::new(Duration::from_millis(config.debounce_ms), move || {
            if let Some(inner) = weak.upgrade() {
                inner.cluster_all();
            }
        })?;

        info!("Cluster manager started with {} workers, {}ms debounce",
              config.worker_threads, config.debounce_ms);

        Ok(Self {
            inner,
            debouncer,
            next_id: AtomicU64::new(0),
            previous_zoom: Mutex::new(None),
        })
    }

    /// Registers `algorithm` and schedules its first pass. Registering the
    /// same `Arc` twice returns the existing id.
    pub fn add_algorithm(&self, algorithm: Arc<dyn Algorithm<T>>) -> AlgorithmId {
        let registered = {
            let mut algorithms = self.inner.shared.algorithms.write();
            let existing = algorithms
                .iter()
                .find(|r| same_algorithm(&r.algorithm, &algorithm))
                .cloned();
            match existing {
                Some(existing) => {
                    debug!("Algorithm already registered as {}", existing.id);
                    existing
                }
                None => {
                    let id = AlgorithmId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
                    let registered = Registered { id, algorithm };
                    algorithms.push(registered.clone());
                    info!("Registered algorithm {}", id);
                    registered
                }
            }
        };

        let id = registered.id;
        self.inner.cluster_algorithm(registered);
        id
    }

    /// Unregisters the algorithm and tells the renderer to clear its
    /// clusters. Any in-flight pass for it is cancelled.
    pub fn remove_algorithm(&self, id: AlgorithmId) -> Option<Arc<dyn Algorithm<T>>> {
        let removed = {
            let mut algorithms = self.inner.shared.algorithms.write();
            let index = algorithms.iter().position(|r| r.id == id)?;
            algorithms.remove(index)
        };
        self.inner.shared.tasks.write().cancel_algorithm(id);
        info!("Unregistered algorithm {}", id);

        let mut results = ClusterResults::default();
        results.insert(id, None);
        if let Err(e) = self.inner.send(Delivery::Notify(results)) {
            warn!("Could not notify renderer about removal of {}: {}", id, e);
        }
        Some(removed.algorithm)
    }

    pub fn algorithm(&self, id: AlgorithmId) -> Option<Arc<dyn Algorithm<T>>> {
        self.lookup(id).map(|r| r.algorithm)
    }

    pub fn algorithm_ids(&self) -> Vec<AlgorithmId> {
        self.inner.shared.algorithms.read().iter().map(|r| r.id).collect()
    }

    fn lookup(&self, id: AlgorithmId) -> Option<Registered<T>> {
        self.inner.shared.algorithms.read().iter().find(|r| r.id == id).cloned()
    }

    /// Applies `operation` to the algorithm's registry and schedules a pass
    /// for it. Returns `false`, doing nothing, if `id` is not registered.
    ///
    /// The list lock is held until `operation` returns, so the algorithm
    /// cannot be unregistered halfway through a mutation.
    pub fn mutate<F>(&self, id: AlgorithmId, operation: F) -> bool
    where
        F: FnOnce(&dyn Algorithm<T>),
    {
        let registered = {
            let algorithms = self.inner.shared.algorithms.read();
            let Some(registered) = algorithms.iter().find(|r| r.id == id) else {
                debug!("Ignoring mutation of unregistered algorithm {}", id);
                return false;
            };
            operation(registered.algorithm.as_ref());
            registered.clone()
        };
        self.inner.cluster_algorithm(registered);
        true
    }

    pub fn add_item(&self, id: AlgorithmId, item: T) -> bool {
        self.mutate(id, |algo| algo.add_item(item))
    }

    pub fn add_items(&self, id: AlgorithmId, items: Vec<T>) -> bool {
        self.mutate(id, |algo| algo.add_items(items))
    }

    pub fn remove_item(&self, id: AlgorithmId, item: &T) -> bool {
        self.mutate(id, |algo| algo.remove_item(item))
    }

    pub fn remove_items(&self, id: AlgorithmId, items: &[T]) -> bool {
        self.mutate(id, |algo| algo.remove_items(items))
    }

    pub fn clear_items(&self, id: AlgorithmId) -> bool {
        self.mutate(id, |algo| algo.clear_items())
    }

    /// Recomputes every registered algorithm, cancelling all in-flight work.
    pub fn cluster_all(&self) {
        self.inner.cluster_all();
    }

    /// Recomputes a single algorithm. Skipped while a global pass is in
    /// flight; fails if `id` was never registered or has been removed.
    pub fn cluster_algo(&self, id: AlgorithmId) -> Result<()> {
        let registered = self.lookup(id).ok_or_else(|| {
            Error::invalid_argument(format!("Algorithm {} is not registered", id))
        })?;
        self.inner.cluster_algorithm(registered);
        Ok(())
    }

    /// Viewport trigger, called after the camera source has moved. Only zoom
    /// changes restart the debounce timer; pans, tilts and rotations are
    /// ignored.
    pub fn on_camera_change(&self) {
        let Some(position) = self.inner.camera.camera_position() else {
            trace!("Camera change without a camera position, ignoring");
            return;
        };
        let mut previous = self.previous_zoom.lock();
        if previous.map_or(true, |zoom| zoom != position.zoom) {
            trace!("Zoom changed to {}, restarting debounce", position.zoom);
            self.debouncer.trigger();
        }
        *previous = Some(position.zoom);
    }

    /// Empties every registered algorithm and clears the renderer's cache.
    pub fn remove_all_items(&self) {
        {
            let algorithms = self.inner.shared.algorithms.read();
            for registered in algorithms.iter() {
                registered.algorithm.clear_items();
            }
        }
        if let Err(e) = self.inner.send(Delivery::ClearCache) {
            warn!("Could not clear renderer cache: {}", e);
        }
    }

    pub fn remove_items_not_in_rectangle(&self, bounds: &Bounds) {
        let algorithms = self.inner.shared.algorithms.read();
        for registered in algorithms.iter() {
            registered.algorithm.remove_items_not_in_rectangle(bounds);
        }
    }

    /// Swaps the renderer and reclusters everything for it.
    pub fn set_renderer(&self, renderer: Box<dyn ClusterRenderer<T>>) -> Result<()> {
        self.inner.shared.tasks.write().cancel_all();
        self.inner.send(Delivery::Replace(renderer))?;
        self.inner.cluster_all();
        Ok(())
    }

    /// Number of recompute tasks whose results are still awaited.
    pub fn in_flight_tasks(&self) -> usize {
        self.inner.shared.tasks.read().in_flight()
    }

    /// Cancels the debounce timer and every in-flight task.
    pub fn shutdown(&self) {
        self.debouncer.cancel();
        self.inner.shared.tasks.write().cancel_all();
    }
}

impl<T> Drop for ClusterManager<T> {
    fn drop(&mut self) {
        self.debouncer.cancel();
        self.inner.shared.tasks.write().cancel_all();
    }
}

fn same_algorithm<T>(a: &Arc<dyn Algorithm<T>>, b: &Arc<dyn Algorithm<T>>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}
