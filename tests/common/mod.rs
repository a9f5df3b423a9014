#![allow(dead_code)]

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use crossbeam_channel::{unbounded, Receiver, Sender};

use gridcluster::config::subsystems::ManagerConfig;
use gridcluster::{
    Algorithm, AlgorithmId, Bounds, CameraPosition, Cluster, ClusterItem, ClusterRenderer,
    ClusterResults, GridBasedAlgorithm, Position,
};

pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Marker {
    pub id: u32,
    pub position: Position,
}

impl Marker {
    pub fn new(id: u32, lat: f64, lng: f64) -> Self {
        Self { id, position: Position::new(lat, lng) }
    }
}

impl PartialEq for Marker {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Marker {}

impl Hash for Marker {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl ClusterItem for Marker {
    fn position(&self) -> Position {
        self.position
    }
}

pub fn world() -> Bounds {
    Bounds::new(Position::new(-85.0, -180.0), Position::new(85.0, 179.9))
}

pub fn camera_at(zoom: f64) -> CameraPosition {
    CameraPosition { zoom, visible_bounds: world() }
}

pub fn manager_config(debounce_ms: u64) -> ManagerConfig {
    ManagerConfig {
        debounce_ms,
        worker_threads: 4,
        log_level: "debug".to_string(),
    }
}

/// Member ids per algorithm, `None` where the algorithm had no result.
pub type Snapshot = Vec<(AlgorithmId, Option<Vec<u32>>)>;

#[derive(Debug)]
pub enum RenderEvent {
    Added,
    Removed,
    ClearedCache,
    Changed(Snapshot),
}

/// Forwards everything it is asked to draw into a channel.
pub struct ChannelRenderer {
    events: Sender<RenderEvent>,
}

impl ChannelRenderer {
    pub fn new() -> (Self, Receiver<RenderEvent>) {
        let (events, receiver) = unbounded();
        (Self { events }, receiver)
    }
}

fn member_ids(clusters: &[Cluster<Marker>]) -> Vec<u32> {
    let mut ids: Vec<u32> = clusters.iter().flat_map(|c| c.items()).map(|m| m.id).collect();
    ids.sort();
    ids
}

impl ClusterRenderer<Marker> for ChannelRenderer {
    fn on_clusters_changed(&mut self, results: ClusterResults<Marker>) {
        let mut snapshot: Snapshot = results
            .iter()
            .map(|(id, clusters)| (*id, clusters.as_deref().map(member_ids)))
            .collect();
        snapshot.sort_by_key(|(id, _)| *id);
        let _ = self.events.send(RenderEvent::Changed(snapshot));
    }

    fn on_add(&mut self) {
        let _ = self.events.send(RenderEvent::Added);
    }

    fn on_remove(&mut self) {
        let _ = self.events.send(RenderEvent::Removed);
    }

    fn clear_cache(&mut self) {
        let _ = self.events.send(RenderEvent::ClearedCache);
    }
}

/// Next `Changed` event, skipping lifecycle events.
pub fn next_change(events: &Receiver<RenderEvent>, timeout: Duration) -> Option<Snapshot> {
    let deadline = Instant::now() + timeout;
    loop {
        match events.recv_deadline(deadline) {
            Ok(RenderEvent::Changed(snapshot)) => return Some(snapshot),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}

/// Passes a [`GatedAlgorithm`] can hold apart before they share a lane.
const LANES: usize = 16;

/// Grid algorithm that parks every finished pass until its lane is opened.
/// Pass `n` (counting from 0) reports `n` on `entered` once its result is
/// computed, then waits on lane `n % LANES`.
pub struct GatedAlgorithm {
    inner: GridBasedAlgorithm<Marker>,
    passes: AtomicUsize,
    lanes: Vec<Receiver<()>>,
    entered: Sender<usize>,
}

pub struct Gate {
    lanes: Vec<Sender<()>>,
    entered: Receiver<usize>,
}

impl Gate {
    /// Index of the next pass that reached the gate.
    pub fn wait_entered(&self) -> usize {
        self.entered.recv_timeout(WAIT).expect("pass never started")
    }

    pub fn release_pass(&self, pass: usize) {
        self.lanes[pass % LANES].send(()).unwrap();
    }

    /// Opens every lane once.
    pub fn release_all(&self) {
        for lane in &self.lanes {
            lane.send(()).unwrap();
        }
    }
}

impl GatedAlgorithm {
    pub fn new() -> (Arc<Self>, Gate) {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..LANES).map(|_| unbounded::<()>()).unzip();
        let (entered_tx, entered_rx) = unbounded();
        let algo = Arc::new(Self {
            inner: GridBasedAlgorithm::new(),
            passes: AtomicUsize::new(0),
            lanes: receivers,
            entered: entered_tx,
        });
        (algo, Gate { lanes: senders, entered: entered_rx })
    }
}

impl Algorithm<Marker> for GatedAlgorithm {
    fn add_item(&self, item: Marker) {
        self.inner.add_item(item)
    }

    fn add_items(&self, items: Vec<Marker>) {
        self.inner.add_items(items)
    }

    fn remove_item(&self, item: &Marker) {
        self.inner.remove_item(item)
    }

    fn remove_items(&self, items: &[Marker]) {
        self.inner.remove_items(items)
    }

    fn clear_items(&self) {
        self.inner.clear_items()
    }

    fn items(&self) -> Vec<Marker> {
        self.inner.items()
    }

    fn remove_items_not_in_rectangle(&self, bounds: &Bounds) {
        self.inner.remove_items_not_in_rectangle(bounds)
    }

    fn get_clusters(&self, zoom: f64, visible_bounds: &Bounds) -> Option<Vec<Cluster<Marker>>> {
        let result = self.inner.get_clusters(zoom, visible_bounds);
        let pass = self.passes.fetch_add(1, Ordering::SeqCst);
        let _ = self.entered.send(pass);
        let _ = self.lanes[pass % LANES].recv_timeout(WAIT);
        result
    }

    fn set_grid_size(&self, pixels: u32) {
        self.inner.set_grid_size(pixels)
    }

    fn min_zoom(&self) -> Option<f64> {
        self.inner.min_zoom()
    }

    fn max_zoom(&self) -> Option<f64> {
        self.inner.max_zoom()
    }
}

/// Grid algorithm whose `add_item` parks inside the call until released,
/// so a test can act while a mutation is half done. `seed` inserts
/// without parking.
pub struct ParkedInsert {
    inner: GridBasedAlgorithm<Marker>,
    release: Receiver<()>,
    entered: Sender<()>,
}

pub struct InsertLatch {
    pub release: Sender<()>,
    pub entered: Receiver<()>,
}

impl ParkedInsert {
    pub fn new() -> (Arc<Self>, InsertLatch) {
        let (release_tx, release_rx) = unbounded();
        let (entered_tx, entered_rx) = unbounded();
        let algo = Arc::new(Self {
            inner: GridBasedAlgorithm::new(),
            release: release_rx,
            entered: entered_tx,
        });
        (algo, InsertLatch { release: release_tx, entered: entered_rx })
    }

    pub fn seed(&self, item: Marker) {
        self.inner.add_item(item);
    }
}

impl Algorithm<Marker> for ParkedInsert {
    fn add_item(&self, item: Marker) {
        let _ = self.entered.send(());
        let _ = self.release.recv_timeout(WAIT);
        self.inner.add_item(item)
    }

    fn add_items(&self, items: Vec<Marker>) {
        self.inner.add_items(items)
    }

    fn remove_item(&self, item: &Marker) {
        self.inner.remove_item(item)
    }

    fn remove_items(&self, items: &[Marker]) {
        self.inner.remove_items(items)
    }

    fn clear_items(&self) {
        self.inner.clear_items()
    }

    fn items(&self) -> Vec<Marker> {
        self.inner.items()
    }

    fn remove_items_not_in_rectangle(&self, bounds: &Bounds) {
        self.inner.remove_items_not_in_rectangle(bounds)
    }

    fn get_clusters(&self, zoom: f64, visible_bounds: &Bounds) -> Option<Vec<Cluster<Marker>>> {
        self.inner.get_clusters(zoom, visible_bounds)
    }

    fn set_grid_size(&self, pixels: u32) {
        self.inner.set_grid_size(pixels)
    }

    fn min_zoom(&self) -> Option<f64> {
        self.inner.min_zoom()
    }

    fn max_zoom(&self) -> Option<f64> {
        self.inner.max_zoom()
    }
}
