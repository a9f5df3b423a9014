// src/algo/grid.rs
use std::collections::hash_map::Entry;
use std::hash::Hash;
use std::sync::atomic::{AtomicU32, Ordering};
use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use log::{debug, trace, warn};

use crate::algo::Algorithm;
use crate::cluster::{Cluster, StaticCluster};
use crate::config::subsystems::AlgorithmConfig;
use crate::projection::{Projection, SphericalMercator};
use crate::types::{Bounds, ClusterItem};

pub const DEFAULT_GRID_SIZE: u32 = 100;

/// Size in pixels of one world tile at zoom 0.
const TILE_SIZE: f64 = 256.0;

/// Groups items into a square grid of `grid_size` pixel cells.
pub struct GridBasedAlgorithm<T> {
    grid_size: AtomicU32,
    min_zoom: Option<f64>,
    max_zoom: Option<f64>,
    projection: Box<dyn Projection>,
    items: Mutex<AHashSet<T>>,
}

impl<T> GridBasedAlgorithm<T>
where
    T: ClusterItem + Eq + Hash + Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::with_projection(Box::new(SphericalMercator))
    }

    pub fn with_projection(projection: Box<dyn Projection>) -> Self {
        Self {
            grid_size: AtomicU32::new(DEFAULT_GRID_SIZE),
            min_zoom: None,
            max_zoom: None,
            projection,
            items: Mutex::new(AHashSet::new()),
        }
    }

    pub fn from_config(config: &AlgorithmConfig) -> Self {
        let algo = Self::new().with_zoom_range(config.min_zoom, config.max_zoom);
        algo.set_grid_size(config.grid_size);
        algo
    }

    /// Restricts clustering to `[min_zoom, max_zoom]`; `None` leaves a side open.
    pub fn with_zoom_range(mut self, min_zoom: Option<f64>, max_zoom: Option<f64>) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn zoom_in_range(&self, zoom: f64) -> bool {
        let above_min = self.min_zoom.map_or(true, |min| zoom >= min);
        let below_max = self.max_zoom.map_or(true, |max| zoom <= max);
        above_min && below_max
    }
}

impl<T> Default for GridBasedAlgorithm<T>
where
    T: ClusterItem + Eq + Hash + Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Number of grid cells along one side of the world at `zoom`.
pub fn cell_count(zoom: f64, grid_size: u32) -> i64 {
    (TILE_SIZE * 2f64.powf(zoom) / grid_size as f64).ceil() as i64
}

/// Sparse key of the grid cell containing planar point `(x, y)`.
///
/// Assumes both coordinates lie in `[0, num_cells)`; outside that range keys
/// may collide and no wraparound is attempted.
pub fn bucket_coord(num_cells: i64, x: f64, y: f64) -> i64 {
    (num_cells as f64 * x.floor() + y.floor()) as i64
}

impl<T> Algorithm<T> for GridBasedAlgorithm<T>
where
    T: ClusterItem + Eq + Hash + Clone + Send + Sync,
{
    fn add_item(&self, item: T) {
        self.items.lock().insert(item);
    }

    fn add_items(&self, items: Vec<T>) {
        self.items.lock().extend(items);
    }

    fn remove_item(&self, item: &T) {
        self.items.lock().remove(item);
    }

    fn remove_items(&self, items: &[T]) {
        let mut registry = self.items.lock();
        for item in items {
            registry.remove(item);
        }
    }

    fn clear_items(&self) {
        self.items.lock().clear();
    }

    fn items(&self) -> Vec<T> {
        self.items.lock().iter().cloned().collect()
    }

    fn remove_items_not_in_rectangle(&self, bounds: &Bounds) {
        let mut registry = self.items.lock();
        let before = registry.len();
        registry.retain(|item| bounds.contains(&item.position()));
        debug!("Removed {} items outside {:?}, {} remain",
               before - registry.len(), bounds, registry.len());
    }

    // The visible bounds are not used to filter items: cells outside the
    // viewport still contribute to the clusters drawn at its edges.
    fn get_clusters(&self, zoom: f64, _visible_bounds: &Bounds) -> Option<Vec<Cluster<T>>> {
        let registry = self.items.lock();
        if registry.is_empty() {
            return None;
        }
        if !self.zoom_in_range(zoom) {
            trace!("Zoom {} outside [{:?}, {:?}], skipping", zoom, self.min_zoom, self.max_zoom);
            return None;
        }

        let num_cells = cell_count(zoom, self.grid_size());
        let world_width = num_cells as f64;

        let mut clusters = Vec::new();
        let mut buckets: AHashMap<i64, StaticCluster<T>> = AHashMap::new();

        for item in registry.iter() {
            if !item.is_visible() {
                continue;
            }
            if !item.can_be_clustered() {
                clusters.push(Cluster::Singleton(item.clone()));
                continue;
            }

            let point = self.projection.to_point(&item.position(), world_width);
            let coord = bucket_coord(num_cells, point.x, point.y);

            match buckets.entry(coord) {
                Entry::Occupied(entry) => entry.get().add(item.clone()),
                Entry::Vacant(entry) => {
                    entry.insert(StaticCluster::new(item.clone()));
                }
            }
        }
        let item_count = registry.len();
        drop(registry);

        let singletons = clusters.len();
        for (_, cluster) in buckets {
            cluster.update();
            clusters.push(Cluster::Aggregate(cluster));
        }

        trace!("Clustered {} items at zoom {} ({} cells): {} aggregates, {} singletons",
               item_count, zoom, num_cells, clusters.len() - singletons, singletons);
        Some(clusters)
    }

    fn set_grid_size(&self, pixels: u32) {
        if pixels == 0 {
            warn!("Ignoring grid size of 0 pixels");
            return;
        }
        self.grid_size.store(pixels, Ordering::Relaxed);
    }

    fn min_zoom(&self) -> Option<f64> {
        self.min_zoom
    }

    fn max_zoom(&self) -> Option<f64> {
        self.max_zoom
    }
}
