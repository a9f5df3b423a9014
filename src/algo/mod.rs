// algo/mod.rs
pub mod grid;

use crate::cluster::Cluster;
use crate::types::Bounds;

pub use self::grid::GridBasedAlgorithm;

/// A clustering strategy that owns its own item registry.
///
/// Every method takes `&self`; implementations guard their state internally
/// so that one instance can be shared between the orchestrator, its workers
/// and the application.
pub trait Algorithm<T>: Send + Sync {
    /// Idempotent per item.
    fn add_item(&self, item: T);
    fn add_items(&self, items: Vec<T>);
    /// No-op when the item is absent.
    fn remove_item(&self, item: &T);
    fn remove_items(&self, items: &[T]);
    fn clear_items(&self);

    /// Snapshot of the registry.
    fn items(&self) -> Vec<T>;

    /// Drops every item whose position lies outside `bounds`.
    fn remove_items_not_in_rectangle(&self, bounds: &Bounds);

    /// Clusters the registry for `zoom`. `None` means there is nothing to
    /// show at all (empty registry or zoom out of range), which is different
    /// from `Some` of an empty list.
    fn get_clusters(&self, zoom: f64, visible_bounds: &Bounds) -> Option<Vec<Cluster<T>>>;

    fn set_grid_size(&self, pixels: u32);

    /// `None` leaves that side of the zoom range unbounded.
    fn min_zoom(&self) -> Option<f64>;
    fn max_zoom(&self) -> Option<f64>;
}
