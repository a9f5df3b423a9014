// cluster/mod.rs
pub mod aggregate;

use std::fmt;

use crate::types::{Bounds, ClusterItem, Position};

pub use self::aggregate::StaticCluster;

/// One entry of a clustering pass result.
///
/// Clusters are built fresh on every pass and are read-only once handed out.
pub enum Cluster<T> {
    /// A non-clusterable item, emitted on its own.
    Singleton(T),
    /// Clusterable items that fell into the same grid cell.
    Aggregate(StaticCluster<T>),
}

impl<T: ClusterItem + PartialEq + Clone> Cluster<T> {
    pub fn position(&self) -> Position {
        match self {
            Cluster::Singleton(item) => item.position(),
            Cluster::Aggregate(cluster) => cluster.position(),
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            Cluster::Singleton(_) => None,
            Cluster::Aggregate(cluster) => cluster.bounds(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Cluster::Singleton(_) => 1,
            Cluster::Aggregate(cluster) => cluster.size(),
        }
    }

    pub fn items(&self) -> Vec<T> {
        match self {
            Cluster::Singleton(item) => vec![item.clone()],
            Cluster::Aggregate(cluster) => cluster.items(),
        }
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, Cluster::Singleton(_))
    }
}

impl<T: fmt::Debug> fmt::Debug for Cluster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cluster::Singleton(item) => f.debug_tuple("Singleton").field(item).finish(),
            Cluster::Aggregate(cluster) => f.debug_tuple("Aggregate").field(cluster).finish(),
        }
    }
}
