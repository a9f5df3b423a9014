// src/cluster/aggregate.rs
use std::fmt;
use parking_lot::Mutex;
use log::trace;

use crate::types::{Bounds, ClusterItem, Position};

struct AggregateState<T> {
    items: Vec<T>,
    center: Position,
    bounds: Option<Bounds>,
}

/// A cluster whose center is fixed by the last call to [`StaticCluster::update`].
///
/// Membership and the derived fields share one mutex, so `add`, `remove` and
/// `update` may race freely. Derived fields are not kept in sync with
/// membership; call `update` after mutating.
pub struct StaticCluster<T> {
    state: Mutex<AggregateState<T>>,
}

impl<T: ClusterItem + PartialEq + Clone> StaticCluster<T> {
    /// Creates a cluster holding `first`, already positioned on it.
    pub fn new(first: T) -> Self {
        let center = first.position();
        Self {
            state: Mutex::new(AggregateState {
                items: vec![first],
                center,
                bounds: None,
            }),
        }
    }

    pub fn add(&self, item: T) {
        self.state.lock().items.push(item);
    }

    /// Removes the first member equal to `item`. Returns whether one was found.
    pub fn remove(&self, item: &T) -> bool {
        let mut state = self.state.lock();
        match state.items.iter().position(|member| member == item) {
            Some(index) => {
                state.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Recomputes the position and bounds from the current members.
    pub fn update(&self) {
        let mut state = self.state.lock();
        match state.items.len() {
            0 => {
                state.bounds = None;
            }
            1 => {
                state.center = state.items[0].position();
                state.bounds = None;
            }
            _ => {
                let positions: Vec<Position> = state.items.iter().map(|i| i.position()).collect();
                let bounds = Bounds::covering(positions.iter());
                if let Some(bounds) = bounds {
                    state.center = bounds.center();
                }
                state.bounds = bounds;
            }
        }
        trace!("Updated aggregate: {} members, center {:?}", state.items.len(), state.center);
    }

    pub fn position(&self) -> Position {
        self.state.lock().center
    }

    /// Absent while the cluster has fewer than two members.
    pub fn bounds(&self) -> Option<Bounds> {
        self.state.lock().bounds
    }

    pub fn size(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Snapshot of the current members.
    pub fn items(&self) -> Vec<T> {
        self.state.lock().items.clone()
    }

    /// Borrowing access to the members without cloning them.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.state.lock().items)
    }
}

impl<T> fmt::Debug for StaticCluster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StaticCluster")
            .field("center", &state.center)
            .field("size", &state.items.len())
            .finish()
    }
}
