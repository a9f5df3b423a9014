// src/manager/camera.rs
use parking_lot::RwLock;

use crate::types::Bounds;

/// What the map currently shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPosition {
    pub zoom: f64,
    pub visible_bounds: Bounds,
}

/// Supplies the camera state at the moment a recompute is scheduled.
pub trait CameraSource: Send + Sync {
    /// `None` while no map is attached; recompute requests are then skipped.
    fn camera_position(&self) -> Option<CameraPosition>;
}

/// Camera state pushed in by the application.
#[derive(Debug, Default)]
pub struct SharedCamera {
    position: RwLock<Option<CameraPosition>>,
}

impl SharedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(position: CameraPosition) -> Self {
        Self {
            position: RwLock::new(Some(position)),
        }
    }

    pub fn set(&self, position: CameraPosition) {
        *self.position.write() = Some(position);
    }

    pub fn clear(&self) {
        *self.position.write() = None;
    }
}

impl CameraSource for SharedCamera {
    fn camera_position(&self) -> Option<CameraPosition> {
        *self.position.read()
    }
}
