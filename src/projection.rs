//! Mapping from geographic positions onto the clustering plane.
//!
//! The grid algorithm only needs `to_point`; the plane is square with side
//! `world_width`, which the algorithm sets to the number of grid cells at the
//! current zoom.

use std::f64::consts::PI;
use crate::types::{Point, Position};

/// Pure, stateless projection onto a square plane of side `world_width`.
pub trait Projection: Send + Sync {
    fn to_point(&self, position: &Position, world_width: f64) -> Point;
}

/// Web mercator projection as used by slippy-map tiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalMercator;

impl SphericalMercator {
    /// Inverse of [`Projection::to_point`].
    pub fn to_position(&self, point: &Point, world_width: f64) -> Position {
        let x = point.x / world_width - 0.5;
        let lng = x * 360.0;

        let y = 0.5 - point.y / world_width;
        let lat = 90.0 - (2.0 * (-y * 2.0 * PI).exp().atan()).to_degrees();

        Position::new(lat, lng)
    }
}

impl Projection for SphericalMercator {
    fn to_point(&self, position: &Position, world_width: f64) -> Point {
        let x = position.lng / 360.0 + 0.5;
        let siny = position.lat.to_radians().sin();
        let y = 0.5 * ((1.0 + siny) / (1.0 - siny)).ln() / -(2.0 * PI) + 0.5;

        Point::new(x * world_width, y * world_width)
    }
}
