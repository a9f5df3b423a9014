use serde::{Serialize, Deserialize};

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    /// Latitude is clamped to [-90, 90] and longitude wrapped into [-180, 180).
    pub fn new(lat: f64, lng: f64) -> Self {
        let lng = if (-180.0..180.0).contains(&lng) {
            lng
        } else {
            (lng - 180.0).rem_euclid(360.0) - 180.0
        };
        Self {
            lat: lat.clamp(-90.0, 90.0),
            lng,
        }
    }
}

/// A point on the projected plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned lat/lng rectangle. When `southwest.lng > northeast.lng`
/// the rectangle crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub southwest: Position,
    pub northeast: Position,
}

impl Bounds {
    pub fn new(southwest: Position, northeast: Position) -> Self {
        Self { southwest, northeast }
    }

    /// Degenerate bounds covering a single position.
    pub fn from_position(position: Position) -> Self {
        Self::new(position, position)
    }

    /// Smallest bounds covering every position, or `None` for an empty input.
    pub fn covering<'a, I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Position>,
    {
        positions.into_iter().fold(None, |acc: Option<Bounds>, pos| match acc {
            None => Some(Bounds::from_position(*pos)),
            Some(bounds) => Some(bounds.including(*pos)),
        })
    }

    /// Returns bounds extended to cover `position`. Longitude grows toward
    /// whichever side needs the smaller extension.
    pub fn including(&self, position: Position) -> Self {
        let south = self.southwest.lat.min(position.lat);
        let north = self.northeast.lat.max(position.lat);
        let mut west = self.southwest.lng;
        let mut east = self.northeast.lng;
        let lng = position.lng;

        if !self.contains_longitude(lng) {
            let west_distance = (west - lng).rem_euclid(360.0);
            let east_distance = (lng - east).rem_euclid(360.0);
            if west_distance < east_distance {
                west = lng;
            } else {
                east = lng;
            }
        }

        Self::new(Position::new(south, west), Position::new(north, east))
    }

    pub fn contains(&self, position: &Position) -> bool {
        self.southwest.lat <= position.lat
            && position.lat <= self.northeast.lat
            && self.contains_longitude(position.lng)
    }

    /// Geometric center of the rectangle, not the mean of the positions
    /// that produced it.
    pub fn center(&self) -> Position {
        let lat = (self.southwest.lat + self.northeast.lat) / 2.0;
        let west = self.southwest.lng;
        let east = self.northeast.lng;
        let lng = if west <= east {
            (east + west) / 2.0
        } else {
            (east + 360.0 + west) / 2.0
        };
        Position::new(lat, lng)
    }

    fn contains_longitude(&self, lng: f64) -> bool {
        let west = self.southwest.lng;
        let east = self.northeast.lng;
        if west <= east {
            west <= lng && lng <= east
        } else {
            west <= lng || lng <= east
        }
    }
}

/// Capability every clusterable value must expose. The payload itself is
/// never inspected; identity comes from the implementor's `Eq`/`Hash`.
pub trait ClusterItem {
    fn position(&self) -> Position;

    /// Invisible items are skipped by every clustering pass.
    fn is_visible(&self) -> bool {
        true
    }

    /// Items that cannot be clustered always come back as singletons.
    fn can_be_clustered(&self) -> bool {
        true
    }
}
