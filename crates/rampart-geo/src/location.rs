//! Block positions inside a named world.

use crate::{ChunkCoord, CHUNK_SHIFT};
use std::str::FromStr;
use thiserror::Error;

/// The position of a single block.
///
/// Two locations are only comparable when they share a world; every distance
/// helper returns "not near" for locations in different worlds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockLocation {
    /// World (dimension) name
    pub world: String,
    /// East/west axis
    pub x: i32,
    /// Height
    pub y: i32,
    /// North/south axis
    pub z: i32,
}

impl BlockLocation {
    /// Create a new location.
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// True if both locations are in the same world.
    pub fn same_world(&self, other: &Self) -> bool {
        self.world == other.world
    }

    /// The chunk column containing this block.
    pub fn chunk(&self) -> ChunkCoord {
        ChunkCoord::new(
            self.world.clone(),
            self.x >> CHUNK_SHIFT,
            self.z >> CHUNK_SHIFT,
        )
    }

    /// Squared Euclidean distance, or `None` across worlds.
    pub fn distance_squared(&self, other: &Self) -> Option<f64> {
        if !self.same_world(other) {
            return None;
        }
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        let dz = f64::from(self.z) - f64::from(other.z);
        Some(dx * dx + dy * dy + dz * dz)
    }

    /// Squared distance on the x/z plane, or `None` across worlds.
    pub fn flat_distance_squared(&self, other: &Self) -> Option<f64> {
        if !self.same_world(other) {
            return None;
        }
        let dx = f64::from(self.x) - f64::from(other.x);
        let dz = f64::from(self.z) - f64::from(other.z);
        Some(dx * dx + dz * dz)
    }

    /// Euclidean distance, or `None` across worlds.
    pub fn distance(&self, other: &Self) -> Option<f64> {
        self.distance_squared(other).map(f64::sqrt)
    }

    /// True if `other` lies within `radius` blocks (boundary inclusive).
    ///
    /// Compared on squared distances so integer offsets sitting exactly on
    /// the boundary are never lost to rounding.
    pub fn within(&self, other: &Self, radius: f64) -> bool {
        radius >= 0.0
            && self
                .distance_squared(other)
                .is_some_and(|d| d <= radius * radius)
    }

    /// Like [`within`](Self::within) but ignoring height.
    pub fn within_flat(&self, other: &Self, radius: f64) -> bool {
        radius >= 0.0
            && self
                .flat_distance_squared(other)
                .is_some_and(|d| d <= radius * radius)
    }

    /// Offset by the given deltas, staying in the same world.
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.world.clone(), self.x + dx, self.y + dy, self.z + dz)
    }
}

impl std::fmt::Display for BlockLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {}, {})", self.world, self.x, self.y, self.z)
    }
}

/// Error parsing a `world,x,y,z` location string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseLocationError {
    /// Wrong number of comma separated parts
    #[error("expected world,x,y,z but found {0} parts")]
    Arity(usize),

    /// World name was blank
    #[error("world name is empty")]
    EmptyWorld,

    /// A coordinate was not an integer
    #[error("invalid coordinate {0:?}")]
    Coordinate(String),
}

impl FromStr for BlockLocation {
    type Err = ParseLocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [world, x, y, z] = parts.as_slice() else {
            return Err(ParseLocationError::Arity(parts.len()));
        };
        if world.is_empty() {
            return Err(ParseLocationError::EmptyWorld);
        }
        let coord = |v: &str| {
            v.parse::<i32>()
                .map_err(|_| ParseLocationError::Coordinate(v.to_string()))
        };
        Ok(Self::new(*world, coord(x)?, coord(y)?, coord(z)?))
    }
}
