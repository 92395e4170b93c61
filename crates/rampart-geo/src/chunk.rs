//! Chunk columns.

use crate::{BlockLocation, CHUNK_SHIFT};

/// A 16x16 column of blocks, identified by world and chunk x/z.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkCoord {
    /// World (dimension) name
    pub world: String,
    /// Chunk x (block x >> 4)
    pub x: i32,
    /// Chunk z (block z >> 4)
    pub z: i32,
}

impl ChunkCoord {
    /// Create a new chunk coordinate.
    pub fn new(world: impl Into<String>, x: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            z,
        }
    }

    /// True if the block lies in this chunk column.
    pub fn contains(&self, location: &BlockLocation) -> bool {
        self.world == location.world
            && location.x >> CHUNK_SHIFT == self.x
            && location.z >> CHUNK_SHIFT == self.z
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}, {}]", self.world, self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_checks_world() {
        let chunk = ChunkCoord::new("world", 0, 0);
        assert!(chunk.contains(&BlockLocation::new("world", 15, 70, 0)));
        assert!(!chunk.contains(&BlockLocation::new("world", 16, 70, 0)));
        assert!(!chunk.contains(&BlockLocation::new("world_the_end", 1, 70, 1)));
    }
}
