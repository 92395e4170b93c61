//! Spatial queries over claim repositories.
//!
//! Claims are expected in the thousands, so every query is a linear scan of
//! the repository under its read lock. Radius checks are inclusive at the
//! boundary and never match across worlds.

use crate::ids::{ClaimId, NetworkId};
use crate::repository::{Entity, Repository};
use rampart_geo::{BlockLocation, ChunkCoord};

/// An entity that occupies a block and belongs to a network.
pub trait Claim: Entity<Id = ClaimId> {
    /// Owning network.
    fn owner(&self) -> NetworkId;

    /// Occupied block.
    fn location(&self) -> &BlockLocation;

    /// Chunk containing the block.
    fn chunk(&self) -> ChunkCoord {
        self.location().chunk()
    }
}

impl<T: Claim> Repository<T> {
    /// The claim occupying exactly this block, if any.
    pub fn by_exact_block(&self, location: &BlockLocation) -> Option<T> {
        self.find_one(|c| c.location() == location)
    }

    /// Claims within `radius` blocks (3D).
    pub fn by_radius_3d(&self, location: &BlockLocation, radius: f64) -> Vec<T> {
        self.find_all(|c| c.location().within(location, radius))
    }

    /// Claims within `radius` blocks on the x/z plane.
    pub fn by_radius_flat(&self, location: &BlockLocation, radius: f64) -> Vec<T> {
        self.find_all(|c| c.location().within_flat(location, radius))
    }

    /// Claims owned by the network.
    pub fn by_owner(&self, owner: &NetworkId) -> Vec<T> {
        self.find_all(|c| c.owner() == *owner)
    }

    /// Claims inside the chunk column.
    pub fn by_chunk(&self, chunk: &ChunkCoord) -> Vec<T> {
        self.find_all(|c| c.chunk() == *chunk)
    }

    /// True if the chunk holds at least one claim; such a chunk must not be
    /// unloaded.
    pub fn any_in_chunk(&self, chunk: &ChunkCoord) -> bool {
        self.any(|c| c.chunk() == *chunk)
    }

    /// True if any of the blocks is claimed.
    pub fn any_at(&self, locations: &[BlockLocation]) -> bool {
        self.any(|c| locations.contains(c.location()))
    }
}
