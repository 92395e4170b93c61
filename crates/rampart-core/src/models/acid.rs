//! Acid block model - a timed, deliberately weak claim.

use crate::clock::deadline;
use crate::ids::{ClaimId, NetworkId};
use crate::repository::Entity;
use crate::spatial::Claim;
use rampart_geo::{BlockLocation, ChunkCoord};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An acid block.
///
/// `mature_at` and `expire_at` are fixed when the block is created; only the
/// damage counter changes afterwards, and it only goes up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcidBlock {
    /// Unique identifier
    pub id: ClaimId,

    /// Owning network
    pub owner: NetworkId,

    /// Chunk containing `location`, cached at creation
    pub chunk: ChunkCoord,

    /// Block the acid occupies
    pub location: BlockLocation,

    /// Unix millis at which the block matures
    pub mature_at: u64,

    /// Unix millis at which the block expires
    pub expire_at: u64,

    /// Damage dealt so far
    #[serde(default)]
    pub damage: u32,
}

impl AcidBlock {
    /// Create an acid block at `now` with the given windows.
    ///
    /// Callers guarantee `expiration > maturation`; the configuration is
    /// validated for this at startup.
    pub fn new(
        owner: NetworkId,
        location: BlockLocation,
        now: u64,
        maturation: Duration,
        expiration: Duration,
    ) -> Self {
        debug_assert!(expiration > maturation);
        Self {
            id: ClaimId::random(),
            owner,
            chunk: location.chunk(),
            location,
            mature_at: deadline(now, maturation),
            expire_at: deadline(now, expiration),
            damage: 0,
        }
    }

    /// True once the maturation time is reached.
    pub fn is_mature(&self, now: u64) -> bool {
        now >= self.mature_at
    }

    /// True once the expiration time is reached.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expire_at
    }

    /// Record more damage. Saturates rather than wrapping.
    pub fn add_damage(&mut self, amount: u32) -> u32 {
        self.damage = self.damage.saturating_add(amount);
        self.damage
    }
}

impl Entity for AcidBlock {
    type Id = ClaimId;
    const KIND: &'static str = "acid";

    fn id(&self) -> ClaimId {
        self.id
    }
}

impl Claim for AcidBlock {
    fn owner(&self) -> NetworkId {
        self.owner
    }

    fn location(&self) -> &BlockLocation {
        &self.location
    }

    fn chunk(&self) -> ChunkCoord {
        self.chunk.clone()
    }
}

impl std::fmt::Display for AcidBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Acid Block at {}", self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acid(now: u64) -> AcidBlock {
        AcidBlock::new(
            NetworkId::random(),
            BlockLocation::new("world", 10, 64, 10),
            now,
            Duration::from_secs(5),
            Duration::from_secs(10),
        )
    }

    #[test]
    fn lifecycle_predicates() {
        let block = acid(0);
        assert!(!block.is_mature(0));
        assert!(!block.is_expired(0));
        assert!(block.is_mature(6_000));
        assert!(!block.is_expired(6_000));
        assert!(block.is_expired(10_000));
    }

    #[test]
    fn chunk_is_cached_from_location() {
        let block = acid(0);
        assert_eq!(block.chunk, ChunkCoord::new("world", 0, 0));
        assert_eq!(Claim::chunk(&block), block.location.chunk());
    }

    #[test]
    fn damage_accumulates() {
        let mut block = acid(0);
        assert_eq!(block.add_damage(3), 3);
        assert_eq!(block.add_damage(4), 7);
        block.damage = u32::MAX - 1;
        assert_eq!(block.add_damage(10), u32::MAX);
    }

    #[test]
    fn serialize_deserialize() {
        let block = acid(42);
        let json = serde_json::to_string(&block).unwrap();
        let parsed: AcidBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(block, parsed);
    }
}
