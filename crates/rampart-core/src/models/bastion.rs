//! Bastion model - a protective claim that matures over time.

use crate::clock::deadline;
use crate::ids::{ClaimId, NetworkId};
use crate::repository::Entity;
use crate::spatial::Claim;
use rampart_geo::BlockLocation;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A bastion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bastion {
    /// Unique identifier
    pub id: ClaimId,

    /// Owning network
    pub owner: NetworkId,

    /// Block the bastion occupies
    pub location: BlockLocation,

    /// Unix millis of placement
    pub created_at: u64,

    /// Unix millis at which the bastion becomes mature
    pub mature_at: u64,
}

impl Bastion {
    /// Create a bastion placed at `now` that matures after `maturation`.
    pub fn new(owner: NetworkId, location: BlockLocation, now: u64, maturation: Duration) -> Self {
        Self {
            id: ClaimId::random(),
            owner,
            location,
            created_at: now,
            mature_at: deadline(now, maturation),
        }
    }

    /// Mature once `now` reaches the maturation time; never reverts.
    pub fn is_mature(&self, now: u64) -> bool {
        now >= self.mature_at
    }

    /// True if this bastion stands in the way of `acting`'s claims: it is
    /// still immature and belongs to someone else.
    pub fn blocks(&self, acting: &NetworkId, now: u64) -> bool {
        !self.is_mature(now) && self.owner != *acting
    }
}

impl Entity for Bastion {
    type Id = ClaimId;
    const KIND: &'static str = "bastion";

    fn id(&self) -> ClaimId {
        self.id
    }
}

impl Claim for Bastion {
    fn owner(&self) -> NetworkId {
        self.owner
    }

    fn location(&self) -> &BlockLocation {
        &self.location
    }
}

impl std::fmt::Display for Bastion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bastion at {}", self.location)
    }
}
