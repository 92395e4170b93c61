//! Claim lifecycle - bastions and acid blocks.
//!
//! Both claim kinds are placed on behalf of a network, mature after a fixed
//! window and can be queried spatially. Acid blocks additionally expire and
//! accumulate damage. World events reach the core as plain calls:
//! [`AcidService::delete_at`] / [`BastionService::delete_at`] when a block is
//! removed, and the `vetoes_*` queries before a chunk unloads or a piston
//! moves blocks.

mod acid;
mod bastion;

pub use acid::{AcidPlacement, AcidReport, AcidService};
pub use bastion::BastionService;

use crate::cascade::Cascade;
use crate::ids::NetworkId;
use crate::models::Bastion;
use crate::state::RampartState;
use rampart_geo::BlockLocation;
use tracing::error;

/// Immature bastions of other networks within the protection radius of
/// `location`. They do not prevent a claim; callers report them.
///
/// Bastions whose network no longer exists are removed on sight.
pub(crate) fn blocking_bastions(
    state: &RampartState,
    cascade: &Cascade,
    location: &BlockLocation,
    acting: &NetworkId,
    now: u64,
) -> Vec<Bastion> {
    let mut blocking: Vec<Bastion> = state
        .bastions
        .by_radius_3d(location, state.config.bastion_radius)
        .into_iter()
        .filter(|b| {
            if state.networks.contains(&b.owner) {
                return true;
            }
            error!(
                bastion = %b.id,
                owner = %b.owner,
                at = %b.location,
                "Bastion owner missing; removing orphan"
            );
            cascade.remove_bastion(b);
            false
        })
        .filter(|b| b.blocks(acting, now))
        .collect();
    blocking.sort_by_key(|b| b.mature_at);
    blocking
}
