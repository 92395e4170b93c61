//! Cross-repository deletes.
//!
//! Removing a network removes every claim it owns. The owned claims are
//! snapshotted once, then each is pulled from its repository and queued for
//! durable deletion. Once [`Cascade::purge_network`] returns, no read path
//! can find the network or any of its claims; storage catches up later.

use crate::ids::NetworkId;
use crate::models::{AcidBlock, Bastion, Network};
use crate::state::RampartState;
use tracing::{debug, info};

/// What a cascade removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub bastions: usize,
    pub acid_blocks: usize,
}

/// Coordinates deletes that span repositories.
#[derive(Clone)]
pub struct Cascade {
    state: RampartState,
}

impl Cascade {
    pub fn new(state: RampartState) -> Self {
        Self { state }
    }

    /// Remove the network and everything it owns.
    ///
    /// Returns `None` if the network was already gone, so two racing
    /// cascades for one network cannot both run.
    pub fn purge_network(&self, id: &NetworkId) -> Option<(Network, CascadeReport)> {
        let network = self.state.networks.remove_id(id)?;
        self.state.network_store.delete(network.clone());

        let report = self.purge_claims(id);
        info!(
            network = %network.id,
            name = %network.name,
            bastions = report.bastions,
            acid_blocks = report.acid_blocks,
            "Network removed"
        );
        Some((network, report))
    }

    /// Remove every claim owned by `owner`, whether or not the network
    /// still exists.
    pub fn purge_claims(&self, owner: &NetworkId) -> CascadeReport {
        let bastions = self.state.bastions.drain_where(|b| b.owner == *owner);
        let acid = self.state.acid.drain_where(|a| a.owner == *owner);

        let report = CascadeReport {
            bastions: bastions.len(),
            acid_blocks: acid.len(),
        };
        for bastion in bastions {
            self.state.bastion_store.delete(bastion);
        }
        for block in acid {
            self.state.acid_store.delete(block);
        }
        report
    }

    /// Remove one bastion. Returns false if it was already gone.
    pub fn remove_bastion(&self, bastion: &Bastion) -> bool {
        match self.state.bastions.remove(bastion) {
            Some(removed) => {
                debug!(bastion = %removed.id, at = %removed.location, "Bastion removed");
                self.state.bastion_store.delete(removed);
                true
            }
            None => false,
        }
    }

    /// Remove one acid block. Returns false if it was already gone.
    pub fn remove_acid(&self, block: &AcidBlock) -> bool {
        match self.state.acid.remove(block) {
            Some(removed) => {
                debug!(acid = %removed.id, at = %removed.location, "Acid block removed");
                self.state.acid_store.delete(removed);
                true
            }
            None => false,
        }
    }
}
