//! The assembled core.
//!
//! [`Rampart`] wires the repositories, services and persistence together.
//! It is meant to be driven from a single task; see
//! [`RampartNode`](crate::node::RampartNode).

use crate::broadcast::Broadcaster;
use crate::cascade::{Cascade, CascadeReport};
use crate::claims::{AcidService, BastionService};
use crate::clock::Clock;
use crate::config::RampartConfig;
use crate::error::Result;
use crate::networks::NetworkStore;
use crate::state::{RampartState, Stores};
use rampart_geo::{BlockLocation, ChunkCoord};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{error, info};

/// Counts from a blocking load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub networks: usize,
    pub bastions: usize,
    pub acid_blocks: usize,
    pub orphans: CascadeReport,
}

/// What one periodic sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_acid: usize,
    pub expired_networks: usize,
    pub cascaded: CascadeReport,
    pub cooldowns: usize,
    pub invites: usize,
}

impl SweepReport {
    /// True if the sweep changed nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The claim and grief protection core.
pub struct Rampart {
    state: RampartState,
    cascade: Cascade,
    pub networks: NetworkStore,
    pub acid: AcidService,
    pub bastions: BastionService,
}

impl Rampart {
    /// Build an empty core. Fails if the configuration is inconsistent.
    pub fn new(
        config: RampartConfig,
        stores: Stores,
        handle: Handle,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let state = RampartState::new(config, stores, handle, broadcaster, clock);
        let cascade = Cascade::new(state.clone());
        Ok(Self {
            networks: NetworkStore::new(state.clone(), cascade.clone()),
            acid: AcidService::new(state.clone(), cascade.clone()),
            bastions: BastionService::new(state.clone(), cascade.clone()),
            cascade,
            state,
        })
    }

    /// Shared handles.
    pub fn state(&self) -> &RampartState {
        &self.state
    }

    /// Load every entity kind on the calling thread, then drop claims whose
    /// network did not load.
    pub fn load_all_blocking(&self) -> Result<LoadReport> {
        let state = &self.state;
        let mut report = LoadReport {
            networks: state.network_store.load_all_blocking(&state.networks)?,
            bastions: state.bastion_store.load_all_blocking(&state.bastions)?,
            acid_blocks: state.acid_store.load_all_blocking(&state.acid)?,
            ..LoadReport::default()
        };

        let owners: HashSet<_> = state
            .bastions
            .all()
            .into_iter()
            .map(|b| b.owner)
            .chain(state.acid.all().into_iter().map(|a| a.owner))
            .collect();
        for owner in owners {
            if state.networks.contains(&owner) {
                continue;
            }
            let purged = self.cascade.purge_claims(&owner);
            error!(
                owner = %owner,
                bastions = purged.bastions,
                acid_blocks = purged.acid_blocks,
                "Claims reference a missing network; removed"
            );
            report.orphans.bastions += purged.bastions;
            report.orphans.acid_blocks += purged.acid_blocks;
        }
        Ok(report)
    }

    /// Save every entity kind on the calling thread.
    pub fn save_all_blocking(&self) -> Result<()> {
        let state = &self.state;
        state.network_store.save_all_blocking(&state.networks.all())?;
        state.bastion_store.save_all_blocking(&state.bastions.all())?;
        state.acid_store.save_all_blocking(&state.acid.all())?;
        Ok(())
    }

    /// Queue a save of every entity kind.
    pub fn save_all(&self) {
        let state = &self.state;
        state.network_store.save_all(state.networks.all());
        state.bastion_store.save_all(state.bastions.all());
        state.acid_store.save_all(state.acid.all());
    }

    /// Wait for queued storage writes.
    pub async fn flush(&self) {
        self.state.pool.flush().await;
    }

    /// Run one round of periodic maintenance.
    pub fn sweep(&self) -> SweepReport {
        let now = self.state.now();
        let mut report = SweepReport {
            expired_acid: self.acid.sweep_expired(now).len(),
            cooldowns: self.networks.purge_cooldowns(now),
            invites: self.networks.prune_invites(now),
            ..SweepReport::default()
        };

        for (_, cascaded) in self.networks.expire_inactive(now) {
            report.expired_networks += 1;
            report.cascaded.bastions += cascaded.bastions;
            report.cascaded.acid_blocks += cascaded.acid_blocks;
        }

        if !report.is_empty() {
            info!(?report, "Sweep complete");
        }
        report
    }

    /// The block at `location` left the world. Returns true if it was a
    /// claim.
    pub fn delete_at(&self, location: &BlockLocation) -> bool {
        let acid = self.acid.delete_at(location).is_some();
        let bastion = self.bastions.delete_at(location).is_some();
        acid || bastion
    }

    /// True if the chunk holds any claim and must stay loaded.
    pub fn vetoes_chunk_unload(&self, chunk: &ChunkCoord) -> bool {
        self.acid.vetoes_chunk_unload(chunk) || self.bastions.vetoes_chunk_unload(chunk)
    }

    /// True if moving these blocks would move a claim.
    pub fn vetoes_piston(&self, blocks: &[BlockLocation]) -> bool {
        self.acid.vetoes_piston(blocks) || self.bastions.vetoes_piston(blocks)
    }
}
