use super::NetworkStore;
use crate::ids::{NetworkId, PlayerId};
use crate::models::{Network, PermissionSet};
use crate::policy::Actor;
use crate::promise::{Outcome, Rejection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only view of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub id: NetworkId,
    pub name: String,
    pub creator: PlayerId,
    pub members: BTreeMap<PlayerId, PermissionSet>,
    pub pending: usize,
    pub password_enabled: bool,
    pub bastions: usize,
    pub acid_blocks: usize,
    pub created_at: u64,
    pub last_active: u64,
}

impl NetworkStore {
    fn summarize(&self, network: Network) -> NetworkSummary {
        NetworkSummary {
            bastions: self.state.bastions.count(|b| b.owner == network.id),
            acid_blocks: self.state.acid.count(|a| a.owner == network.id),
            members: network
                .members
                .values()
                .map(|m| (m.player, m.permissions))
                .collect(),
            pending: network.pending.len(),
            password_enabled: network.settings.password_enabled,
            id: network.id,
            name: network.name,
            creator: network.creator,
            created_at: network.created_at,
            last_active: network.last_active,
        }
    }

    /// Networks `player` belongs to (the actor by default), sorted by name.
    /// Listing someone else's networks is reserved for operators.
    pub fn list(&self, actor: &Actor, player: Option<PlayerId>) -> Outcome<Vec<NetworkSummary>> {
        let player = player.unwrap_or(actor.id);
        if player != actor.id && !actor.operator {
            return Err(Rejection::no_permission());
        }

        let mut summaries: Vec<NetworkSummary> = self
            .state
            .networks
            .find_all(|n| n.is_member(&player))
            .into_iter()
            .map(|n| self.summarize(n))
            .collect();
        summaries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(summaries)
    }

    /// Summary of one network.
    pub fn show(&self, name: &str) -> Outcome<NetworkSummary> {
        let network = self.state.find_network(name)?;
        Ok(self.summarize(network))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RampartConfig;
    use crate::networks::tests::{actor, store};
    use crate::state::testing::Fixture;
    use std::time::Duration;

    #[tokio::test]
    async fn list_own_and_others() {
        let fx = Fixture::new(RampartConfig::default());
        let store = store(&fx);
        let alice = actor("alice");
        store.create(&alice, "zeta").unwrap();
        fx.clock.advance(Duration::from_secs(120));
        store.create(&alice, "Alpha").unwrap();

        let names: Vec<String> = store
            .list(&alice, None)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "zeta"]);

        let bob = actor("bob");
        assert!(store.list(&bob, None).unwrap().is_empty());
        assert!(store.list(&bob, Some(alice.id)).is_err());

        let staff = Actor::operator(PlayerId::random(), "staff");
        assert_eq!(store.list(&staff, Some(alice.id)).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn show_counts_claims() {
        let fx = Fixture::new(RampartConfig::default());
        let store = store(&fx);
        let red = store.create(&actor("alice"), "Red").unwrap();
        fx.state.bastions.add(crate::models::Bastion::new(
            red.id,
            rampart_geo::BlockLocation::new("world", 0, 0, 0),
            0,
            Duration::ZERO,
        ));

        let summary = store.show("RED").unwrap();
        assert_eq!(summary.members.len(), 1);
        assert_eq!(summary.bastions, 1);
        assert_eq!(summary.acid_blocks, 0);
        assert_eq!(store.show("Blue").unwrap_err(), Rejection::network_not_found());
    }
}
