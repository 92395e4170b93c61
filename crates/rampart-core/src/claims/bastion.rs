use super::blocking_bastions;
use crate::cascade::Cascade;
use crate::ids::NetworkId;
use crate::models::Bastion;
use crate::policy::{authorize, Action, Actor};
use crate::promise::{reject, Outcome, Rejection};
use crate::state::RampartState;
use rampart_geo::{BlockLocation, ChunkCoord};
use tracing::{error, info};

/// Bastion operations and queries.
#[derive(Clone)]
pub struct BastionService {
    state: RampartState,
    cascade: Cascade,
}

impl BastionService {
    pub fn new(state: RampartState, cascade: Cascade) -> Self {
        Self { state, cascade }
    }

    /// Place a bastion for `network` at `location`.
    pub fn place(
        &self,
        actor: &Actor,
        network: &str,
        location: BlockLocation,
    ) -> Outcome<Bastion> {
        let network = self.state.find_network(network)?;
        authorize(&network, actor, Action::PlaceBastion)?;

        if self.state.bastions.by_exact_block(&location).is_some() {
            return reject("This block is already a bastion");
        }

        let now = self.state.now();
        let bastion = Bastion::new(network.id, location, now, self.state.config.bastion_mature);
        if !self.state.bastions.add(bastion.clone()) {
            return Err(Rejection::unexpected());
        }
        self.state.bastion_store.save(bastion.clone());
        self.state.touch(&network.id, now);

        info!(
            bastion = %bastion.id,
            network = %network.id,
            at = %bastion.location,
            "Bastion placed"
        );
        Ok(bastion)
    }

    /// Remove the bastion at `location` on a member's request.
    pub fn remove(&self, actor: &Actor, location: &BlockLocation) -> Outcome<Bastion> {
        let bastion = self
            .state
            .bastions
            .by_exact_block(location)
            .ok_or_else(|| Rejection::new("This block is not a bastion"))?;

        match self.state.network(&bastion.owner) {
            Some(network) => {
                authorize(&network, actor, Action::RemoveBastion)?;
            }
            None => {
                error!(
                    bastion = %bastion.id,
                    owner = %bastion.owner,
                    "Bastion owner missing; removing orphan"
                );
            }
        }

        self.cascade.remove_bastion(&bastion);
        Ok(bastion)
    }

    /// The block at `location` left the world.
    pub fn delete_at(&self, location: &BlockLocation) -> Option<Bastion> {
        let bastion = self.state.bastions.by_exact_block(location)?;
        self.cascade.remove_bastion(&bastion).then_some(bastion)
    }

    /// Bastions owned by the named network.
    pub fn owned_by(&self, network: &str) -> Outcome<Vec<Bastion>> {
        let network = self.state.find_network(network)?;
        Ok(self.state.bastions.by_owner(&network.id))
    }

    /// Bastions within `radius` of `location`.
    pub fn in_range(&self, location: &BlockLocation, radius: f64) -> Vec<Bastion> {
        self.state.bastions.by_radius_3d(location, radius)
    }

    /// Bastions within `radius` of `location`, ignoring height.
    pub fn in_range_flat(&self, location: &BlockLocation, radius: f64) -> Vec<Bastion> {
        self.state.bastions.by_radius_flat(location, radius)
    }

    /// Immature rival bastions protecting `location` against `acting`.
    pub fn blocking(&self, location: &BlockLocation, acting: &NetworkId) -> Vec<Bastion> {
        blocking_bastions(&self.state, &self.cascade, location, acting, self.state.now())
    }

    /// True if the chunk holds a bastion and must stay loaded.
    pub fn vetoes_chunk_unload(&self, chunk: &ChunkCoord) -> bool {
        self.state.bastions.any_in_chunk(chunk)
    }

    /// True if a piston move touches a bastion.
    pub fn vetoes_piston(&self, blocks: &[BlockLocation]) -> bool {
        self.state.bastions.any_at(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RampartConfig;
    use crate::ids::PlayerId;
    use crate::models::Network;
    use crate::state::testing::Fixture;

    fn setup(fx: &Fixture) -> (BastionService, Actor, Network) {
        let alice = Actor::player(PlayerId::random(), "alice");
        let network = Network::new("Red", alice.id, fx.state.now());
        fx.state.networks.add(network.clone());
        let service = BastionService::new(fx.state.clone(), Cascade::new(fx.state.clone()));
        (service, alice, network)
    }

    #[tokio::test]
    async fn place_and_query() {
        let fx = Fixture::new(RampartConfig::default());
        let (service, alice, network) = setup(&fx);
        let at = BlockLocation::new("world", 0, 64, 0);

        let bastion = service.place(&alice, "Red", at.clone()).unwrap();
        assert_eq!(
            service.place(&alice, "Red", at.clone()).unwrap_err().reason(),
            "This block is already a bastion"
        );

        assert_eq!(service.owned_by("red").unwrap(), vec![bastion.clone()]);
        assert!(service.owned_by("Blue").is_err());

        let above = BlockLocation::new("world", 0, 100, 10);
        assert!(service.in_range(&above, 16.0).is_empty());
        assert_eq!(service.in_range_flat(&above, 10.0).len(), 1);

        let rival = NetworkId::random();
        assert_eq!(service.blocking(&at, &rival), vec![bastion.clone()]);
        assert!(service.blocking(&at, &network.id).is_empty());

        fx.clock.advance(RampartConfig::default().bastion_mature);
        assert!(service.blocking(&at, &rival).is_empty());
    }

    #[tokio::test]
    async fn removal_paths() {
        let fx = Fixture::new(RampartConfig::default());
        let (service, alice, _) = setup(&fx);
        let at = BlockLocation::new("world", -1, 64, -1);
        service.place(&alice, "Red", at.clone()).unwrap();

        assert!(service.vetoes_chunk_unload(&ChunkCoord::new("world", -1, -1)));
        assert!(service.vetoes_piston(&[at.clone()]));

        let bob = Actor::player(PlayerId::random(), "bob");
        assert_eq!(service.remove(&bob, &at).unwrap_err(), Rejection::not_member());
        service.remove(&alice, &at).unwrap();
        assert!(service.delete_at(&at).is_none());

        service.place(&alice, "Red", at.clone()).unwrap();
        assert!(service.delete_at(&at).is_some());
        assert!(fx.state.bastions.is_empty());
    }
}
