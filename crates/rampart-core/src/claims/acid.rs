use super::blocking_bastions;
use crate::broadcast::Notice;
use crate::cascade::Cascade;
use crate::clock::until;
use crate::models::{AcidBlock, Bastion};
use crate::policy::{authorize, Action, Actor};
use crate::promise::{reject, Outcome, Rejection};
use crate::state::RampartState;
use rampart_geo::{BlockLocation, ChunkCoord};
use std::time::Duration;
use tracing::{error, info};

const NOT_ACID: &str = "This block is not an acid block";

/// A freshly placed acid block and the rival bastions that stand in its way.
#[derive(Debug, Clone, PartialEq)]
pub struct AcidPlacement {
    pub acid: AcidBlock,
    pub hazards: Vec<Bastion>,
}

/// What a player learns by inspecting an acid block.
#[derive(Debug, Clone, PartialEq)]
pub struct AcidReport {
    pub acid: AcidBlock,
    pub network: String,
    pub mature: bool,
    pub matures_in: Duration,
    pub expires_in: Duration,
    pub hazards: Vec<Bastion>,
}

/// Acid block operations.
#[derive(Clone)]
pub struct AcidService {
    state: RampartState,
    cascade: Cascade,
}

impl AcidService {
    pub fn new(state: RampartState, cascade: Cascade) -> Self {
        Self { state, cascade }
    }

    /// Turn the block at `location` into an acid block for `network`.
    pub fn create(
        &self,
        actor: &Actor,
        network: &str,
        location: BlockLocation,
    ) -> Outcome<AcidPlacement> {
        let network = self.state.find_network(network)?;
        authorize(&network, actor, Action::CreateAcid)?;

        if self.state.acid.by_exact_block(&location).is_some() {
            return reject("This block is already an acid block");
        }

        let now = self.state.now();
        let config = &self.state.config;
        let hazards = blocking_bastions(&self.state, &self.cascade, &location, &network.id, now);
        let acid = AcidBlock::new(
            network.id,
            location,
            now,
            config.acid_mature,
            config.acid_expire,
        );

        if !self.state.acid.add(acid.clone()) {
            return Err(Rejection::unexpected());
        }
        self.state.acid_store.save(acid.clone());
        self.state.touch(&network.id, now);

        self.state.notify(
            &network,
            Notice::AcidCreated {
                network: network.name.clone(),
                by: actor.name.clone(),
                at: acid.location.to_string(),
            },
        );
        info!(
            acid = %acid.id,
            network = %network.id,
            at = %acid.location,
            hazards = hazards.len(),
            "Acid block created"
        );
        Ok(AcidPlacement { acid, hazards })
    }

    /// Inspect the acid block at `location`.
    ///
    /// An acid block whose network no longer exists is removed on sight.
    pub fn lookup(&self, location: &BlockLocation) -> Outcome<AcidReport> {
        let acid = self
            .state
            .acid
            .by_exact_block(location)
            .ok_or_else(|| Rejection::new(NOT_ACID))?;

        let Some(network) = self.state.network(&acid.owner) else {
            self.remove_orphan(&acid);
            return Err(Rejection::unexpected());
        };

        let now = self.state.now();
        Ok(AcidReport {
            network: network.name,
            mature: acid.is_mature(now),
            matures_in: until(now, acid.mature_at),
            expires_in: until(now, acid.expire_at),
            hazards: blocking_bastions(&self.state, &self.cascade, location, &acid.owner, now),
            acid,
        })
    }

    /// Every acid block of a network. Needs ADMIN or VIEW_SNITCHES.
    pub fn list_by_network(&self, actor: &Actor, network: &str) -> Outcome<Vec<AcidBlock>> {
        let network = self.state.find_network(network)?;
        authorize(&network, actor, Action::ListAcid)?;

        let mut blocks = self.state.acid.by_owner(&network.id);
        if blocks.is_empty() {
            return reject("This network does not have any active acid blocks");
        }
        blocks.sort_by_key(|a| a.expire_at);
        Ok(blocks)
    }

    /// Acid blocks near `location` owned by networks the actor belongs to.
    pub fn list_nearby(&self, actor: &Actor, location: &BlockLocation) -> Outcome<Vec<AcidBlock>> {
        let mut friendly: Vec<AcidBlock> = self
            .state
            .acid
            .by_radius_3d(location, self.state.config.nearby_radius)
            .into_iter()
            .filter(|a| match self.state.network(&a.owner) {
                Some(network) => network.is_member(&actor.id),
                None => {
                    self.remove_orphan(a);
                    false
                }
            })
            .collect();

        if friendly.is_empty() {
            return reject("There are no acid blocks nearby");
        }
        friendly.sort_by(|a, b| {
            let da = a.location.distance_squared(location).unwrap_or(f64::MAX);
            let db = b.location.distance_squared(location).unwrap_or(f64::MAX);
            da.total_cmp(&db)
        });
        Ok(friendly)
    }

    /// Remove the acid block at `location` on a member's request.
    pub fn remove(&self, actor: &Actor, location: &BlockLocation) -> Outcome<AcidBlock> {
        let acid = self
            .state
            .acid
            .by_exact_block(location)
            .ok_or_else(|| Rejection::new(NOT_ACID))?;

        match self.state.network(&acid.owner) {
            Some(network) => {
                authorize(&network, actor, Action::RemoveAcid)?;
            }
            None => {
                self.remove_orphan(&acid);
                return Ok(acid);
            }
        }

        self.cascade.remove_acid(&acid);
        Ok(acid)
    }

    fn remove_orphan(&self, acid: &AcidBlock) {
        error!(
            acid = %acid.id,
            owner = %acid.owner,
            at = %acid.location,
            "Acid block owner missing; removing orphan"
        );
        self.cascade.remove_acid(acid);
    }

    /// The block at `location` left the world.
    pub fn delete_at(&self, location: &BlockLocation) -> Option<AcidBlock> {
        let acid = self.state.acid.by_exact_block(location)?;
        self.cascade.remove_acid(&acid).then_some(acid)
    }

    /// Record damage against the acid block at `location`. Returns the new
    /// total.
    pub fn add_damage(&self, location: &BlockLocation, amount: u32) -> Outcome<u32> {
        let acid = self
            .state
            .acid
            .by_exact_block(location)
            .ok_or_else(|| Rejection::new(NOT_ACID))?;

        let updated = self
            .state
            .acid
            .update(&acid.id, |a| {
                a.add_damage(amount);
                a.clone()
            })
            .ok_or_else(|| Rejection::new(NOT_ACID))?;

        let total = updated.damage;
        self.state.acid_store.save(updated);
        Ok(total)
    }

    /// Remove every expired acid block.
    pub fn sweep_expired(&self, now: u64) -> Vec<AcidBlock> {
        let expired = self.state.acid.drain_where(|a| a.is_expired(now));
        for acid in &expired {
            self.state.acid_store.delete(acid.clone());
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Expired acid blocks removed");
        }
        expired
    }

    /// True if the chunk holds an acid block and must stay loaded.
    pub fn vetoes_chunk_unload(&self, chunk: &ChunkCoord) -> bool {
        self.state.acid.any_in_chunk(chunk)
    }

    /// True if a piston move touches an acid block.
    pub fn vetoes_piston(&self, blocks: &[BlockLocation]) -> bool {
        self.state.acid.any_at(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RampartConfig;
    use crate::ids::{NetworkId, PlayerId};
    use crate::models::{Network, Permission};
    use crate::state::testing::Fixture;
    use crate::storage::EntityStore;

    fn windows() -> RampartConfig {
        RampartConfig {
            acid_mature: Duration::from_secs(5),
            acid_expire: Duration::from_secs(10),
            ..RampartConfig::default()
        }
    }

    fn setup(fx: &Fixture) -> (AcidService, Actor, Network) {
        let alice = Actor::player(PlayerId::random(), "alice");
        let network = Network::new("Red", alice.id, fx.state.now());
        fx.state.networks.add(network.clone());
        let service = AcidService::new(fx.state.clone(), Cascade::new(fx.state.clone()));
        (service, alice, network)
    }

    fn spot() -> BlockLocation {
        BlockLocation::new("world", 10, 64, 10)
    }

    #[tokio::test]
    async fn lifecycle_through_sweep() {
        let fx = Fixture::new(windows());
        let (service, alice, _) = setup(&fx);

        let placed = service.create(&alice, "Red", spot()).unwrap();
        assert!(placed.hazards.is_empty());
        let acid = placed.acid;
        assert!(!acid.is_mature(fx.state.now()));
        assert!(!acid.is_expired(fx.state.now()));

        fx.clock.advance(Duration::from_secs(6));
        let report = service.lookup(&spot()).unwrap();
        assert!(report.mature);
        assert_eq!(report.network, "Red");
        assert_eq!(report.expires_in, Duration::from_secs(4));
        assert!(service.sweep_expired(fx.state.now()).is_empty());

        fx.clock.advance(Duration::from_secs(5));
        assert_eq!(service.sweep_expired(fx.state.now()), vec![acid]);
        assert!(fx.state.acid.by_exact_block(&spot()).is_none());
        assert_eq!(service.lookup(&spot()).unwrap_err().reason(), NOT_ACID);

        fx.state.pool.flush().await;
        let stored: Vec<AcidBlock> = fx.storage.load_all().unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn one_acid_per_block() {
        let fx = Fixture::new(windows());
        let (service, alice, _) = setup(&fx);

        service.create(&alice, "Red", spot()).unwrap();
        assert_eq!(
            service.create(&alice, "Red", spot()).unwrap_err().reason(),
            "This block is already an acid block"
        );
        assert_eq!(fx.state.acid.len(), 1);
    }

    #[tokio::test]
    async fn create_requires_permission() {
        let fx = Fixture::new(windows());
        let (service, _, network) = setup(&fx);
        let bob = Actor::player(PlayerId::random(), "bob");

        assert_eq!(
            service.create(&bob, "Red", spot()).unwrap_err(),
            Rejection::not_member()
        );
        fx.state.networks.update(&network.id, |n| n.add_member(bob.id, 0));
        assert_eq!(
            service.create(&bob, "Red", spot()).unwrap_err(),
            Rejection::no_permission()
        );
        fx.state.networks.update(&network.id, |n| {
            n.members.get_mut(&bob.id).unwrap().permissions.insert(Permission::ModifyAcid)
        });
        assert!(service.create(&bob, "Red", spot()).is_ok());
        assert!(service.create(&bob, "Blue", spot()).is_err());
    }

    #[tokio::test]
    async fn rival_bastions_are_advisory() {
        let fx = Fixture::new(windows());
        let (service, alice, network) = setup(&fx);
        let now = fx.state.now();
        let blue = Network::new("Blue", PlayerId::random(), now);
        fx.state.networks.add(blue.clone());

        let window = Duration::from_secs(60);
        let at = |x| BlockLocation::new("world", x, 64, 10);
        let rival = Bastion::new(blue.id, at(12), now, window);
        let own = Bastion::new(network.id, at(8), now, window);
        let far = Bastion::new(blue.id, at(100), now, window);
        for b in [&rival, &own, &far] {
            fx.state.bastions.add(b.clone());
        }

        let placed = service.create(&alice, "Red", spot()).unwrap();
        assert_eq!(placed.hazards, vec![rival]);
        assert_eq!(fx.state.acid.len(), 1);

        fx.clock.advance(Duration::from_secs(60));
        assert!(service.lookup(&spot()).unwrap().hazards.is_empty());
    }

    #[tokio::test]
    async fn orphans_heal_on_lookup() {
        let fx = Fixture::new(windows());
        let (service, _, _) = setup(&fx);
        let orphan = AcidBlock::new(
            NetworkId::random(),
            spot(),
            0,
            Duration::from_secs(5),
            Duration::from_secs(10),
        );
        fx.state.acid.add(orphan);

        assert_eq!(service.lookup(&spot()).unwrap_err(), Rejection::unexpected());
        assert!(fx.state.acid.is_empty());
    }

    #[tokio::test]
    async fn orphans_heal_on_nearby_listing_and_placement() {
        let fx = Fixture::new(windows());
        let (service, alice, _) = setup(&fx);
        let gone = NetworkId::random();
        let near = BlockLocation::new("world", 12, 64, 12);

        let hour = Duration::from_secs(3_600);
        let stray_acid = AcidBlock::new(gone, near.clone(), 0, Duration::ZERO, hour);
        fx.state.acid_store.save(stray_acid.clone());
        fx.state.acid.add(stray_acid);
        assert_eq!(
            service.list_nearby(&alice, &spot()).unwrap_err().reason(),
            "There are no acid blocks nearby"
        );
        assert!(fx.state.acid.is_empty());

        let stray_bastion = Bastion::new(gone, near, fx.state.now(), Duration::from_secs(60));
        fx.state.bastion_store.save(stray_bastion.clone());
        fx.state.bastions.add(stray_bastion);
        let placed = service.create(&alice, "Red", spot()).unwrap();
        assert!(placed.hazards.is_empty());
        assert!(fx.state.bastions.is_empty());

        fx.state.pool.flush().await;
        let bastions: Vec<Bastion> = fx.storage.load_all().unwrap();
        assert!(bastions.is_empty());
        let stored: Vec<AcidBlock> = fx.storage.load_all().unwrap();
        assert_eq!(stored, vec![placed.acid]);
    }

    #[tokio::test]
    async fn placing_acid_keeps_network_active() {
        let fx = Fixture::new(windows());
        let (service, alice, network) = setup(&fx);

        fx.clock.advance(Duration::from_secs(3_600));
        service.create(&alice, "Red", spot()).unwrap();

        let touched = fx.state.network(&network.id).unwrap();
        assert_eq!(touched.last_active, fx.state.now());
        fx.state.pool.flush().await;
        let stored: Vec<Network> = fx.storage.load_all().unwrap();
        assert_eq!(stored, vec![touched]);
    }

    #[tokio::test]
    async fn listings() {
        let fx = Fixture::new(windows());
        let (service, alice, _) = setup(&fx);
        let bob = Actor::player(PlayerId::random(), "bob");

        assert_eq!(
            service.list_by_network(&alice, "Red").unwrap_err().reason(),
            "This network does not have any active acid blocks"
        );
        service.create(&alice, "Red", spot()).unwrap();
        service
            .create(&alice, "Red", BlockLocation::new("world", 500, 64, 500))
            .unwrap();
        assert_eq!(service.list_by_network(&alice, "Red").unwrap().len(), 2);
        assert!(service.list_by_network(&bob, "Red").is_err());

        let here = BlockLocation::new("world", 0, 64, 0);
        assert_eq!(service.list_nearby(&alice, &here).unwrap().len(), 1);
        assert_eq!(
            service.list_nearby(&bob, &here).unwrap_err().reason(),
            "There are no acid blocks nearby"
        );
    }

    #[tokio::test]
    async fn damage_and_world_hooks() {
        let fx = Fixture::new(windows());
        let (service, alice, _) = setup(&fx);
        let acid = service.create(&alice, "Red", spot()).unwrap().acid;

        assert_eq!(service.add_damage(&spot(), 3), Ok(3));
        assert_eq!(service.add_damage(&spot(), 2), Ok(5));
        assert_eq!(fx.state.acid.get(&acid.id).unwrap().damage, 5);

        assert!(service.vetoes_chunk_unload(&ChunkCoord::new("world", 0, 0)));
        assert!(!service.vetoes_chunk_unload(&ChunkCoord::new("world", 1, 0)));
        assert!(service.vetoes_piston(&[spot()]));

        assert_eq!(service.delete_at(&spot()).map(|a| a.id), Some(acid.id));
        assert!(service.delete_at(&spot()).is_none());
        assert!(service.add_damage(&spot(), 1).is_err());
    }

    #[tokio::test]
    async fn remove_checks_owner_permission() {
        let fx = Fixture::new(windows());
        let (service, alice, _) = setup(&fx);
        service.create(&alice, "Red", spot()).unwrap();
        let bob = Actor::player(PlayerId::random(), "bob");

        assert_eq!(service.remove(&bob, &spot()).unwrap_err(), Rejection::not_member());
        assert!(service.remove(&alice, &spot()).is_ok());
        assert!(fx.state.acid.is_empty());
    }
}
