use super::{NetworkStore, TOO_MANY_NETWORKS};
use crate::clock::format_remaining;
use crate::models::Network;
use crate::policy::Actor;
use crate::promise::{reject, Outcome, Rejection};
use tracing::info;

impl NetworkStore {
    /// Create a network with `actor` as its only member and ADMIN.
    pub fn create(&self, actor: &Actor, name: &str) -> Outcome<Network> {
        let now = self.state.now();

        if !actor.operator {
            if let Some(remaining) = self.create_cooldowns.remaining(&actor.id, now) {
                return reject(format!(
                    "Please wait {} before creating another network",
                    format_remaining(remaining)
                ));
            }
        }

        self.validate_name(name, None)?;

        if self.joined_count(&actor.id) >= self.state.config.max_joined_networks {
            return reject(TOO_MANY_NETWORKS);
        }

        let network = Network::new(name, actor.id, now);
        if !self.state.networks.add(network.clone()) {
            return Err(Rejection::unexpected());
        }
        self.state.network_store.save(network.clone());
        self.create_cooldowns
            .start(actor.id, now, self.state.config.create_cooldown);

        info!(network = %network.id, name = %network.name, actor = %actor.id, "Network created");
        Ok(network)
    }
}
