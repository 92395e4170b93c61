//! Network store - membership, invitations, permissions and naming.
//!
//! Every operation validates against a snapshot of the network, then writes
//! the changed network back in one step and schedules its durable save.
//! A refused operation changes nothing.

mod create;
mod display;
mod invite;
mod manage;
mod permissions;

pub use display::NetworkSummary;
pub use manage::PasswordUpdate;

use crate::cascade::Cascade;
use crate::cooldown::CooldownMap;
use crate::ids::PlayerId;
use crate::models::Network;
use crate::promise::{reject, Outcome, Rejection};
use crate::state::RampartState;
use tracing::warn;

pub(crate) const LAST_ADMIN: &str = "There must be at least one other member with the ADMIN permission. Promote another member or disband the network.";
pub(crate) const NOT_A_MEMBER: &str = "Player is not a member of this network";
pub(crate) const NETWORK_FULL: &str = "This network has reached the maximum number of members";
pub(crate) const TOO_MANY_NETWORKS: &str =
    "You have reached the maximum number of networks you can be a member of";

/// Networks and everything about who belongs to them.
pub struct NetworkStore {
    state: RampartState,
    cascade: Cascade,
    rename_cooldowns: CooldownMap,
    create_cooldowns: CooldownMap,
}

impl NetworkStore {
    pub fn new(state: RampartState, cascade: Cascade) -> Self {
        Self {
            state,
            cascade,
            rename_cooldowns: CooldownMap::new(),
            create_cooldowns: CooldownMap::new(),
        }
    }

    /// Drop elapsed rename and create cooldowns.
    pub fn purge_cooldowns(&self, now: u64) -> usize {
        self.rename_cooldowns.purge_expired(now) + self.create_cooldowns.purge_expired(now)
    }

    /// Number of networks the player belongs to.
    pub fn joined_count(&self, player: &PlayerId) -> usize {
        self.state.networks.count(|n| n.is_member(player))
    }

    /// Check a proposed network name against the naming policy and against
    /// every other live network.
    pub(crate) fn validate_name(&self, name: &str, renaming: Option<&Network>) -> Outcome {
        let config = &self.state.config;

        if !is_name_charset(name) {
            return reject("Name may only contain characters A-Z & 0-9");
        }
        if name.len() < config.min_name_len {
            return reject(format!(
                "Name must be at least {} characters long",
                config.min_name_len
            ));
        }
        if name.len() > config.max_name_len {
            return reject(format!(
                "Name must be {} characters long or less",
                config.max_name_len
            ));
        }
        if config.is_banned_name(name) {
            return reject("This network name is not allowed");
        }

        let taken = self
            .state
            .networks
            .any(|n| n.name_matches(name) && renaming.map_or(true, |r| r.id != n.id));
        if taken {
            return reject("Network name is already in use");
        }
        Ok(())
    }

    pub(crate) fn validate_password(&self, password: &str) -> Outcome {
        let config = &self.state.config;

        if !is_name_charset(password) {
            return reject("Password may only contain characters A-Z & 0-9");
        }
        if password.len() < config.min_password_len {
            return reject(format!(
                "Password must be at least {} characters long",
                config.min_password_len
            ));
        }
        if password.len() > config.max_password_len {
            return reject(format!(
                "Password must be {} characters long or less",
                config.max_password_len
            ));
        }
        Ok(())
    }

    /// Write a changed network back and schedule its save.
    pub(crate) fn commit(&self, network: Network) -> Outcome {
        let replaced = self
            .state
            .networks
            .update(&network.id, |stored| *stored = network.clone());
        if replaced.is_none() {
            warn!(network = %network.id, "Network vanished before its change was stored");
            return Err(Rejection::network_not_found());
        }
        self.state.network_store.save(network);
        Ok(())
    }
}

fn is_name_charset(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}
