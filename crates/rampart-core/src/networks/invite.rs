use super::{NetworkStore, NETWORK_FULL, TOO_MANY_NETWORKS};
use crate::broadcast::Notice;
use crate::ids::PlayerId;
use crate::policy::{authorize, Action, Actor};
use crate::promise::{reject, Outcome};
use tracing::info;

impl NetworkStore {
    fn invite_lifetime_ms(&self) -> u64 {
        self.state.config.invite_lifetime.as_millis() as u64
    }

    /// Invite a player.
    pub fn invite(&self, actor: &Actor, name: &str, target: PlayerId) -> Outcome {
        let mut network = self.state.find_network(name)?;
        authorize(&network, actor, Action::Invite)?;

        let now = self.state.now();
        if network.is_member(&target) {
            return reject("Player is already a member of this network");
        }
        if network.has_live_invite(&target, now, self.invite_lifetime_ms()) {
            return reject("Player has already been invited to this network");
        }
        if network.members.len() >= self.state.config.max_members {
            return reject(NETWORK_FULL);
        }

        network.prune_invites(now, self.invite_lifetime_ms());
        network.pending.insert(target, now);
        self.commit(network.clone())?;

        let mut recipients = network.member_ids();
        recipients.push(target);
        self.state.broadcaster.broadcast(
            &recipients,
            &Notice::Invited {
                network: network.name.clone(),
                player: target,
                by: actor.name.clone(),
            },
        );
        info!(network = %network.id, actor = %actor.id, target = %target, "Player invited");
        Ok(())
    }

    /// Withdraw an invitation.
    pub fn uninvite(&self, actor: &Actor, name: &str, target: PlayerId) -> Outcome {
        let mut network = self.state.find_network(name)?;
        authorize(&network, actor, Action::Uninvite)?;

        if network.pending.remove(&target).is_none() {
            return reject("Player has not been invited to this network");
        }
        self.commit(network.clone())?;

        let mut recipients = network.member_ids();
        recipients.push(target);
        self.state.broadcaster.broadcast(
            &recipients,
            &Notice::InviteRevoked {
                network: network.name.clone(),
                player: target,
                by: actor.name.clone(),
            },
        );
        Ok(())
    }

    /// Join a network.
    ///
    /// Invited players join outright. Anyone else needs the correct password
    /// and the network must have password joining turned on.
    pub fn accept(&self, actor: &Actor, name: &str, password: Option<&str>) -> Outcome {
        let mut network = self.state.find_network(name)?;
        let now = self.state.now();

        if network.is_member(&actor.id) {
            return reject("You are already a member of this network");
        }

        if !network.has_live_invite(&actor.id, now, self.invite_lifetime_ms()) {
            match password {
                Some(password) if network.password_admits(password) => {}
                Some(_) if network.settings.password_enabled => {
                    return reject("Incorrect password");
                }
                _ => return reject("You have not been invited to this network"),
            }
        }

        if network.members.len() >= self.state.config.max_members {
            return reject(NETWORK_FULL);
        }
        if self.joined_count(&actor.id) >= self.state.config.max_joined_networks {
            return reject(TOO_MANY_NETWORKS);
        }

        network.add_member(actor.id, now);
        self.commit(network.clone())?;

        self.state.notify(
            &network,
            Notice::MemberJoined {
                network: network.name.clone(),
                player: actor.id,
            },
        );
        info!(network = %network.id, actor = %actor.id, "Member joined");
        Ok(())
    }

    /// Decline an invitation.
    pub fn deny(&self, actor: &Actor, name: &str) -> Outcome {
        let mut network = self.state.find_network(name)?;
        if network.pending.remove(&actor.id).is_none() {
            return reject("You have not been invited to this network");
        }
        self.commit(network)
    }

    /// Names of networks holding a live invite for the actor, sorted.
    pub fn pending(&self, actor: &Actor) -> Vec<String> {
        let now = self.state.now();
        let lifetime = self.invite_lifetime_ms();
        let mut names: Vec<String> = self
            .state
            .networks
            .find_all(|n| n.has_live_invite(&actor.id, now, lifetime))
            .into_iter()
            .map(|n| n.name)
            .collect();
        names.sort();
        names
    }
}
