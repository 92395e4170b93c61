use super::{NetworkStore, LAST_ADMIN, NOT_A_MEMBER};
use crate::broadcast::Notice;
use crate::cascade::CascadeReport;
use crate::clock::format_remaining;
use crate::ids::PlayerId;
use crate::models::Network;
use crate::policy::{authorize, require_member, Action, Actor};
use crate::promise::{reject, Outcome, Rejection};
use std::time::Duration;
use tracing::info;

/// Result of a password change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordUpdate {
    /// Whether players can currently join with the password
    pub joining_enabled: bool,
}

impl PasswordUpdate {
    /// Advisory for the player when the new password cannot be used yet.
    pub fn advisory(&self) -> Option<&'static str> {
        (!self.joining_enabled).then_some(
            "Network password access is currently disabled. Enable it in the network configuration.",
        )
    }
}

impl NetworkStore {
    /// Disband a network and remove everything it owns.
    pub fn delete(&self, actor: &Actor, name: &str) -> Outcome<CascadeReport> {
        let network = self.state.find_network(name)?;
        authorize(&network, actor, Action::Disband)?;

        self.state.notify(
            &network,
            Notice::Disbanded {
                network: network.name.clone(),
                by: actor.name.clone(),
            },
        );

        let (_, report) = self
            .cascade
            .purge_network(&network.id)
            .ok_or_else(Rejection::network_not_found)?;
        info!(network = %network.id, actor = %actor.id, "Network disbanded");
        Ok(report)
    }

    /// Leave a network. The last ADMIN cannot leave.
    pub fn leave(&self, actor: &Actor, name: &str) -> Outcome {
        let mut network = self.state.find_network(name)?;
        let member = require_member(&network, actor)?;
        if member.is_admin() && network.admin_count() <= 1 {
            return reject(LAST_ADMIN);
        }

        network.remove_member(&actor.id, self.state.now());
        self.commit(network.clone())?;

        self.state.notify(
            &network,
            Notice::MemberLeft {
                network: network.name.clone(),
                player: actor.id,
            },
        );
        info!(network = %network.id, actor = %actor.id, "Member left");
        Ok(())
    }

    /// Remove another member.
    ///
    /// Holders of KICK may only kick non-admins; ADMINs and operators may
    /// kick anyone except the last ADMIN.
    pub fn kick(&self, actor: &Actor, name: &str, target: PlayerId) -> Outcome {
        let mut network = self.state.find_network(name)?;
        let kicker = authorize(&network, actor, Action::Kick)?;

        if target == actor.id {
            return reject("You can not kick yourself");
        }
        let Some(victim) = network.member(&target) else {
            return reject(NOT_A_MEMBER);
        };
        if victim.is_admin() {
            if !actor.operator && !kicker.is_some_and(|k| k.is_admin()) {
                return reject("Only an ADMIN may kick another ADMIN");
            }
            if network.admin_count() <= 1 {
                return reject(LAST_ADMIN);
            }
        }

        let recipients = network.member_ids();
        network.remove_member(&target, self.state.now());
        self.commit(network.clone())?;

        self.state.broadcaster.broadcast(
            &recipients,
            &Notice::MemberKicked {
                network: network.name.clone(),
                player: target,
                by: actor.name.clone(),
            },
        );
        info!(network = %network.id, actor = %actor.id, target = %target, "Member kicked");
        Ok(())
    }

    /// Rename a network, subject to a per-player cooldown.
    pub fn rename(&self, actor: &Actor, name: &str, new_name: &str) -> Outcome {
        let mut network = self.state.find_network(name)?;
        authorize(&network, actor, Action::Rename)?;

        let now = self.state.now();
        if !actor.operator {
            if let Some(remaining) = self.rename_cooldowns.remaining(&actor.id, now) {
                return reject(format!(
                    "Please wait {} before attempting to rename another network",
                    format_remaining(remaining)
                ));
            }
        }

        self.validate_name(new_name, Some(&network))?;

        let old_name = std::mem::replace(&mut network.name, new_name.to_string());
        network.last_active = now;
        self.commit(network.clone())?;
        self.rename_cooldowns
            .start(actor.id, now, self.state.config.rename_cooldown);

        self.state.notify(
            &network,
            Notice::Renamed {
                from: old_name.clone(),
                to: network.name.clone(),
                by: actor.name.clone(),
            },
        );
        info!(network = %network.id, from = %old_name, to = %network.name, "Network renamed");
        Ok(())
    }

    /// Replace the join password. Succeeds even while password joining is
    /// off; the returned update says so.
    pub fn change_password(
        &self,
        actor: &Actor,
        name: &str,
        password: &str,
    ) -> Outcome<PasswordUpdate> {
        let mut network = self.state.find_network(name)?;
        authorize(&network, actor, Action::ChangePassword)?;
        self.validate_password(password)?;

        network.set_password(password);
        network.last_active = self.state.now();
        self.commit(network.clone())?;

        self.state.notify(
            &network,
            Notice::PasswordChanged {
                network: network.name.clone(),
                by: actor.name.clone(),
            },
        );
        Ok(PasswordUpdate {
            joining_enabled: network.settings.password_enabled,
        })
    }

    /// Turn password joining on or off.
    pub fn set_password_enabled(&self, actor: &Actor, name: &str, enabled: bool) -> Outcome {
        let mut network = self.state.find_network(name)?;
        authorize(&network, actor, Action::ConfigureNetwork)?;

        if enabled && network.settings.password_hash.is_none() {
            return reject("Set a password before enabling password access");
        }

        network.settings.password_enabled = enabled;
        network.last_active = self.state.now();
        self.commit(network)
    }

    /// Disband every network idle for longer than the inactivity window.
    pub fn expire_inactive(&self, now: u64) -> Vec<(Network, CascadeReport)> {
        let window = self.state.config.network_inactive_expire.as_millis() as u64;
        let idle = self
            .state
            .networks
            .find_all(|n| now.saturating_sub(n.last_active) >= window);

        idle.into_iter()
            .filter_map(|network| {
                let expired = self.cascade.purge_network(&network.id)?;
                info!(
                    network = %network.id,
                    name = %network.name,
                    idle = ?Duration::from_millis(now.saturating_sub(network.last_active)),
                    "Inactive network expired"
                );
                Some(expired)
            })
            .collect()
    }

    /// Drop invitations older than the invite lifetime.
    pub fn prune_invites(&self, now: u64) -> usize {
        let lifetime = self.state.config.invite_lifetime.as_millis() as u64;
        let stale = self.state.networks.find_all(|n| {
            n.pending
                .values()
                .any(|invited_at| now.saturating_sub(*invited_at) >= lifetime)
        });

        let mut pruned = 0;
        for mut network in stale {
            pruned += network.prune_invites(now, lifetime);
            // A network disbanded in between is simply skipped
            let _ = self.commit(network);
        }
        pruned
    }
}
