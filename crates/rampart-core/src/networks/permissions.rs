use super::{NetworkStore, LAST_ADMIN, NOT_A_MEMBER};
use crate::broadcast::Notice;
use crate::ids::PlayerId;
use crate::models::Permission;
use crate::policy::{authorize, Action, Actor};
use crate::promise::{reject, Outcome, Rejection};
use tracing::info;

impl NetworkStore {
    /// Give a member a permission.
    pub fn grant(
        &self,
        actor: &Actor,
        name: &str,
        target: PlayerId,
        permission: Permission,
    ) -> Outcome {
        self.edit_permission(actor, name, target, permission, true)
    }

    /// Take a permission away. The last ADMIN keeps ADMIN.
    pub fn revoke(
        &self,
        actor: &Actor,
        name: &str,
        target: PlayerId,
        permission: Permission,
    ) -> Outcome {
        self.edit_permission(actor, name, target, permission, false)
    }

    fn edit_permission(
        &self,
        actor: &Actor,
        name: &str,
        target: PlayerId,
        permission: Permission,
        granted: bool,
    ) -> Outcome {
        let mut network = self.state.find_network(name)?;
        authorize(&network, actor, Action::EditPermissions)?;

        let Some(member) = network.member(&target) else {
            return reject(NOT_A_MEMBER);
        };
        if member.has(permission) == granted {
            let state = if granted { "already has" } else { "does not have" };
            return reject(format!("Player {state} the {permission} permission"));
        }
        if !granted && permission == Permission::Admin && network.admin_count() <= 1 {
            return reject(LAST_ADMIN);
        }

        let now = self.state.now();
        let member = network
            .members
            .get_mut(&target)
            .ok_or_else(Rejection::unexpected)?;
        if granted {
            member.permissions.insert(permission);
        } else {
            member.permissions.remove(permission);
        }
        network.last_active = now;
        self.commit(network.clone())?;

        self.state.notify(
            &network,
            Notice::PermissionChanged {
                network: network.name.clone(),
                player: target,
                permission,
                granted,
            },
        );
        info!(network = %network.id, target = %target, %permission, granted, "Permission changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RampartConfig;
    use crate::networks::tests::{actor, store};
    use crate::state::testing::Fixture;

    #[tokio::test]
    async fn grant_and_revoke() {
        let fx = Fixture::new(RampartConfig::default());
        let store = store(&fx);
        let alice = actor("alice");
        let bob = actor("bob");
        store.create(&alice, "Red").unwrap();
        store.invite(&alice, "Red", bob.id).unwrap();
        store.accept(&bob, "Red", None).unwrap();

        assert_eq!(
            store.grant(&bob, "Red", bob.id, Permission::Admin).unwrap_err(),
            Rejection::no_permission()
        );

        store.grant(&alice, "Red", bob.id, Permission::ModifyAcid).unwrap();
        assert_eq!(
            store.grant(&alice, "Red", bob.id, Permission::ModifyAcid).unwrap_err().reason(),
            "Player already has the MODIFY_ACID permission"
        );
        store.revoke(&alice, "Red", bob.id, Permission::ModifyAcid).unwrap();

        let network = fx.state.network_by_name("Red").unwrap();
        assert!(!network.member(&bob.id).unwrap().has(Permission::ModifyAcid));
    }

    #[tokio::test]
    async fn last_admin_keeps_admin() {
        let fx = Fixture::new(RampartConfig::default());
        let store = store(&fx);
        let alice = actor("alice");
        let bob = actor("bob");
        store.create(&alice, "Red").unwrap();
        store.invite(&alice, "Red", bob.id).unwrap();
        store.accept(&bob, "Red", None).unwrap();

        assert_eq!(
            store.revoke(&alice, "Red", alice.id, Permission::Admin).unwrap_err().reason(),
            LAST_ADMIN
        );

        store.grant(&alice, "Red", bob.id, Permission::Admin).unwrap();
        store.revoke(&bob, "Red", alice.id, Permission::Admin).unwrap();
        assert_eq!(fx.state.network_by_name("Red").unwrap().admin_count(), 1);
    }
}
