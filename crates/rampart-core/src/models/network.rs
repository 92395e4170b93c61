//! Network model - a player-formed ownership group.

use crate::ids::{NetworkId, PlayerId};
use crate::models::{Permission, PermissionSet};
use crate::repository::Entity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A member of a network and what they may do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkMember {
    /// The member's account
    pub player: PlayerId,

    /// Granted permissions
    pub permissions: PermissionSet,

    /// Unix millis the member joined
    pub joined_at: u64,
}

impl NetworkMember {
    /// True if the member holds the permission.
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(permission)
    }

    /// True if the member is an ADMIN.
    pub fn is_admin(&self) -> bool {
        self.has(Permission::Admin)
    }
}

/// Per-network toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Keyed hash of the join password, if one was ever set
    pub password_hash: Option<String>,

    /// Whether uninvited players may join with the password
    #[serde(default)]
    pub password_enabled: bool,
}

/// A network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Unique identifier
    pub id: NetworkId,

    /// Display name, unique ignoring ASCII case
    pub name: String,

    /// Player who created the network
    pub creator: PlayerId,

    /// Members keyed by player
    pub members: HashMap<PlayerId, NetworkMember>,

    /// Pending invitations: invitee to unix millis of the invite
    #[serde(default)]
    pub pending: HashMap<PlayerId, u64>,

    /// Toggles
    #[serde(default)]
    pub settings: NetworkSettings,

    /// Unix millis of creation
    pub created_at: u64,

    /// Unix millis of the last membership or configuration change
    pub last_active: u64,
}

impl Network {
    /// Create a network whose creator is its only member, holding every
    /// permission.
    pub fn new(name: impl Into<String>, creator: PlayerId, now: u64) -> Self {
        let mut members = HashMap::new();
        members.insert(
            creator,
            NetworkMember {
                player: creator,
                permissions: PermissionSet::all(),
                joined_at: now,
            },
        );

        Self {
            id: NetworkId::random(),
            name: name.into(),
            creator,
            members,
            pending: HashMap::new(),
            settings: NetworkSettings::default(),
            created_at: now,
            last_active: now,
        }
    }

    /// True if `name` refers to this network, ignoring ASCII case.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Look up a member.
    pub fn member(&self, player: &PlayerId) -> Option<&NetworkMember> {
        self.members.get(player)
    }

    /// True if the player is a member.
    pub fn is_member(&self, player: &PlayerId) -> bool {
        self.members.contains_key(player)
    }

    /// Members holding the permission.
    pub fn members_with(&self, permission: Permission) -> impl Iterator<Item = &NetworkMember> {
        self.members.values().filter(move |m| m.has(permission))
    }

    /// Number of ADMIN members.
    pub fn admin_count(&self) -> usize {
        self.members_with(Permission::Admin).count()
    }

    /// Everyone who should hear network broadcasts.
    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.members.keys().copied().collect()
    }

    /// Add a member with the default permissions, clearing any invite.
    pub fn add_member(&mut self, player: PlayerId, now: u64) {
        self.pending.remove(&player);
        self.members.insert(
            player,
            NetworkMember {
                player,
                permissions: PermissionSet::member_default(),
                joined_at: now,
            },
        );
        self.last_active = now;
    }

    /// Remove a member.
    pub fn remove_member(&mut self, player: &PlayerId, now: u64) -> Option<NetworkMember> {
        let removed = self.members.remove(player);
        if removed.is_some() {
            self.last_active = now;
        }
        removed
    }

    /// True if the player holds an invite younger than `lifetime_ms`.
    pub fn has_live_invite(&self, player: &PlayerId, now: u64, lifetime_ms: u64) -> bool {
        self.pending
            .get(player)
            .is_some_and(|invited_at| now.saturating_sub(*invited_at) < lifetime_ms)
    }

    /// Drop invites older than `lifetime_ms`. Returns how many were removed.
    pub fn prune_invites(&mut self, now: u64, lifetime_ms: u64) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|_, invited_at| now.saturating_sub(*invited_at) < lifetime_ms);
        before - self.pending.len()
    }

    /// Replace the join password.
    pub fn set_password(&mut self, password: &str) {
        self.settings.password_hash = Some(hash_password(&self.id, password));
    }

    /// True if password joining is on and `password` is correct.
    pub fn password_admits(&self, password: &str) -> bool {
        self.settings.password_enabled
            && self
                .settings
                .password_hash
                .as_deref()
                .is_some_and(|stored| stored == hash_password(&self.id, password))
    }
}

impl Entity for Network {
    type Id = NetworkId;
    const KIND: &'static str = "network";

    fn id(&self) -> NetworkId {
        self.id
    }
}

/// Hash a join password, keyed by the network so equal passwords on
/// different networks hash differently.
pub fn hash_password(network: &NetworkId, password: &str) -> String {
    let key = blake3::derive_key("rampart network password v1", network.as_bytes());
    hex::encode(blake3::keyed_hash(&key, password.as_bytes()).as_bytes())
}
