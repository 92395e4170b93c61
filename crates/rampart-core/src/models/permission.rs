//! Network member permissions.

use serde::{Deserialize, Serialize};

/// A capability a network member can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Full control over the network
    Admin,
    /// Create and remove acid blocks
    ModifyAcid,
    /// Place and remove bastions
    ModifyBastion,
    /// See the network's claims and alerts
    ViewSnitches,
    /// Invite and uninvite players
    Invite,
    /// Remove non-admin members
    Kick,
    /// Speak in the network's chat channel
    AccessChat,
}

impl Permission {
    /// Every permission, in declaration order.
    pub const ALL: [Permission; 7] = [
        Permission::Admin,
        Permission::ModifyAcid,
        Permission::ModifyBastion,
        Permission::ViewSnitches,
        Permission::Invite,
        Permission::Kick,
        Permission::AccessChat,
    ];

    const fn bit(self) -> u16 {
        1 << self as u16
    }

    /// Stable upper-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::ModifyAcid => "MODIFY_ACID",
            Self::ModifyBastion => "MODIFY_BASTION",
            Self::ViewSnitches => "VIEW_SNITCHES",
            Self::Invite => "INVITE",
            Self::Kick => "KICK",
            Self::AccessChat => "ACCESS_CHAT",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of [`Permission`]s, stored as a bit mask and serialized as a list
/// of names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Permission>", into = "Vec<Permission>")]
pub struct PermissionSet(u16);

impl PermissionSet {
    /// No permissions.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every permission; what a network's creator starts with.
    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    /// What a freshly joined member starts with.
    pub fn member_default() -> Self {
        [Permission::AccessChat].into_iter().collect()
    }

    /// True if the permission is held.
    pub const fn contains(&self, permission: Permission) -> bool {
        self.0 & permission.bit() != 0
    }

    /// Add a permission. Returns false if it was already held.
    pub fn insert(&mut self, permission: Permission) -> bool {
        let had = self.contains(permission);
        self.0 |= permission.bit();
        !had
    }

    /// Remove a permission. Returns false if it was not held.
    pub fn remove(&mut self, permission: Permission) -> bool {
        let had = self.contains(permission);
        self.0 &= !permission.bit();
        had
    }

    /// Iterate the held permissions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.contains(*p))
    }

    /// True if nothing is held.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = Self::empty();
        for permission in iter {
            set.insert(permission);
        }
        set
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(list: Vec<Permission>) -> Self {
        list.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(set: PermissionSet) -> Self {
        set.iter().collect()
    }
}
