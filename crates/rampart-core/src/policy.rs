//! Who may do what.
//!
//! Every permission check goes through [`authorize`], which looks the action
//! up in a single table. Operators (server staff) bypass the table but are
//! still reported as members when they happen to be one.

use crate::ids::PlayerId;
use crate::models::{Network, NetworkMember, Permission};
use crate::promise::{Outcome, Rejection};
use serde::{Deserialize, Serialize};

/// The player performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Account id
    pub id: PlayerId,

    /// Display name, used in notices
    pub name: String,

    /// Server operator; bypasses network permissions and cooldowns
    #[serde(default)]
    pub operator: bool,
}

impl Actor {
    /// A regular player.
    pub fn player(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            operator: false,
        }
    }

    /// A server operator.
    pub fn operator(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            operator: true,
        }
    }
}

/// A network-scoped action that needs a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Disband,
    Rename,
    ChangePassword,
    ConfigureNetwork,
    EditPermissions,
    Invite,
    Uninvite,
    Kick,
    CreateAcid,
    RemoveAcid,
    ListAcid,
    PlaceBastion,
    RemoveBastion,
}

/// What a member must hold to perform an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// ADMIN only.
    Admin,
    /// ADMIN or the given permission.
    AdminOr(Permission),
}

impl Requirement {
    /// True if the member satisfies the requirement.
    pub fn admits(self, member: &NetworkMember) -> bool {
        match self {
            Requirement::Admin => member.is_admin(),
            Requirement::AdminOr(permission) => member.is_admin() || member.has(permission),
        }
    }
}

impl Action {
    /// The permission table.
    pub const fn requirement(self) -> Requirement {
        match self {
            Action::Disband
            | Action::Rename
            | Action::ChangePassword
            | Action::ConfigureNetwork
            | Action::EditPermissions => Requirement::Admin,
            Action::Invite | Action::Uninvite => Requirement::AdminOr(Permission::Invite),
            Action::Kick => Requirement::AdminOr(Permission::Kick),
            Action::CreateAcid | Action::RemoveAcid => Requirement::AdminOr(Permission::ModifyAcid),
            Action::ListAcid => Requirement::AdminOr(Permission::ViewSnitches),
            Action::PlaceBastion | Action::RemoveBastion => {
                Requirement::AdminOr(Permission::ModifyBastion)
            }
        }
    }
}

/// Check that `actor` may perform `action` on `network`.
///
/// Returns the actor's membership record, which is `None` only for an
/// operator acting on a network they do not belong to.
pub fn authorize<'a>(
    network: &'a Network,
    actor: &Actor,
    action: Action,
) -> Outcome<Option<&'a NetworkMember>> {
    let member = network.member(&actor.id);
    if actor.operator {
        return Ok(member);
    }

    let member = member.ok_or_else(Rejection::not_member)?;
    if !action.requirement().admits(member) {
        return Err(Rejection::no_permission());
    }
    Ok(Some(member))
}

/// Membership check for actions open to every member.
pub fn require_member<'a>(network: &'a Network, actor: &Actor) -> Outcome<&'a NetworkMember> {
    network.member(&actor.id).ok_or_else(Rejection::not_member)
}
