//! Network notices.
//!
//! The core decides who should hear about a change and what happened; how
//! the notice reaches players is up to the [`Broadcaster`] it was built with.

use crate::ids::PlayerId;
use crate::models::Permission;
use parking_lot::Mutex;
use tracing::info;

/// Something members of a network should hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The network was disbanded.
    Disbanded { network: String, by: String },
    /// The network was renamed.
    Renamed { from: String, to: String, by: String },
    /// The join password was changed.
    PasswordChanged { network: String, by: String },
    /// A player joined.
    MemberJoined { network: String, player: PlayerId },
    /// A member left voluntarily.
    MemberLeft { network: String, player: PlayerId },
    /// A member was removed by someone else.
    MemberKicked { network: String, player: PlayerId, by: String },
    /// A player was invited.
    Invited { network: String, player: PlayerId, by: String },
    /// An invite was withdrawn.
    InviteRevoked { network: String, player: PlayerId, by: String },
    /// A member's permission changed.
    PermissionChanged {
        network: String,
        player: PlayerId,
        permission: Permission,
        granted: bool,
    },
    /// An acid block was placed.
    AcidCreated { network: String, by: String, at: String },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::Disbanded { network, by } => {
                write!(f, "{network} has been disbanded by {by}")
            }
            Notice::Renamed { from, to, by } => write!(f, "{by} renamed {from} to {to}"),
            Notice::PasswordChanged { network, by } => {
                write!(f, "{by} updated the password for {network}")
            }
            Notice::MemberJoined { network, player } => write!(f, "{player} has joined {network}"),
            Notice::MemberLeft { network, player } => write!(f, "{player} has left {network}"),
            Notice::MemberKicked {
                network,
                player,
                by,
            } => write!(f, "{player} has been kicked from {network} by {by}"),
            Notice::Invited {
                network,
                player,
                by,
            } => write!(f, "{by} invited {player} to {network}"),
            Notice::InviteRevoked {
                network,
                player,
                by,
            } => write!(f, "{by} revoked the invite of {player} to {network}"),
            Notice::PermissionChanged {
                network,
                player,
                permission,
                granted,
            } => {
                let verb = if *granted { "granted" } else { "revoked" };
                write!(f, "{permission} {verb} for {player} in {network}")
            }
            Notice::AcidCreated { network, by, at } => {
                write!(f, "{by} created an Acid Block for {network} at {at}")
            }
        }
    }
}

/// Delivers notices to players.
pub trait Broadcaster: Send + Sync {
    /// Send the notice to every recipient.
    fn broadcast(&self, recipients: &[PlayerId], notice: &Notice);
}

/// Broadcaster that only writes notices to the log.
#[derive(Debug, Default)]
pub struct LogBroadcaster;

impl Broadcaster for LogBroadcaster {
    fn broadcast(&self, recipients: &[PlayerId], notice: &Notice) {
        info!(recipients = recipients.len(), "{}", notice);
    }
}

/// Broadcaster that keeps every notice it is given.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    sent: Mutex<Vec<(Vec<PlayerId>, Notice)>>,
}

impl RecordingBroadcaster {
    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<(Vec<PlayerId>, Notice)> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Notices recorded so far, without recipients.
    pub fn notices(&self) -> Vec<Notice> {
        self.sent.lock().iter().map(|(_, n)| n.clone()).collect()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast(&self, recipients: &[PlayerId], notice: &Notice) {
        self.sent.lock().push((recipients.to_vec(), notice.clone()));
    }
}
