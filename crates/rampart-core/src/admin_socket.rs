//! Unix socket server for admin commands.
//!
//! Provides a local newline-delimited JSON interface to every caller-facing
//! operation. Each request names the acting player; requests run on the
//! node's interactive task, one at a time.

use crate::error::Result;
use crate::ids::PlayerId;
use crate::models::{AcidBlock, Bastion, Permission};
use crate::networks::NetworkSummary;
use crate::node::NodeHandle;
use crate::policy::Actor;
use crate::promise::Outcome;
use crate::rampart::Rampart;
use rampart_geo::{BlockLocation, ChunkCoord};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Admin command sent over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Create a network
    CreateNetwork { actor: Actor, name: String },
    /// Disband a network
    DeleteNetwork { actor: Actor, name: String },
    /// Rename a network
    RenameNetwork { actor: Actor, name: String, new_name: String },
    /// Set the join password
    ChangePassword { actor: Actor, name: String, password: String },
    /// Toggle password joining
    SetPasswordEnabled { actor: Actor, name: String, enabled: bool },
    /// Invite a player
    Invite { actor: Actor, name: String, player: PlayerId },
    /// Withdraw an invite
    Uninvite { actor: Actor, name: String, player: PlayerId },
    /// Join a network
    Accept {
        actor: Actor,
        name: String,
        #[serde(default)]
        password: Option<String>,
    },
    /// Decline an invite
    Deny { actor: Actor, name: String },
    /// Networks with a live invite for the actor
    Pending { actor: Actor },
    /// Leave a network
    Leave { actor: Actor, name: String },
    /// Remove a member
    Kick { actor: Actor, name: String, player: PlayerId },
    /// Give a member a permission
    Grant { actor: Actor, name: String, player: PlayerId, permission: Permission },
    /// Take a permission away
    Revoke { actor: Actor, name: String, player: PlayerId, permission: Permission },
    /// Networks a player belongs to
    ListNetworks {
        actor: Actor,
        #[serde(default)]
        player: Option<PlayerId>,
    },
    /// Summary of one network
    ShowNetwork { name: String },
    /// Place an acid block
    CreateAcid { actor: Actor, name: String, location: BlockLocation },
    /// Inspect an acid block
    LookupAcid { location: BlockLocation },
    /// Acid blocks of a network
    ListAcid { actor: Actor, name: String },
    /// Friendly acid blocks near a location
    NearbyAcid { actor: Actor, location: BlockLocation },
    /// Remove an acid block
    RemoveAcid { actor: Actor, location: BlockLocation },
    /// Damage an acid block
    DamageAcid { location: BlockLocation, amount: u32 },
    /// Place a bastion
    PlaceBastion { actor: Actor, name: String, location: BlockLocation },
    /// Remove a bastion
    RemoveBastion { actor: Actor, location: BlockLocation },
    /// Bastions of a network
    ListBastions { name: String },
    /// Bastions near a location
    BastionsInRange {
        location: BlockLocation,
        radius: f64,
        #[serde(default)]
        flat: bool,
    },
    /// A block left the world
    BlockRemoved { location: BlockLocation },
    /// Whether a chunk must stay loaded
    ChunkUnload { chunk: ChunkCoord },
    /// Whether a piston may move these blocks
    PistonMove { blocks: Vec<BlockLocation> },
    /// Run the maintenance sweep now
    Sweep,
    /// Queue a full save
    Save,
    /// Ping (health check)
    Ping,
}

/// Acid block details as shown to operators.
#[derive(Debug, Serialize)]
pub struct AcidInfo {
    pub acid: AcidBlock,
    pub network: String,
    pub mature: bool,
    pub matures_in_secs: u64,
    pub expires_in_secs: u64,
    pub hazards: Vec<Bastion>,
}

/// Response from admin command.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    Ok { message: String },
    Error { error: String },
    Network { network: NetworkSummary },
    Networks { networks: Vec<NetworkSummary> },
    Acid { blocks: Vec<AcidBlock>, hazards: Vec<Bastion> },
    AcidInfo { info: AcidInfo },
    Bastions { bastions: Vec<Bastion> },
    List { items: Vec<String> },
    Bool { value: bool },
    Count { value: u64 },
    Pong,
}

impl AdminResponse {
    fn from_outcome<T>(outcome: Outcome<T>, ok: impl FnOnce(T) -> AdminResponse) -> Self {
        match outcome {
            Ok(value) => ok(value),
            Err(rejection) => AdminResponse::Error {
                error: rejection.reason().to_string(),
            },
        }
    }

    fn done(outcome: Outcome, message: String) -> Self {
        Self::from_outcome(outcome, |()| AdminResponse::Ok { message })
    }
}

/// Admin socket server.
pub struct AdminSocket {
    node: NodeHandle,
    socket_path: PathBuf,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(node: NodeHandle, socket_path: &Path) -> Self {
        Self {
            node,
            socket_path: socket_path.to_path_buf(),
        }
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        // Remove existing socket file if present
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let node = self.node.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, node).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

async fn handle_connection(stream: UnixStream, node: NodeHandle) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<AdminCommand>(&line) {
            Ok(cmd) => match node.call(move |core| execute_command(cmd, core)).await {
                Ok(response) => response,
                Err(e) => AdminResponse::Error {
                    error: e.to_string(),
                },
            },
            Err(e) => AdminResponse::Error {
                error: format!("Invalid command: {}", e),
            },
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

/// Run one command against the core.
pub fn execute_command(cmd: AdminCommand, core: &Rampart) -> AdminResponse {
    match cmd {
        AdminCommand::CreateNetwork { actor, name } => {
            AdminResponse::from_outcome(core.networks.create(&actor, &name), |network| {
                AdminResponse::Ok {
                    message: format!("Created network {} ({})", network.name, network.id),
                }
            })
        }

        AdminCommand::DeleteNetwork { actor, name } => {
            AdminResponse::from_outcome(core.networks.delete(&actor, &name), |report| {
                AdminResponse::Ok {
                    message: format!(
                        "Disbanded {} ({} bastions, {} acid blocks removed)",
                        name, report.bastions, report.acid_blocks
                    ),
                }
            })
        }

        AdminCommand::RenameNetwork {
            actor,
            name,
            new_name,
        } => AdminResponse::done(
            core.networks.rename(&actor, &name, &new_name),
            format!("Renamed {} to {}", name, new_name),
        ),

        AdminCommand::ChangePassword {
            actor,
            name,
            password,
        } => AdminResponse::from_outcome(
            core.networks.change_password(&actor, &name, &password),
            |update| AdminResponse::Ok {
                message: update
                    .advisory()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Updated the password for {}", name)),
            },
        ),

        AdminCommand::SetPasswordEnabled {
            actor,
            name,
            enabled,
        } => AdminResponse::done(
            core.networks.set_password_enabled(&actor, &name, enabled),
            format!(
                "Password access {} for {}",
                if enabled { "enabled" } else { "disabled" },
                name
            ),
        ),

        AdminCommand::Invite {
            actor,
            name,
            player,
        } => AdminResponse::done(
            core.networks.invite(&actor, &name, player),
            format!("Invited {} to {}", player, name),
        ),

        AdminCommand::Uninvite {
            actor,
            name,
            player,
        } => AdminResponse::done(
            core.networks.uninvite(&actor, &name, player),
            format!("Revoked the invite of {} to {}", player, name),
        ),

        AdminCommand::Accept {
            actor,
            name,
            password,
        } => AdminResponse::done(
            core.networks.accept(&actor, &name, password.as_deref()),
            format!("Joined {}", name),
        ),

        AdminCommand::Deny { actor, name } => AdminResponse::done(
            core.networks.deny(&actor, &name),
            format!("Declined the invite to {}", name),
        ),

        AdminCommand::Pending { actor } => AdminResponse::List {
            items: core.networks.pending(&actor),
        },

        AdminCommand::Leave { actor, name } => AdminResponse::done(
            core.networks.leave(&actor, &name),
            format!("Left {}", name),
        ),

        AdminCommand::Kick {
            actor,
            name,
            player,
        } => AdminResponse::done(
            core.networks.kick(&actor, &name, player),
            format!("Kicked {} from {}", player, name),
        ),

        AdminCommand::Grant {
            actor,
            name,
            player,
            permission,
        } => AdminResponse::done(
            core.networks.grant(&actor, &name, player, permission),
            format!("Granted {} to {}", permission, player),
        ),

        AdminCommand::Revoke {
            actor,
            name,
            player,
            permission,
        } => AdminResponse::done(
            core.networks.revoke(&actor, &name, player, permission),
            format!("Revoked {} from {}", permission, player),
        ),

        AdminCommand::ListNetworks { actor, player } => {
            AdminResponse::from_outcome(core.networks.list(&actor, player), |networks| {
                AdminResponse::Networks { networks }
            })
        }

        AdminCommand::ShowNetwork { name } => {
            AdminResponse::from_outcome(core.networks.show(&name), |network| {
                AdminResponse::Network { network }
            })
        }

        AdminCommand::CreateAcid {
            actor,
            name,
            location,
        } => AdminResponse::from_outcome(core.acid.create(&actor, &name, location), |placed| {
            AdminResponse::Acid {
                blocks: vec![placed.acid],
                hazards: placed.hazards,
            }
        }),

        AdminCommand::LookupAcid { location } => {
            AdminResponse::from_outcome(core.acid.lookup(&location), |report| {
                AdminResponse::AcidInfo {
                    info: AcidInfo {
                        acid: report.acid,
                        network: report.network,
                        mature: report.mature,
                        matures_in_secs: report.matures_in.as_secs(),
                        expires_in_secs: report.expires_in.as_secs(),
                        hazards: report.hazards,
                    },
                }
            })
        }

        AdminCommand::ListAcid { actor, name } => {
            AdminResponse::from_outcome(core.acid.list_by_network(&actor, &name), |blocks| {
                AdminResponse::Acid {
                    blocks,
                    hazards: Vec::new(),
                }
            })
        }

        AdminCommand::NearbyAcid { actor, location } => {
            AdminResponse::from_outcome(core.acid.list_nearby(&actor, &location), |blocks| {
                AdminResponse::Acid {
                    blocks,
                    hazards: Vec::new(),
                }
            })
        }

        AdminCommand::RemoveAcid { actor, location } => {
            AdminResponse::from_outcome(core.acid.remove(&actor, &location), |acid| {
                AdminResponse::Ok {
                    message: format!("Removed {}", acid),
                }
            })
        }

        AdminCommand::DamageAcid { location, amount } => {
            AdminResponse::from_outcome(core.acid.add_damage(&location, amount), |total| {
                AdminResponse::Count {
                    value: u64::from(total),
                }
            })
        }

        AdminCommand::PlaceBastion {
            actor,
            name,
            location,
        } => AdminResponse::from_outcome(core.bastions.place(&actor, &name, location), |bastion| {
            AdminResponse::Bastions {
                bastions: vec![bastion],
            }
        }),

        AdminCommand::RemoveBastion { actor, location } => {
            AdminResponse::from_outcome(core.bastions.remove(&actor, &location), |bastion| {
                AdminResponse::Ok {
                    message: format!("Removed {}", bastion),
                }
            })
        }

        AdminCommand::ListBastions { name } => {
            AdminResponse::from_outcome(core.bastions.owned_by(&name), |bastions| {
                AdminResponse::Bastions { bastions }
            })
        }

        AdminCommand::BastionsInRange {
            location,
            radius,
            flat,
        } => AdminResponse::Bastions {
            bastions: if flat {
                core.bastions.in_range_flat(&location, radius)
            } else {
                core.bastions.in_range(&location, radius)
            },
        },

        AdminCommand::BlockRemoved { location } => AdminResponse::Bool {
            value: core.delete_at(&location),
        },

        AdminCommand::ChunkUnload { chunk } => AdminResponse::Bool {
            value: core.vetoes_chunk_unload(&chunk),
        },

        AdminCommand::PistonMove { blocks } => AdminResponse::Bool {
            value: core.vetoes_piston(&blocks),
        },

        AdminCommand::Sweep => {
            let report = core.sweep();
            AdminResponse::Ok {
                message: format!(
                    "Swept {} acid blocks, {} networks, {} invites",
                    report.expired_acid, report.expired_networks, report.invites
                ),
            }
        }

        AdminCommand::Save => {
            core.save_all();
            AdminResponse::Ok {
                message: "Save queued".to_string(),
            }
        }

        AdminCommand::Ping => AdminResponse::Pong,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::LogBroadcaster;
    use crate::clock::ManualClock;
    use crate::config::RampartConfig;
    use crate::node::RampartNode;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn parse_commands() {
        let cmd: AdminCommand = serde_json::from_value(json!({
            "cmd": "accept",
            "actor": { "id": "00000000000000000000000000000001", "name": "bob" },
            "name": "Red"
        }))
        .unwrap();
        assert!(matches!(cmd, AdminCommand::Accept { password: None, .. }));

        let cmd: AdminCommand = serde_json::from_value(json!({
            "cmd": "chunk_unload",
            "chunk": { "world": "world", "x": 0, "z": -1 }
        }))
        .unwrap();
        assert!(matches!(cmd, AdminCommand::ChunkUnload { .. }));

        assert!(serde_json::from_str::<AdminCommand>(r#"{"cmd":"explode"}"#).is_err());
    }

    #[test]
    fn responses_are_tagged() {
        let json = serde_json::to_value(AdminResponse::Bool { value: true }).unwrap();
        assert_eq!(json, json!({ "status": "bool", "value": true }));
        let json = serde_json::to_value(AdminResponse::Pong).unwrap();
        assert_eq!(json, json!({ "status": "pong" }));
    }

    async fn request(stream: &mut BufReader<UnixStream>, body: Value) -> Value {
        let line = body.to_string() + "\n";
        stream.get_mut().write_all(line.as_bytes()).await.unwrap();
        let mut reply = String::new();
        stream.read_line(&mut reply).await.unwrap();
        serde_json::from_str(&reply).unwrap()
    }

    #[tokio::test]
    async fn socket_session() {
        let dir = tempdir().unwrap();
        let config = RampartConfig {
            data_dir: dir.path().to_path_buf(),
            admin_socket: dir.path().join("admin.sock"),
            ..RampartConfig::default()
        };
        let socket_path = config.admin_socket.clone();
        let node = RampartNode::with_collaborators(
            config,
            Arc::new(LogBroadcaster),
            Arc::new(ManualClock::starting_at(1_000)),
        )
        .unwrap();
        let handle = node.handle();
        let running = tokio::spawn(node.run());

        let mut stream = None;
        for _ in 0..100 {
            if let Ok(s) = UnixStream::connect(&socket_path).await {
                stream = Some(s);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let mut stream = BufReader::new(stream.expect("admin socket never came up"));

        let alice = json!({ "id": "000000000000000000000000000000aa", "name": "alice" });
        let here = json!({ "world": "world", "x": 10, "y": 64, "z": 10 });

        assert_eq!(request(&mut stream, json!({ "cmd": "ping" })).await["status"], "pong");

        let reply = request(
            &mut stream,
            json!({ "cmd": "create_network", "actor": alice, "name": "Red" }),
        )
        .await;
        assert_eq!(reply["status"], "ok");

        let reply = request(
            &mut stream,
            json!({ "cmd": "create_acid", "actor": alice, "name": "Red", "location": here }),
        )
        .await;
        assert_eq!(reply["status"], "acid");
        assert_eq!(reply["blocks"].as_array().unwrap().len(), 1);

        let reply = request(&mut stream, json!({ "cmd": "lookup_acid", "location": here })).await;
        assert_eq!(reply["info"]["network"], "Red");
        assert_eq!(reply["info"]["mature"], false);

        let reply = request(
            &mut stream,
            json!({ "cmd": "chunk_unload", "chunk": { "world": "world", "x": 0, "z": 0 } }),
        )
        .await;
        assert_eq!(reply["value"], true);

        let reply = request(
            &mut stream,
            json!({ "cmd": "delete_network", "actor": alice, "name": "Red" }),
        )
        .await;
        assert_eq!(reply["status"], "ok");

        let reply = request(&mut stream, json!({ "cmd": "show_network", "name": "Red" })).await;
        assert_eq!(reply, json!({ "status": "error", "error": "Network not found" }));

        let reply = request(&mut stream, json!({ "cmd": "bogus" })).await;
        assert_eq!(reply["status"], "error");

        handle.shutdown().await.unwrap();
        running.await.unwrap().unwrap();
    }
}
