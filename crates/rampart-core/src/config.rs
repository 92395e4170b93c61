//! Node configuration.
//!
//! The core only ever reads a [`RampartConfig`]; it is built once (from the
//! environment or in code) and shared behind an `Arc`.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for a Rampart node.
#[derive(Debug, Clone)]
pub struct RampartConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// Admin socket path
    pub admin_socket: PathBuf,

    /// Shortest allowed network name
    pub min_name_len: usize,

    /// Longest allowed network name
    pub max_name_len: usize,

    /// Names nobody may take, compared case-insensitively
    pub banned_names: Vec<String>,

    /// Shortest allowed network password
    pub min_password_len: usize,

    /// Longest allowed network password
    pub max_password_len: usize,

    /// Members allowed in one network
    pub max_members: usize,

    /// Networks one player may belong to
    pub max_joined_networks: usize,

    /// Wait between renames by the same player
    pub rename_cooldown: Duration,

    /// Wait between network creations by the same player
    pub create_cooldown: Duration,

    /// Networks with no activity for this long are disbanded by the sweep
    pub network_inactive_expire: Duration,

    /// Pending invites older than this can no longer be accepted
    pub invite_lifetime: Duration,

    /// Time from placement until an acid block matures
    pub acid_mature: Duration,

    /// Time from placement until an acid block expires
    pub acid_expire: Duration,

    /// Time from placement until a bastion matures
    pub bastion_mature: Duration,

    /// Radius a bastion protects
    pub bastion_radius: f64,

    /// Radius searched when listing a player's nearby acid blocks
    pub nearby_radius: f64,

    /// Period of the expiry sweep
    pub sweep_interval: Duration,

    /// Concurrent storage writes
    pub persistence_workers: usize,
}

impl Default for RampartConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("./rampart-data");
        Self {
            admin_socket: data_dir.join("admin.sock"),
            data_dir,
            min_name_len: 3,
            max_name_len: 16,
            banned_names: vec!["ADMIN".into(), "STAFF".into(), "SERVER".into()],
            min_password_len: 4,
            max_password_len: 32,
            max_members: 50,
            max_joined_networks: 5,
            rename_cooldown: Duration::from_secs(30 * 60),
            create_cooldown: Duration::from_secs(60),
            network_inactive_expire: Duration::from_secs(30 * 24 * 3_600),
            invite_lifetime: Duration::from_secs(24 * 3_600),
            acid_mature: Duration::from_secs(4 * 3_600),
            acid_expire: Duration::from_secs(24 * 3_600),
            bastion_mature: Duration::from_secs(6 * 3_600),
            bastion_radius: 16.0,
            nearby_radius: 64.0,
            sweep_interval: Duration::from_secs(60),
            persistence_workers: 4,
        }
    }
}

impl RampartConfig {
    /// Create config from `RAMPART_*` environment variables, falling back to
    /// [`Default`] for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let data_dir = std::env::var("RAMPART_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let admin_socket = std::env::var("RAMPART_ADMIN_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("admin.sock"));

        let banned_names = std::env::var("RAMPART_BANNED_NAMES")
            .map(|s| {
                s.split(',')
                    .map(|n| n.trim().to_uppercase())
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.banned_names);

        let config = Self {
            data_dir,
            admin_socket,
            min_name_len: env_or("RAMPART_MIN_NAME_LEN", defaults.min_name_len)?,
            max_name_len: env_or("RAMPART_MAX_NAME_LEN", defaults.max_name_len)?,
            banned_names,
            min_password_len: env_or("RAMPART_MIN_PASSWORD_LEN", defaults.min_password_len)?,
            max_password_len: env_or("RAMPART_MAX_PASSWORD_LEN", defaults.max_password_len)?,
            max_members: env_or("RAMPART_MAX_MEMBERS", defaults.max_members)?,
            max_joined_networks: env_or(
                "RAMPART_MAX_JOINED_NETWORKS",
                defaults.max_joined_networks,
            )?,
            rename_cooldown: env_secs("RAMPART_RENAME_COOLDOWN", defaults.rename_cooldown)?,
            create_cooldown: env_secs("RAMPART_CREATE_COOLDOWN", defaults.create_cooldown)?,
            network_inactive_expire: env_secs(
                "RAMPART_NETWORK_INACTIVE_EXPIRE",
                defaults.network_inactive_expire,
            )?,
            invite_lifetime: env_secs("RAMPART_INVITE_LIFETIME", defaults.invite_lifetime)?,
            acid_mature: env_secs("RAMPART_ACID_MATURE", defaults.acid_mature)?,
            acid_expire: env_secs("RAMPART_ACID_EXPIRE", defaults.acid_expire)?,
            bastion_mature: env_secs("RAMPART_BASTION_MATURE", defaults.bastion_mature)?,
            bastion_radius: env_or("RAMPART_BASTION_RADIUS", defaults.bastion_radius)?,
            nearby_radius: env_or("RAMPART_NEARBY_RADIUS", defaults.nearby_radius)?,
            sweep_interval: env_secs("RAMPART_SWEEP_INTERVAL", defaults.sweep_interval)?,
            persistence_workers: env_or(
                "RAMPART_PERSISTENCE_WORKERS",
                defaults.persistence_workers,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the relationships between values that the core depends on.
    pub fn validate(&self) -> Result<()> {
        if self.min_name_len == 0 || self.min_name_len > self.max_name_len {
            return Err(Error::Config(format!(
                "name length bounds {}..={} are invalid",
                self.min_name_len, self.max_name_len
            )));
        }
        if self.min_password_len == 0 || self.min_password_len > self.max_password_len {
            return Err(Error::Config(format!(
                "password length bounds {}..={} are invalid",
                self.min_password_len, self.max_password_len
            )));
        }
        if self.acid_expire <= self.acid_mature {
            return Err(Error::Config(format!(
                "acid expiration ({:?}) must be later than maturation ({:?})",
                self.acid_expire, self.acid_mature
            )));
        }
        if !(self.bastion_radius >= 0.0 && self.nearby_radius >= 0.0) {
            return Err(Error::Config("radii must be non-negative".into()));
        }
        if self.persistence_workers == 0 {
            return Err(Error::Config("persistence_workers must be at least 1".into()));
        }
        if self.sweep_interval.is_zero() {
            return Err(Error::Config("sweep_interval must be non-zero".into()));
        }
        Ok(())
    }

    /// True if `name` is on the denylist.
    pub fn is_banned_name(&self, name: &str) -> bool {
        self.banned_names
            .iter()
            .any(|banned| banned.eq_ignore_ascii_case(name))
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("invalid {key}: {raw:?}"))),
        Err(_) => Ok(default),
    }
}

fn env_secs(key: &str, default: Duration) -> Result<Duration> {
    env_or(key, default.as_secs()).map(Duration::from_secs)
}
