//! Rampart - territorial claims and grief protection
//!
//! Players form networks, which place protective bastions and timed, weak
//! acid blocks in a persistent world. This crate is the core that keeps
//! those claims consistent: in-memory repositories, spatial queries, the
//! membership and permission rules, claim maturation and expiry, cascading
//! deletes and background persistence.
//!
//! # Architecture
//!
//! - **Models**: Networks, bastions, acid blocks and permissions
//! - **Repository / Spatial**: Concurrent entity sets and location queries
//! - **Networks / Claims**: Caller-facing operations returning [`Outcome`]
//! - **Cascade**: Cross-repository deletes
//! - **Gateway / Storage**: RocksDB persistence on blocking workers
//! - **Node / Admin Socket**: Process runtime and local admin interface
//!
//! # Example
//!
//! ```no_run
//! use rampart::{RampartConfig, RampartNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let node = RampartNode::new(RampartConfig::from_env()?)?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod broadcast;
pub mod cascade;
pub mod claims;
pub mod clock;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod gateway;
pub mod ids;
pub mod models;
pub mod networks;
pub mod node;
pub mod policy;
pub mod promise;
pub mod rampart;
pub mod repository;
pub mod spatial;
pub mod state;
pub mod storage;

pub use broadcast::{Broadcaster, LogBroadcaster, Notice, RecordingBroadcaster};
pub use cascade::CascadeReport;
pub use claims::{AcidPlacement, AcidReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RampartConfig;
pub use error::{Error, Result};
pub use ids::{ClaimId, NetworkId, PlayerId};
pub use models::{AcidBlock, Bastion, Network, NetworkMember, Permission, PermissionSet};
pub use networks::NetworkSummary;
pub use node::{NodeHandle, RampartNode};
pub use policy::Actor;
pub use promise::{callbacks, reject, Outcome, Promise, Rejection, Resolve};
pub use rampart::{Rampart, SweepReport};
pub use repository::Repository;
pub use spatial::Claim;
pub use state::Stores;
pub use storage::{EntityStore, Storage};

pub use rampart_geo::{BlockLocation, ChunkCoord};
