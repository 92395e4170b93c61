//! Entity models for Rampart.
//!
//! # Core Types
//!
//! - [`Network`] - Player-formed ownership group
//! - [`Bastion`] - Protective claim that matures over time
//! - [`AcidBlock`] - Timed weak claim with maturation, expiration and damage
//!
//! # Supporting Types
//!
//! - [`NetworkMember`] - Membership record with permissions
//! - [`Permission`] / [`PermissionSet`] - Member capabilities

mod acid;
mod bastion;
mod network;
mod permission;

pub use acid::AcidBlock;
pub use bastion::Bastion;
pub use network::{hash_password, Network, NetworkMember, NetworkSettings};
pub use permission::{Permission, PermissionSet};
