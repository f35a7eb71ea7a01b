//! # Binas Quorum - Replicated Balances
//!
//! Tag-versioned majority read/write register used to keep each user's
//! credit consistent across every station replica.
//!
//! - **replica**: replica and discovery traits, per-operation snapshots
//! - **register**: the generic quorum read/write protocol
//! - **discovery**: directory-backed station discovery
//! - **balance**: stations as replicas of the `email -> credit` register
//!
//! The register tolerates unreachable or slow replicas as long as a majority
//! of the discovered set answers before the round deadline. It does not
//! order concurrent writers; see [`register`] for the single-writer contract.

#![forbid(unsafe_code)]

pub mod balance;
pub mod discovery;
pub mod register;
pub mod replica;

pub use balance::{BalanceRegister, BalanceReplica};
pub use discovery::StationDiscovery;
pub use register::{quorum_size, QuorumRegister, QuorumResult};
pub use replica::{
    RegisterReplica, ReplicaDiscovery, ReplicaFailure, ReplicaSetSnapshot, ReplicaSlot, Versioned,
};
