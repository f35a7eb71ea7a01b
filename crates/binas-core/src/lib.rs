//! # Binas Core - Foundation
//!
//! Domain types, the unified error type, configuration and the interfaces of
//! the external collaborators (directory, station RPC) shared by every other
//! Binas crate.
//!
//! ## What's NOT in this crate
//!
//! - Station inventory logic (`binas-station`)
//! - Quorum replication (`binas-quorum`)
//! - Rental orchestration (`binas-rental`)

#![forbid(unsafe_code)]

/// Configuration loading and validation
pub mod config;

/// Directory and station client traits
pub mod effects;

/// Unified error handling
pub mod errors;

/// Shared domain types
pub mod types;

pub use config::{BinasConfig, QuorumConfig, StationDefaults};
pub use effects::{Directory, StationClient, StationConnector};
pub use errors::{BinasError, ErrorKind, Result};
pub use types::{
    BalanceView, Coordinates, DirectoryRecord, Email, StationView, Tag, UNKNOWN_TAG,
};
