//! Interfaces to the collaborators Binas consumes but does not own.
//!
//! The directory resolves a name prefix to station endpoints, the connector
//! turns an endpoint into a typed client, and the client is the per-station
//! RPC surface. Implementations live in `binas-station` (in-process stations)
//! and `binas-testkit` (fault-injecting network).

use crate::errors::Result;
use crate::types::{BalanceView, DirectoryRecord, Email, StationView};
use async_trait::async_trait;
use std::sync::Arc;

/// Service-discovery lookup
#[async_trait]
pub trait Directory: Send + Sync {
    /// List every record whose organization name starts with `prefix`,
    /// ordered by organization name.
    ///
    /// Best effort: entries that cannot be resolved are left out silently.
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<DirectoryRecord>>;
}

/// Creates station clients for directory records
#[async_trait]
pub trait StationConnector: Send + Sync {
    /// Open a client for `record`, failing with `Unreachable`.
    async fn connect(&self, record: &DirectoryRecord) -> Result<Arc<dyn StationClient>>;
}

/// Per-station RPC surface.
///
/// Any call may fail with `Unreachable`; callers exclude that station and
/// carry on.
#[async_trait]
pub trait StationClient: Send + Sync {
    /// Inventory snapshot
    async fn get_info(&self) -> Result<StationView>;

    /// Hand out one bina, failing with `NoBinaAvailable`
    async fn get_bina(&self) -> Result<()>;

    /// Dock one bina and return the bonus, failing with `NoSlotAvailable`
    async fn return_bina(&self) -> Result<i64>;

    /// Stored balance for `email`, failing with `UnknownUser`
    async fn get_balance(&self, email: &Email) -> Result<BalanceView>;

    /// Store `(credit, tag)` for `email`, failing with `InvalidCredit`
    async fn set_balance(&self, email: &Email, credit: i64, tag: i64) -> Result<()>;

    /// Reinitialize position, capacity and bonus, failing with `BadInit`
    async fn test_init(&self, x: i64, y: i64, capacity: i64, return_bonus: i64) -> Result<()>;

    /// Restore defaults and forget every balance
    async fn test_clear(&self) -> Result<()>;

    /// Liveness check
    async fn test_ping(&self, message: &str) -> Result<String>;
}
