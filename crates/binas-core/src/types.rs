//! Shared domain types exchanged between stations, the quorum register and
//! the rental coordinator.

use crate::errors::{BinasError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version number attached to a replicated balance.
pub type Tag = i64;

/// Tag reported for a user a replica has never stored.
///
/// Lower than any tag a real write can assign, since writes start at
/// `UNKNOWN_TAG + 1 == 0`.
pub const UNKNOWN_TAG: Tag = -1;

/// Validated user email, the key of every per-user record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Parse and validate an email of the form `local@domain`.
    ///
    /// Both halves are one or more dot-separated, non-empty ASCII
    /// alphanumeric segments (`alice.smith@tecnico.ulisboa`).
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let valid = match raw.split_once('@') {
            Some((local, domain)) => dotted_alphanumeric(local) && dotted_alphanumeric(domain),
            None => false,
        };
        if valid {
            Ok(Self(raw))
        } else {
            Err(BinasError::InvalidEmail { email: raw })
        }
    }

    /// Borrow the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn dotted_alphanumeric(part: &str) -> bool {
    !part.is_empty()
        && part
            .split('.')
            .all(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric()))
}

impl TryFrom<String> for Email {
    type Error = BinasError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user's credit as stored by one replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceView {
    /// Credit value
    pub credit: i64,
    /// Version of this value
    pub tag: Tag,
}

impl BalanceView {
    /// Create a balance record
    pub fn new(credit: i64, tag: Tag) -> Self {
        Self { credit, tag }
    }
}

/// Station position on the service grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Horizontal position
    pub x: i64,
    /// Vertical position
    pub y: i64,
}

impl Coordinates {
    /// Create a coordinate pair
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance.
    ///
    /// Exact unless it exceeds `u128::MAX`, which only opposite corners of
    /// the full `i64` plane reach; those saturate.
    pub fn distance_squared(&self, other: &Coordinates) -> u128 {
        let dx = u128::from(self.x.abs_diff(other.x));
        let dy = u128::from(self.y.abs_diff(other.y));
        (dx * dx).saturating_add(dy * dy)
    }
}

/// Snapshot of one station's inventory, as returned by `GetInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationView {
    /// Station identifier reported by the station itself
    pub id: String,
    /// Station position
    pub coordinates: Coordinates,
    /// Total number of docks
    pub capacity: i64,
    /// Binas handed out since the last init/reset
    pub total_gets: i64,
    /// Binas docked since the last init/reset
    pub total_returns: i64,
    /// Empty docks
    pub free_docks: i64,
    /// Binas ready to be rented
    pub available_binas: i64,
}

/// One entry returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Name the station registered under (matched by prefix)
    pub org_name: String,
    /// Network endpoint of the station service
    pub endpoint: String,
}

impl DirectoryRecord {
    /// Create a directory record
    pub fn new(org_name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            org_name: org_name.into(),
            endpoint: endpoint.into(),
        }
    }
}
