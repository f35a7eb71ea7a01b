//! # Binas Station
//!
//! A docking station's own state: its dock/bina inventory and its replica of
//! every user's tagged balance, plus an in-process [`StationClient`] handler
//! so the rest of the system can talk to it through the same interface used
//! for remote stations.
//!
//! [`StationClient`]: binas_core::StationClient

#![forbid(unsafe_code)]

pub mod handler;
pub mod station;

pub use handler::LocalStationClient;
pub use station::{Station, StationLayout};
