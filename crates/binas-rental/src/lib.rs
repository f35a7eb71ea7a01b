//! # Binas Rental - Users and Rentals
//!
//! The user-facing side of Binas: a registry of users with per-user locks and
//! the coordinator that turns rent/return requests into one station
//! inventory call plus one quorum write of the user's credit.
//!
//! - **user**: the user record and its rental state checks
//! - **store**: process-wide user registry with an explicit init/reset lifecycle
//! - **coordinator**: rent/return, station lookup and station administration

#![forbid(unsafe_code)]

pub mod coordinator;
pub mod store;
pub mod user;

pub use coordinator::{RentalCoordinator, StationHandle};
pub use store::{UserEntry, UserStore};
pub use user::{RentalState, User};
