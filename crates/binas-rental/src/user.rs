//! Registered users and their rental state

use binas_core::{BinasError, Email, Result};
use serde::{Deserialize, Serialize};

/// Whether a user currently holds a bina.
///
/// The transient renting and returning phases exist only while the user's
/// lock is held and are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentalState {
    /// Free to rent
    NoBina,
    /// Must return before renting again
    HasBina,
}

/// A registered user with their last-known credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique key
    pub email: Email,
    /// Credit after the last successful quorum write
    pub credit: i64,
    /// Rental state
    pub has_bina: bool,
}

impl User {
    /// New user without a bina
    pub fn new(email: Email, credit: i64) -> Self {
        Self {
            email,
            credit,
            has_bina: false,
        }
    }

    /// Current rental state
    pub fn state(&self) -> RentalState {
        if self.has_bina {
            RentalState::HasBina
        } else {
            RentalState::NoBina
        }
    }

    /// Fail with `AlreadyHasBina` unless the user can rent
    pub fn validate_can_rent(&self) -> Result<()> {
        match self.state() {
            RentalState::NoBina => Ok(()),
            RentalState::HasBina => Err(BinasError::AlreadyHasBina {
                email: self.email.to_string(),
            }),
        }
    }

    /// Fail with `HasNoBina` unless the user can return
    pub fn validate_can_return(&self) -> Result<()> {
        match self.state() {
            RentalState::HasBina => Ok(()),
            RentalState::NoBina => Err(BinasError::HasNoBina {
                email: self.email.to_string(),
            }),
        }
    }
}
