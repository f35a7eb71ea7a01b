//! Unified error type for Binas operations
//!
//! Every failure a station, the quorum register or the rental coordinator can
//! report is a variant of [`BinasError`]. Variants are grouped into the coarse
//! [`ErrorKind`] taxonomy so callers can branch on the class of failure
//! without matching every variant.

use serde::{Deserialize, Serialize};

/// Coarse classification of a [`BinasError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A user or station does not exist
    NotFound,
    /// The user is in the wrong rental state for the operation
    InvalidState,
    /// The user cannot pay for a rental
    InsufficientCredits,
    /// The station has no bina to hand out or no free dock
    CapacityExceeded,
    /// Malformed or out-of-range input
    InvalidInput,
    /// A single replica could not be reached
    Unreachable,
    /// Fewer than a majority of discovered replicas answered in time
    QuorumUnreachable,
    /// Configuration could not be loaded or is invalid
    Configuration,
}

/// Unified error type for all Binas operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum BinasError {
    /// No registered user with this email
    #[error("User not found: {email}")]
    UserNotFound {
        /// Email that was looked up
        email: String,
    },

    /// No reachable station reports this identifier
    #[error("Station not found: {station_id}")]
    StationNotFound {
        /// Station identifier that was looked up
        station_id: String,
    },

    /// A user with this email is already registered
    #[error("User already exists: {email}")]
    UserAlreadyExists {
        /// Duplicate email
        email: String,
    },

    /// The email does not have a valid `local@domain` shape
    #[error("Invalid email: {email:?}")]
    InvalidEmail {
        /// Rejected input
        email: String,
    },

    /// Rent requested while the user already holds a bina
    #[error("User {email} already has a bina")]
    AlreadyHasBina {
        /// User holding the bina
        email: String,
    },

    /// Return requested while the user holds no bina
    #[error("User {email} has no bina")]
    HasNoBina {
        /// User without a bina
        email: String,
    },

    /// The user's credit is below the rental price
    #[error("Insufficient credits for {email}: have {credit}")]
    InsufficientCredits {
        /// User attempting to rent
        email: String,
        /// Credit observed through the quorum read
        credit: i64,
    },

    /// The station has no bina available
    #[error("No bina available at station {station_id}")]
    NoBinaAvailable {
        /// Station that was asked
        station_id: String,
    },

    /// The station has no free dock
    #[error("No slot available at station {station_id}")]
    NoSlotAvailable {
        /// Station that was asked
        station_id: String,
    },

    /// Rejected initialization values
    #[error("Bad init: {message}")]
    BadInit {
        /// Which value was rejected
        message: String,
    },

    /// A replica refused a negative credit
    #[error("Invalid credit {credit}")]
    InvalidCredit {
        /// Rejected credit value
        credit: i64,
    },

    /// A replica holds no balance record for this email
    #[error("Unknown user at replica: {email}")]
    UnknownUser {
        /// Email the replica did not know
        email: String,
    },

    /// Transport-level failure talking to one replica
    #[error("Replica {replica} unreachable: {message}")]
    Unreachable {
        /// Replica name as registered in the directory
        replica: String,
        /// Transport failure detail
        message: String,
    },

    /// Fewer than a majority of discovered replicas answered in time
    #[error("Quorum unreachable: {responded}/{quorum} responses from {discovered} replicas")]
    QuorumUnreachable {
        /// Replicas returned by discovery
        discovered: usize,
        /// Responses required
        quorum: usize,
        /// Responses received before giving up
        responded: usize,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },
}

impl BinasError {
    /// Create a user-not-found error
    pub fn user_not_found(email: impl Into<String>) -> Self {
        Self::UserNotFound {
            email: email.into(),
        }
    }

    /// Create a station-not-found error
    pub fn station_not_found(station_id: impl Into<String>) -> Self {
        Self::StationNotFound {
            station_id: station_id.into(),
        }
    }

    /// Create a bad-init error
    pub fn bad_init(message: impl Into<String>) -> Self {
        Self::BadInit {
            message: message.into(),
        }
    }

    /// Create an unreachable-replica error
    pub fn unreachable(replica: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            replica: replica.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Taxonomy class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound { .. } | Self::StationNotFound { .. } | Self::UnknownUser { .. } => {
                ErrorKind::NotFound
            }
            Self::AlreadyHasBina { .. } | Self::HasNoBina { .. } => ErrorKind::InvalidState,
            Self::InsufficientCredits { .. } => ErrorKind::InsufficientCredits,
            Self::NoBinaAvailable { .. } | Self::NoSlotAvailable { .. } => {
                ErrorKind::CapacityExceeded
            }
            Self::UserAlreadyExists { .. }
            | Self::InvalidEmail { .. }
            | Self::BadInit { .. }
            | Self::InvalidCredit { .. } => ErrorKind::InvalidInput,
            Self::Unreachable { .. } => ErrorKind::Unreachable,
            Self::QuorumUnreachable { .. } => ErrorKind::QuorumUnreachable,
            Self::Config { .. } => ErrorKind::Configuration,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound { .. } => "user_not_found",
            Self::StationNotFound { .. } => "station_not_found",
            Self::UserAlreadyExists { .. } => "user_already_exists",
            Self::InvalidEmail { .. } => "invalid_email",
            Self::AlreadyHasBina { .. } => "already_has_bina",
            Self::HasNoBina { .. } => "has_no_bina",
            Self::InsufficientCredits { .. } => "insufficient_credits",
            Self::NoBinaAvailable { .. } => "no_bina_available",
            Self::NoSlotAvailable { .. } => "no_slot_available",
            Self::BadInit { .. } => "bad_init",
            Self::InvalidCredit { .. } => "invalid_credit",
            Self::UnknownUser { .. } => "unknown_user",
            Self::Unreachable { .. } => "unreachable",
            Self::QuorumUnreachable { .. } => "quorum_unreachable",
            Self::Config { .. } => "config",
        }
    }

    /// True for failures local to one replica.
    ///
    /// The quorum layer excludes these from the response count and keeps
    /// going; they never abort an operation on their own.
    pub fn is_replica_fault(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::UnknownUser { .. } | Self::InvalidCredit { .. }
        )
    }
}

/// Standard Result type for Binas operations
pub type Result<T> = std::result::Result<T, BinasError>;

impl From<toml::de::Error> for BinasError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_variants() -> Vec<BinasError> {
        vec![
            BinasError::user_not_found("a@b"),
            BinasError::station_not_found("S1"),
            BinasError::UserAlreadyExists {
                email: "a@b".into(),
            },
            BinasError::InvalidEmail { email: "x".into() },
            BinasError::AlreadyHasBina {
                email: "a@b".into(),
            },
            BinasError::HasNoBina {
                email: "a@b".into(),
            },
            BinasError::InsufficientCredits {
                email: "a@b".into(),
                credit: 0,
            },
            BinasError::NoBinaAvailable {
                station_id: "S1".into(),
            },
            BinasError::NoSlotAvailable {
                station_id: "S1".into(),
            },
            BinasError::bad_init("capacity"),
            BinasError::InvalidCredit { credit: -1 },
            BinasError::UnknownUser {
                email: "a@b".into(),
            },
            BinasError::unreachable("S1", "refused"),
            BinasError::QuorumUnreachable {
                discovered: 3,
                quorum: 2,
                responded: 1,
            },
            BinasError::config("bad"),
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: HashSet<_> = errors.iter().map(BinasError::code).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn only_single_replica_failures_are_replica_faults() {
        let faults: Vec<_> = all_variants()
            .into_iter()
            .filter(BinasError::is_replica_fault)
            .map(|e| e.code())
            .collect();
        assert_eq!(faults, vec!["invalid_credit", "unknown_user", "unreachable"]);
    }

    #[test]
    fn rental_errors_map_to_taxonomy() {
        assert_eq!(
            BinasError::AlreadyHasBina {
                email: "a@b".into()
            }
            .kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            BinasError::NoSlotAvailable {
                station_id: "S1".into()
            }
            .kind(),
            ErrorKind::CapacityExceeded
        );
        assert_eq!(BinasError::bad_init("x").kind(), ErrorKind::InvalidInput);
    }
}
