//! Per-user credit balance as a quorum register over station replicas

use crate::discovery::StationDiscovery;
use crate::register::{QuorumRegister, QuorumResult};
use crate::replica::{RegisterReplica, Versioned};
use async_trait::async_trait;
use binas_core::{BinasError, Email, Result, StationClient, Tag};
use std::sync::Arc;

/// A station viewed as one replica of the `email -> credit` register.
#[derive(Clone)]
pub struct BalanceReplica {
    name: String,
    client: Arc<dyn StationClient>,
}

impl BalanceReplica {
    /// Wrap the client of the station registered as `name`
    pub fn new(name: impl Into<String>, client: Arc<dyn StationClient>) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }
}

impl std::fmt::Debug for BalanceReplica {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceReplica")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RegisterReplica for BalanceReplica {
    type Key = Email;
    type Value = i64;

    fn replica_id(&self) -> &str {
        &self.name
    }

    async fn read(&self, email: &Email) -> Result<Versioned<i64>> {
        match self.client.get_balance(email).await {
            Ok(balance) => Ok(Versioned::new(balance.credit, balance.tag)),
            // A replica that never saw this user still answers, below any real tag
            Err(BinasError::UnknownUser { .. }) => Ok(Versioned::absent()),
            Err(error) => Err(error),
        }
    }

    async fn write(&self, email: &Email, credit: &i64, tag: Tag) -> Result<()> {
        self.client.set_balance(email, *credit, tag).await
    }
}

/// Credit register used by the rental coordinator
pub type BalanceRegister = QuorumRegister<StationDiscovery>;

impl QuorumRegister<StationDiscovery> {
    /// Quorum-read a user's credit
    pub async fn read_credit(&self, email: &Email) -> Result<QuorumResult<i64>> {
        self.read(email).await
    }

    /// Quorum-write a user's credit.
    ///
    /// A negative credit is rejected before any replica is contacted.
    pub async fn write_credit(&self, email: &Email, credit: i64) -> Result<QuorumResult<i64>> {
        if credit < 0 {
            return Err(BinasError::InvalidCredit { credit });
        }
        self.write(email, credit).await
    }
}
