//! Station discovery through the directory

use crate::balance::BalanceReplica;
use crate::replica::{ReplicaDiscovery, ReplicaSetSnapshot, ReplicaSlot};
use async_trait::async_trait;
use binas_core::{Directory, DirectoryRecord, Result, StationClient, StationConnector};
use futures::future::join_all;
use std::sync::Arc;

/// Resolves every station registered under a name prefix.
///
/// Each call goes back to the directory; nothing is cached between
/// operations, so membership can change from one operation to the next.
#[derive(Clone)]
pub struct StationDiscovery {
    directory: Arc<dyn Directory>,
    connector: Arc<dyn StationConnector>,
    prefix: String,
}

impl StationDiscovery {
    /// Discover stations named `prefix*`
    pub fn new(
        directory: Arc<dyn Directory>,
        connector: Arc<dyn StationConnector>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            connector,
            prefix: prefix.into(),
        }
    }

    /// Name prefix searched in the directory
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Directory records under the prefix.
    ///
    /// A failing directory yields an empty list; downstream that surfaces as
    /// `StationNotFound` or `QuorumUnreachable`.
    pub async fn records(&self) -> Vec<DirectoryRecord> {
        match self.directory.list_by_prefix(&self.prefix).await {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!(prefix = %self.prefix, error = %error, "Directory lookup failed");
                Vec::new()
            }
        }
    }

    /// Connect to every discovered station concurrently, keeping directory
    /// order. Failed connections are returned alongside their record.
    pub async fn connect_all(&self) -> Vec<(DirectoryRecord, Result<Arc<dyn StationClient>>)> {
        let records = self.records().await;
        let clients = join_all(records.iter().map(|record| self.connector.connect(record))).await;
        records.into_iter().zip(clients).collect()
    }
}

impl std::fmt::Debug for StationDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationDiscovery")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReplicaDiscovery for StationDiscovery {
    type Replica = BalanceReplica;

    async fn discover(&self) -> Result<ReplicaSetSnapshot<BalanceReplica>> {
        let members: Vec<_> = self
            .connect_all()
            .await
            .into_iter()
            .map(|(record, client)| match client {
                Ok(client) => ReplicaSlot::Ready(BalanceReplica::new(record.org_name, client)),
                Err(error) => {
                    tracing::debug!(replica = %record.org_name, error = %error, "Replica not connectable");
                    ReplicaSlot::Faulted {
                        replica: record.org_name,
                        error,
                    }
                }
            })
            .collect();
        tracing::debug!(prefix = %self.prefix, replicas = members.len(), "Discovered replicas");
        Ok(ReplicaSetSnapshot::new(members))
    }
}
