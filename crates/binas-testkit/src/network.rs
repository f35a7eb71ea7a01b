//! In-memory station network
//!
//! Plays both external collaborators at once: the directory (records listed
//! by prefix) and the transport (clients for those records). Every station
//! carries a [`Fault`] that can be flipped at any time, including while a
//! quorum round is in flight.

use async_trait::async_trait;
use binas_core::{
    BalanceView, BinasError, Directory, DirectoryRecord, Email, Result, StationClient,
    StationConnector, StationView,
};
use binas_station::{LocalStationClient, Station};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Injected transport behaviour for one station
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fault {
    /// Calls go through
    #[default]
    None,
    /// Connects and calls fail with `Unreachable`
    Unreachable,
    /// Every call is delayed before reaching the station, and fails if the
    /// station became unreachable in the meantime
    Delay(Duration),
}

type SharedFault = Arc<RwLock<Fault>>;

#[derive(Debug)]
struct NetworkEntry {
    record: DirectoryRecord,
    station: Arc<Station>,
    fault: SharedFault,
}

/// Directory plus transport over in-process stations
#[derive(Debug, Default)]
pub struct MemoryNetwork {
    entries: RwLock<BTreeMap<String, NetworkEntry>>,
    directory_down: RwLock<bool>,
}

impl MemoryNetwork {
    /// Create an empty network
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `station` under `org_name`, replacing any previous entry
    pub fn register(&self, org_name: impl Into<String>, station: Arc<Station>) -> DirectoryRecord {
        let org_name = org_name.into();
        let record = DirectoryRecord::new(org_name.clone(), format!("mem://{org_name}"));
        self.entries.write().insert(
            org_name,
            NetworkEntry {
                record: record.clone(),
                station,
                fault: Arc::new(RwLock::new(Fault::None)),
            },
        );
        record
    }

    /// Remove a station from the directory
    pub fn unregister(&self, org_name: &str) -> Option<Arc<Station>> {
        self.entries.write().remove(org_name).map(|entry| entry.station)
    }

    /// Change a station's fault; returns false for an unknown name
    pub fn set_fault(&self, org_name: &str, fault: Fault) -> bool {
        match self.entries.read().get(org_name) {
            Some(entry) => {
                tracing::debug!(station = org_name, ?fault, "Injecting fault");
                *entry.fault.write() = fault;
                true
            }
            None => false,
        }
    }

    /// Make every directory lookup fail
    pub fn set_directory_down(&self, down: bool) {
        *self.directory_down.write() = down;
    }

    /// The station registered as `org_name`
    pub fn station(&self, org_name: &str) -> Option<Arc<Station>> {
        self.entries
            .read()
            .get(org_name)
            .map(|entry| Arc::clone(&entry.station))
    }
}

#[async_trait]
impl Directory for MemoryNetwork {
    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<DirectoryRecord>> {
        if *self.directory_down.read() {
            return Err(BinasError::unreachable("directory", "lookup refused"));
        }
        Ok(self
            .entries
            .read()
            .values()
            .filter(|entry| entry.record.org_name.starts_with(prefix))
            .map(|entry| entry.record.clone())
            .collect())
    }
}

#[async_trait]
impl StationConnector for MemoryNetwork {
    async fn connect(&self, record: &DirectoryRecord) -> Result<Arc<dyn StationClient>> {
        let entries = self.entries.read();
        let entry = entries
            .get(&record.org_name)
            .ok_or_else(|| BinasError::unreachable(&record.org_name, "no such endpoint"))?;
        if *entry.fault.read() == Fault::Unreachable {
            return Err(BinasError::unreachable(&record.org_name, "connection refused"));
        }
        Ok(Arc::new(FaultyStationClient {
            name: record.org_name.clone(),
            inner: LocalStationClient::new(Arc::clone(&entry.station)),
            fault: Arc::clone(&entry.fault),
        }))
    }
}

/// Station client that consults the station's fault before every call.
#[derive(Debug)]
pub struct FaultyStationClient {
    name: String,
    inner: LocalStationClient,
    fault: SharedFault,
}

impl FaultyStationClient {
    async fn transport(&self) -> Result<()> {
        let fault = *self.fault.read();
        match fault {
            Fault::None => Ok(()),
            Fault::Unreachable => Err(BinasError::unreachable(&self.name, "connection reset")),
            Fault::Delay(delay) => {
                tokio::time::sleep(delay).await;
                if *self.fault.read() == Fault::Unreachable {
                    return Err(BinasError::unreachable(&self.name, "connection lost"));
                }
                Ok(())
            }
        }
    }
}

#[async_trait]
impl StationClient for FaultyStationClient {
    async fn get_info(&self) -> Result<StationView> {
        self.transport().await?;
        self.inner.get_info().await
    }

    async fn get_bina(&self) -> Result<()> {
        self.transport().await?;
        self.inner.get_bina().await
    }

    async fn return_bina(&self) -> Result<i64> {
        self.transport().await?;
        self.inner.return_bina().await
    }

    async fn get_balance(&self, email: &Email) -> Result<BalanceView> {
        self.transport().await?;
        self.inner.get_balance(email).await
    }

    async fn set_balance(&self, email: &Email, credit: i64, tag: i64) -> Result<()> {
        self.transport().await?;
        self.inner.set_balance(email, credit, tag).await
    }

    async fn test_init(&self, x: i64, y: i64, capacity: i64, return_bonus: i64) -> Result<()> {
        self.transport().await?;
        self.inner.test_init(x, y, capacity, return_bonus).await
    }

    async fn test_clear(&self) -> Result<()> {
        self.transport().await?;
        self.inner.test_clear().await
    }

    async fn test_ping(&self, message: &str) -> Result<String> {
        self.transport().await?;
        self.inner.test_ping(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binas_core::Coordinates;
    use binas_station::StationLayout;

    fn station(id: &str) -> Arc<Station> {
        let layout = StationLayout {
            coordinates: Coordinates::new(0, 0),
            capacity: 2,
            return_bonus: 0,
        };
        Arc::new(Station::new(id, layout).unwrap())
    }

    #[tokio::test]
    async fn directory_filters_by_prefix() {
        let network = MemoryNetwork::new();
        network.register("A00_Station1", station("S1"));
        network.register("A00_Station2", station("S2"));
        network.register("B00_Station1", station("S3"));

        let names: Vec<_> = network
            .list_by_prefix("A00_Station")
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.org_name)
            .collect();
        assert_eq!(names, vec!["A00_Station1", "A00_Station2"]);
    }

    #[tokio::test]
    async fn directory_outage_fails_lookup() {
        let network = MemoryNetwork::new();
        network.register("A00_Station1", station("S1"));
        network.set_directory_down(true);
        assert!(network.list_by_prefix("A00").await.is_err());
    }

    #[tokio::test]
    async fn unreachable_fault_applies_to_live_clients() {
        let network = MemoryNetwork::new();
        let record = network.register("A00_Station1", station("S1"));
        let client = network.connect(&record).await.unwrap();
        assert_eq!(client.get_info().await.unwrap().id, "S1");

        assert!(network.set_fault("A00_Station1", Fault::Unreachable));
        let err = client.get_info().await.unwrap_err();
        assert!(err.is_replica_fault());
        assert!(network.connect(&record).await.is_err());

        network.set_fault("A00_Station1", Fault::None);
        assert!(client.test_ping("x").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_station_cannot_be_faulted_or_reached() {
        let network = MemoryNetwork::new();
        assert!(!network.set_fault("nope", Fault::Unreachable));
        let record = DirectoryRecord::new("nope", "mem://nope");
        assert!(network.connect(&record).await.is_err());
    }

    #[tokio::test]
    async fn delayed_call_fails_when_station_drops_mid_flight() {
        let network = MemoryNetwork::new();
        let record = network.register("A00_Station1", station("S1"));
        let client = network.connect(&record).await.unwrap();
        network.set_fault("A00_Station1", Fault::Delay(Duration::from_millis(100)));

        let (result, ()) = tokio::join!(client.get_bina(), async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            network.set_fault("A00_Station1", Fault::Unreachable);
        });
        assert!(result.unwrap_err().is_replica_fault());
        assert_eq!(network.station("A00_Station1").unwrap().info().total_gets, 0);
    }
}
