//! Test cluster factory

use crate::network::{Fault, MemoryNetwork};
use binas_core::{
    BalanceView, BinasConfig, Coordinates, Directory, Email, QuorumConfig, StationConnector,
    StationDefaults, Tag, UNKNOWN_TAG,
};
use binas_station::Station;
use std::sync::Arc;

/// Directory prefix used by test clusters
pub const TEST_PREFIX: &str = "T00_Station";

/// Quorum deadline used by test clusters
pub const TEST_QUORUM_TIMEOUT_MS: u64 = 200;

/// N stations registered as `T00_Station1..N` with ids `S1..SN`.
///
/// Station `i` sits at `(i, i)` and is sized by the cluster configuration's
/// `station_defaults`.
#[derive(Debug, Clone)]
pub struct TestCluster {
    network: Arc<MemoryNetwork>,
    names: Vec<String>,
    config: BinasConfig,
}

impl TestCluster {
    /// Cluster of `n` stations with the given capacity and return bonus
    pub fn new(n: usize, capacity: i64, return_bonus: i64) -> Self {
        let config = BinasConfig {
            station_prefix: TEST_PREFIX.to_string(),
            quorum: QuorumConfig {
                timeout_ms: TEST_QUORUM_TIMEOUT_MS,
            },
            station_defaults: StationDefaults {
                capacity,
                return_bonus,
            },
            ..BinasConfig::default()
        };
        Self::from_config(n, config)
    }

    /// Cluster of `n` stations with the default station size
    pub fn with_stations(n: usize) -> Self {
        let defaults = StationDefaults::default();
        Self::new(n, defaults.capacity, defaults.return_bonus)
    }

    /// Cluster of `n` stations registered under `config.station_prefix`
    pub fn from_config(n: usize, config: BinasConfig) -> Self {
        let network = Arc::new(MemoryNetwork::new());
        let names = (1..=n)
            .map(|i| {
                let name = format!("{}{i}", config.station_prefix);
                let position = i as i64;
                #[allow(clippy::expect_used)]
                let station = Station::with_defaults(
                    format!("S{i}"),
                    Coordinates::new(position, position),
                    &config.station_defaults,
                )
                .expect("test station defaults are non-negative");
                network.register(name.clone(), Arc::new(station));
                name
            })
            .collect();
        Self {
            network,
            names,
            config,
        }
    }

    /// Shared network
    pub fn network(&self) -> &Arc<MemoryNetwork> {
        &self.network
    }

    /// The network as a directory
    pub fn directory(&self) -> Arc<dyn Directory> {
        Arc::clone(&self.network) as Arc<dyn Directory>
    }

    /// The network as a station connector
    pub fn connector(&self) -> Arc<dyn StationConnector> {
        Arc::clone(&self.network) as Arc<dyn StationConnector>
    }

    /// Configuration pointing at this cluster
    pub fn config(&self) -> BinasConfig {
        self.config.clone()
    }

    /// Number of stations
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True for a cluster without stations
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Directory name of station `index` (0-based)
    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Station `index` (0-based)
    #[allow(clippy::expect_used)]
    pub fn station(&self, index: usize) -> Arc<Station> {
        self.network
            .station(&self.names[index])
            .expect("cluster stations stay registered")
    }

    /// Inject `fault` into station `index`
    pub fn set_fault(&self, index: usize, fault: Fault) {
        self.network.set_fault(&self.names[index], fault);
    }

    /// Clear every injected fault
    pub fn heal(&self) {
        for name in &self.names {
            self.network.set_fault(name, Fault::None);
        }
    }

    /// Balance record of `email` at every station, in station order
    pub fn balances(&self, email: &Email) -> Vec<Option<BalanceView>> {
        (0..self.len())
            .map(|index| self.station(index).balance(email).ok())
            .collect()
    }

    /// Stored tag of `email` at every station, `UNKNOWN_TAG` where absent
    pub fn tags(&self, email: &Email) -> Vec<Tag> {
        self.balances(email)
            .into_iter()
            .map(|balance| balance.map_or(UNKNOWN_TAG, |b| b.tag))
            .collect()
    }
}
