//! Rent/return state machine over the replicated credit register
//!
//! Every rent or return runs entirely under the user's lock:
//!
//! ```text
//! rent:   validate NoBina -> quorum read -> station get_bina -> HasBina -> quorum write(c - 1)
//! return: validate HasBina -> station return_bina -> quorum read -> NoBina -> quorum write(c + bonus)
//! ```
//!
//! The station step cannot be undone, so it precedes the credit write. If
//! that write then fails, the local rental state is already ahead of the
//! replicated credit and the error is returned to the caller; the stored
//! credit is only updated once a write commits.

use crate::store::UserStore;
use crate::user::User;
use binas_core::{
    BinasConfig, BinasError, Coordinates, Directory, DirectoryRecord, Result, StationClient,
    StationConnector, StationView,
};
use binas_quorum::{BalanceRegister, StationDiscovery};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;

/// A station located by its reported identifier
#[derive(Clone)]
pub struct StationHandle {
    /// Directory record the station was reached through
    pub record: DirectoryRecord,
    /// Client for the station
    pub client: Arc<dyn StationClient>,
}

impl std::fmt::Debug for StationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StationHandle")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

/// User-facing Binas operations.
#[derive(Debug)]
pub struct RentalCoordinator {
    config: BinasConfig,
    users: UserStore,
    balances: BalanceRegister,
}

impl RentalCoordinator {
    /// Build a coordinator over the stations the directory lists under
    /// `config.station_prefix`.
    pub fn new(
        config: BinasConfig,
        directory: Arc<dyn Directory>,
        connector: Arc<dyn StationConnector>,
    ) -> Result<Self> {
        config.validate()?;
        let users = UserStore::new(config.initial_credit)?;
        let discovery =
            StationDiscovery::new(directory, connector, config.station_prefix.clone());
        let balances = BalanceRegister::new(discovery, config.quorum.timeout());
        tracing::info!(
            prefix = %config.station_prefix,
            directory = %config.directory_url,
            timeout_ms = config.quorum.timeout_ms,
            "Rental coordinator ready"
        );
        Ok(Self {
            config,
            users,
            balances,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &BinasConfig {
        &self.config
    }

    /// User registry
    pub fn users(&self) -> &UserStore {
        &self.users
    }

    /// Credit register
    pub fn balances(&self) -> &BalanceRegister {
        &self.balances
    }

    /// Register a user and quorum-write the current initial credit.
    ///
    /// The write supersedes any balance the replicas still hold for this
    /// email from before a reset. If it cannot reach a quorum the user is
    /// not registered.
    #[tracing::instrument(skip(self))]
    pub async fn create_user(&self, email: &str) -> Result<User> {
        let user = self.users.register(email)?;
        match self.balances.write_credit(&user.email, user.credit).await {
            Ok(written) => {
                tracing::info!(email = %user.email, credit = user.credit, tag = written.tag, "User created");
                Ok(User::clone(&user))
            }
            Err(error) => {
                self.users.remove(&user.email);
                tracing::warn!(email = %user.email, error = %error, "User not created");
                Err(error)
            }
        }
    }

    /// Snapshot of a user, waiting for any rental in progress
    pub async fn get_user(&self, email: &str) -> Result<User> {
        let entry = self.users.entry(email)?;
        let user = entry.lock().await;
        Ok(user.clone())
    }

    /// Rent a bina from `station_id` for `email`, charging one credit.
    #[tracing::instrument(skip(self))]
    pub async fn rent_bina(&self, station_id: &str, email: &str) -> Result<()> {
        let entry = self.users.entry(email)?;
        let mut user = entry.lock().await;
        user.validate_can_rent()?;

        let credit = self.current_credit(&user).await?;
        if credit < 1 {
            return Err(BinasError::InsufficientCredits {
                email: user.email.to_string(),
                credit,
            });
        }

        let station = self.find_station(station_id).await?;
        self.on_station(station_id, &station, station.client.get_bina())
            .await?;
        user.has_bina = true;

        let credit = credit - 1;
        let written = self.balances.write_credit(&user.email, credit).await?;
        user.credit = credit;
        tracing::info!(email = %user.email, station = station_id, credit, tag = written.tag, "Bina rented");
        Ok(())
    }

    /// Return the user's bina at `station_id`, crediting the station bonus.
    #[tracing::instrument(skip(self))]
    pub async fn return_bina(&self, station_id: &str, email: &str) -> Result<()> {
        let entry = self.users.entry(email)?;
        let mut user = entry.lock().await;
        user.validate_can_return()?;

        let station = self.find_station(station_id).await?;
        let bonus = self
            .on_station(station_id, &station, station.client.return_bina())
            .await?;

        let credit = self.current_credit(&user).await? + bonus;
        user.has_bina = false;

        let written = self.balances.write_credit(&user.email, credit).await?;
        user.credit = credit;
        tracing::info!(email = %user.email, station = station_id, bonus, credit, tag = written.tag, "Bina returned");
        Ok(())
    }

    /// Set the credit handed to users registered from now on
    pub fn init_system(&self, initial_credit: i64) -> Result<()> {
        self.users.init(initial_credit)?;
        tracing::info!(initial_credit, "System initialized");
        Ok(())
    }

    /// Forget every user and restore the configured initial credit.
    ///
    /// Station replicas keep their balance records; see [`Self::clear_stations`].
    pub fn reset(&self) {
        self.users.reset();
        tracing::info!("User store reset");
    }

    /// Locate the first reachable station reporting `station_id`.
    ///
    /// Stations are queried one at a time in directory order; unreachable
    /// ones are skipped.
    pub async fn find_station(&self, station_id: &str) -> Result<StationHandle> {
        for (record, client) in self.balances.discovery().connect_all().await {
            let client = match client {
                Ok(client) => client,
                Err(error) => {
                    tracing::debug!(station = %record.org_name, error = %error, "Skipping station");
                    continue;
                }
            };
            let info = self.bounded(&record, client.get_info()).await;
            match info {
                Ok(view) if view.id == station_id => return Ok(StationHandle { record, client }),
                Ok(_) => {}
                Err(error) => {
                    tracing::debug!(station = %record.org_name, error = %error, "Skipping station");
                }
            }
        }
        Err(BinasError::station_not_found(station_id))
    }

    /// Reconfigure one station
    pub async fn init_station(
        &self,
        station_id: &str,
        coordinates: Coordinates,
        capacity: i64,
        return_bonus: i64,
    ) -> Result<()> {
        let station = self.find_station(station_id).await?;
        self.on_station(
            station_id,
            &station,
            station
                .client
                .test_init(coordinates.x, coordinates.y, capacity, return_bonus),
        )
        .await?;
        tracing::info!(station = station_id, capacity, return_bonus, "Station initialized");
        Ok(())
    }

    /// Inventory snapshot of one station
    pub async fn get_info_station(&self, station_id: &str) -> Result<StationView> {
        let station = self.find_station(station_id).await?;
        self.on_station(station_id, &station, station.client.get_info())
            .await
    }

    /// The `k` reachable stations closest to `coordinates`, nearest first
    pub async fn list_stations(&self, k: usize, coordinates: Coordinates) -> Vec<StationView> {
        let mut views: Vec<StationView> = self
            .each_station(|client| async move { client.get_info().await })
            .await
            .into_iter()
            .filter_map(|(_, view)| view.ok())
            .collect();
        views.sort_by(|a, b| {
            a.coordinates
                .distance_squared(&coordinates)
                .cmp(&b.coordinates.distance_squared(&coordinates))
                .then_with(|| a.id.cmp(&b.id))
        });
        views.truncate(k);
        views
    }

    /// Greeting from the coordinator followed by every reachable station's
    pub async fn test_ping(&self, message: &str) -> String {
        let name = if message.is_empty() { "friend" } else { message };
        let mut lines = vec![format!("Hello {name} from Binas")];
        let message = message.to_string();
        let replies = self
            .each_station(|client| {
                let message = message.clone();
                async move { client.test_ping(&message).await }
            })
            .await;
        for (record, reply) in replies {
            match reply {
                Ok(reply) => lines.push(reply),
                Err(error) => {
                    tracing::debug!(station = %record.org_name, error = %error, "Ping failed");
                }
            }
        }
        lines.join("\n")
    }

    /// Reset every reachable station; returns how many were cleared
    pub async fn clear_stations(&self) -> usize {
        let results = self
            .each_station(|client| async move { client.test_clear().await })
            .await;
        let mut cleared = 0;
        for (record, result) in results {
            match result {
                Ok(()) => cleared += 1,
                Err(error) => {
                    tracing::warn!(station = %record.org_name, error = %error, "Station not cleared");
                }
            }
        }
        tracing::info!(cleared, "Stations cleared");
        cleared
    }

    /// Quorum-read the user's credit, falling back to the stored credit when
    /// no replica has a record yet.
    async fn current_credit(&self, user: &User) -> Result<i64> {
        let read = self.balances.read_credit(&user.email).await?;
        Ok(read.value.unwrap_or(user.credit))
    }

    /// Run `call` against every connectable station concurrently
    async fn each_station<T, F, Fut>(&self, call: F) -> Vec<(DirectoryRecord, Result<T>)>
    where
        F: Fn(Arc<dyn StationClient>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let connected: Vec<_> = self
            .balances
            .discovery()
            .connect_all()
            .await
            .into_iter()
            .filter_map(|(record, client)| match client {
                Ok(client) => Some((record, client)),
                Err(error) => {
                    tracing::debug!(station = %record.org_name, error = %error, "Skipping station");
                    None
                }
            })
            .collect();
        join_all(connected.into_iter().map(|(record, client)| {
            let call = call(client);
            async move {
                let result = self.bounded(&record, call).await;
                (record, result)
            }
        }))
        .await
    }

    /// Call a station returned by [`Self::find_station`].
    ///
    /// A transport failure here means the station dropped out after the
    /// lookup, which callers see as the station not being found.
    async fn on_station<T>(
        &self,
        station_id: &str,
        station: &StationHandle,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        self.bounded(&station.record, call)
            .await
            .map_err(|error| match error {
                BinasError::Unreachable { .. } => {
                    tracing::warn!(station = station_id, error = %error, "Station lost after lookup");
                    BinasError::station_not_found(station_id)
                }
                other => other,
            })
    }

    /// Bound a single station call by the quorum timeout
    async fn bounded<T>(
        &self,
        record: &DirectoryRecord,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.balances.timeout(), call)
            .await
            .unwrap_or_else(|_| Err(BinasError::unreachable(&record.org_name, "timed out")))
    }
}
