//! In-process `StationClient` handler

use crate::station::{Station, StationLayout};
use async_trait::async_trait;
use binas_core::{BalanceView, Coordinates, Email, Result, StationClient, StationView};
use std::sync::Arc;

/// `StationClient` that calls a [`Station`] in the same process.
#[derive(Debug, Clone)]
pub struct LocalStationClient {
    station: Arc<Station>,
}

impl LocalStationClient {
    /// Wrap a shared station
    pub fn new(station: Arc<Station>) -> Self {
        Self { station }
    }

    /// The wrapped station (for inspection in tests)
    pub fn station(&self) -> &Arc<Station> {
        &self.station
    }
}

#[async_trait]
impl StationClient for LocalStationClient {
    async fn get_info(&self) -> Result<StationView> {
        Ok(self.station.info())
    }

    async fn get_bina(&self) -> Result<()> {
        self.station.get_bina()
    }

    async fn return_bina(&self) -> Result<i64> {
        self.station.return_bina()
    }

    async fn get_balance(&self, email: &Email) -> Result<BalanceView> {
        self.station.balance(email)
    }

    async fn set_balance(&self, email: &Email, credit: i64, tag: i64) -> Result<()> {
        self.station.set_balance(email, credit, tag)
    }

    async fn test_init(&self, x: i64, y: i64, capacity: i64, return_bonus: i64) -> Result<()> {
        self.station.init(StationLayout {
            coordinates: Coordinates::new(x, y),
            capacity,
            return_bonus,
        })
    }

    async fn test_clear(&self) -> Result<()> {
        self.station.reset();
        Ok(())
    }

    async fn test_ping(&self, message: &str) -> Result<String> {
        Ok(self.station.ping(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binas_core::StationDefaults;

    #[tokio::test]
    async fn client_forwards_to_station() {
        let station = Arc::new(
            Station::new(
                "S7",
                StationLayout::with_defaults(Coordinates::new(1, 2), &StationDefaults::default()),
            )
            .unwrap(),
        );
        let client = LocalStationClient::new(Arc::clone(&station));

        client.test_init(3, 4, 2, 1).await.unwrap();
        client.get_bina().await.unwrap();
        assert_eq!(client.return_bina().await.unwrap(), 1);

        let info = client.get_info().await.unwrap();
        assert_eq!(info.id, "S7");
        assert_eq!(info.coordinates, Coordinates::new(3, 4));
        assert_eq!(info.total_returns, 1);
        assert_eq!(station.info(), info);
    }
}
