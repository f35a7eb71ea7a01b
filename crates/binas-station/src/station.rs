//! Station replica state
//!
//! Pure, synchronous state for one docking station: the dock/bina inventory
//! and this station's copy of every user's balance. All mutation happens
//! under one short-lived lock that is never held across an await.

use binas_core::{
    BalanceView, BinasError, Coordinates, Email, Result, StationDefaults, StationView,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Position, size and bonus of a station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationLayout {
    /// Station position
    pub coordinates: Coordinates,
    /// Number of docks
    pub capacity: i64,
    /// Credit awarded for each return
    pub return_bonus: i64,
}

impl StationLayout {
    /// Layout at `coordinates` using configured defaults
    pub fn with_defaults(coordinates: Coordinates, defaults: &StationDefaults) -> Self {
        Self {
            coordinates,
            capacity: defaults.capacity,
            return_bonus: defaults.return_bonus,
        }
    }

    fn validate(&self) -> Result<()> {
        let Coordinates { x, y } = self.coordinates;
        if x < 0 || y < 0 {
            return Err(BinasError::bad_init(format!(
                "coordinates must be non-negative, got ({x}, {y})"
            )));
        }
        if self.capacity < 0 {
            return Err(BinasError::bad_init(format!(
                "capacity must be non-negative, got {}",
                self.capacity
            )));
        }
        if self.return_bonus < 0 {
            return Err(BinasError::bad_init(format!(
                "return bonus must be non-negative, got {}",
                self.return_bonus
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct StationState {
    layout: StationLayout,
    total_gets: i64,
    total_returns: i64,
    free_docks: i64,
    balances: BTreeMap<Email, BalanceView>,
}

impl StationState {
    fn fresh(layout: StationLayout) -> Self {
        Self {
            layout,
            total_gets: 0,
            total_returns: 0,
            free_docks: 0,
            balances: BTreeMap::new(),
        }
    }

    fn available_binas(&self) -> i64 {
        self.layout.capacity - self.free_docks
    }
}

/// One docking station and its balance replica.
///
/// A fresh station has every dock occupied.
#[derive(Debug)]
pub struct Station {
    id: String,
    initial: StationLayout,
    state: Mutex<StationState>,
}

impl Station {
    /// Create a station, rejecting a negative layout
    pub fn new(id: impl Into<String>, layout: StationLayout) -> Result<Self> {
        layout.validate()?;
        Ok(Self {
            id: id.into(),
            initial: layout,
            state: Mutex::new(StationState::fresh(layout)),
        })
    }

    /// Create a station at `coordinates` sized by the configured defaults.
    ///
    /// [`Station::reset`] returns it to these defaults.
    pub fn with_defaults(
        id: impl Into<String>,
        coordinates: Coordinates,
        defaults: &StationDefaults,
    ) -> Result<Self> {
        Self::new(id, StationLayout::with_defaults(coordinates, defaults))
    }

    /// Station identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Inventory snapshot
    pub fn info(&self) -> StationView {
        let state = self.state.lock();
        StationView {
            id: self.id.clone(),
            coordinates: state.layout.coordinates,
            capacity: state.layout.capacity,
            total_gets: state.total_gets,
            total_returns: state.total_returns,
            free_docks: state.free_docks,
            available_binas: state.available_binas(),
        }
    }

    /// Hand out one bina
    pub fn get_bina(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.available_binas() <= 0 {
            return Err(BinasError::NoBinaAvailable {
                station_id: self.id.clone(),
            });
        }
        state.free_docks += 1;
        state.total_gets += 1;
        Ok(())
    }

    /// Dock one bina, returning the bonus
    pub fn return_bina(&self) -> Result<i64> {
        let mut state = self.state.lock();
        if state.free_docks <= 0 {
            return Err(BinasError::NoSlotAvailable {
                station_id: self.id.clone(),
            });
        }
        state.free_docks -= 1;
        state.total_returns += 1;
        Ok(state.layout.return_bonus)
    }

    /// Stored balance record for `email`
    pub fn balance(&self, email: &Email) -> Result<BalanceView> {
        self.state
            .lock()
            .balances
            .get(email)
            .copied()
            .ok_or_else(|| BinasError::UnknownUser {
                email: email.to_string(),
            })
    }

    /// Store a balance record.
    ///
    /// Only a tag newer than the stored one replaces the record; an older
    /// tag is acknowledged and dropped so this replica's tag never regresses.
    pub fn set_balance(&self, email: &Email, credit: i64, tag: i64) -> Result<()> {
        if credit < 0 {
            return Err(BinasError::InvalidCredit { credit });
        }
        let mut state = self.state.lock();
        match state.balances.get(email) {
            Some(current) if current.tag >= tag => {
                tracing::debug!(
                    station = %self.id,
                    email = %email,
                    stored_tag = current.tag,
                    tag,
                    "Ignoring stale balance write"
                );
            }
            _ => {
                state
                    .balances
                    .insert(email.clone(), BalanceView::new(credit, tag));
            }
        }
        Ok(())
    }

    /// Replace the layout and empty the counters; every dock ends up full.
    pub fn init(&self, layout: StationLayout) -> Result<()> {
        layout.validate()?;
        let mut state = self.state.lock();
        state.layout = layout;
        state.total_gets = 0;
        state.total_returns = 0;
        state.free_docks = 0;
        tracing::info!(station = %self.id, capacity = layout.capacity, "Station initialized");
        Ok(())
    }

    /// Restore the construction layout and forget all balances
    pub fn reset(&self) {
        *self.state.lock() = StationState::fresh(self.initial);
        tracing::info!(station = %self.id, "Station reset");
    }

    /// Greeting used as a liveness check
    pub fn ping(&self, message: &str) -> String {
        let message = match message.trim() {
            "" => "friend",
            trimmed => trimmed,
        };
        format!("Hello {message} from {}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn station(capacity: i64, bonus: i64) -> Station {
        Station::new(
            "S1",
            StationLayout {
                coordinates: Coordinates::new(5, 5),
                capacity,
                return_bonus: bonus,
            },
        )
        .unwrap()
    }

    fn email() -> Email {
        Email::parse("alice@example").unwrap()
    }

    #[test]
    fn fresh_station_is_full() {
        let info = station(4, 1).info();
        assert_eq!(info.available_binas, 4);
        assert_eq!(info.free_docks, 0);
    }

    #[test]
    fn get_and_return_move_inventory() {
        let s = station(2, 3);
        s.get_bina().unwrap();
        s.get_bina().unwrap();
        assert_matches!(s.get_bina(), Err(BinasError::NoBinaAvailable { .. }));

        assert_eq!(s.return_bina().unwrap(), 3);
        let info = s.info();
        assert_eq!(info.total_gets, 2);
        assert_eq!(info.total_returns, 1);
        assert_eq!(info.free_docks, 1);
        assert_eq!(info.available_binas, 1);
    }

    #[test]
    fn return_to_full_station_fails() {
        assert_matches!(station(2, 0).return_bina(), Err(BinasError::NoSlotAvailable { .. }));
    }

    #[test]
    fn unknown_user_has_no_balance() {
        assert_matches!(station(1, 0).balance(&email()), Err(BinasError::UnknownUser { .. }));
    }

    #[test]
    fn balance_keeps_highest_tag() {
        let s = station(1, 0);
        s.set_balance(&email(), 10, 0).unwrap();
        s.set_balance(&email(), 9, 2).unwrap();
        s.set_balance(&email(), 4, 1).unwrap();
        assert_eq!(s.balance(&email()).unwrap(), BalanceView::new(9, 2));
    }

    #[test]
    fn negative_credit_is_rejected() {
        let s = station(1, 0);
        assert_matches!(
            s.set_balance(&email(), -1, 0),
            Err(BinasError::InvalidCredit { credit: -1 })
        );
        assert!(s.balance(&email()).is_err());
    }

    #[test]
    fn init_rejects_negative_values() {
        let s = station(1, 0);
        let bad = StationLayout {
            coordinates: Coordinates::new(-1, 0),
            capacity: 1,
            return_bonus: 0,
        };
        assert_matches!(s.init(bad), Err(BinasError::BadInit { .. }));
    }

    #[test]
    fn reset_restores_layout_and_clears_balances() {
        let s = station(3, 1);
        s.get_bina().unwrap();
        s.set_balance(&email(), 5, 0).unwrap();
        s.init(StationLayout {
            coordinates: Coordinates::new(1, 1),
            capacity: 9,
            return_bonus: 2,
        })
        .unwrap();

        s.reset();
        let info = s.info();
        assert_eq!(info.capacity, 3);
        assert_eq!(info.coordinates, Coordinates::new(5, 5));
        assert_eq!(info.total_gets, 0);
        assert!(s.balance(&email()).is_err());
    }

    #[test]
    fn reset_returns_to_configured_defaults() {
        let defaults = StationDefaults {
            capacity: 6,
            return_bonus: 2,
        };
        let s = Station::with_defaults("S2", Coordinates::new(3, 4), &defaults).unwrap();
        s.init(StationLayout {
            coordinates: Coordinates::new(0, 0),
            capacity: 1,
            return_bonus: 0,
        })
        .unwrap();
        s.get_bina().unwrap();

        s.reset();
        let info = s.info();
        assert_eq!(info.coordinates, Coordinates::new(3, 4));
        assert_eq!(info.capacity, 6);
        assert_eq!(info.available_binas, 6);
        s.get_bina().unwrap();
        assert_eq!(s.return_bina().unwrap(), 2);
    }

    #[test]
    fn ping_defaults_to_friend() {
        let s = station(1, 0);
        assert_eq!(s.ping("  "), "Hello friend from S1");
        assert_eq!(s.ping("bob"), "Hello bob from S1");
    }
}
