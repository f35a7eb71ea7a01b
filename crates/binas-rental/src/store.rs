//! Process-wide user registry
//!
//! Each user sits behind its own async mutex. The map lock is only held to
//! look up or insert an entry, never across an await.

use crate::user::User;
use async_lock::{Mutex, MutexGuardArc};
use binas_core::{BinasError, Email, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared handle to one user's record and lock
pub type UserEntry = Arc<Mutex<User>>;

/// Registry of users with an explicit init/reset lifecycle.
#[derive(Debug)]
pub struct UserStore {
    users: RwLock<BTreeMap<Email, UserEntry>>,
    initial_credit: RwLock<i64>,
    default_credit: i64,
}

impl UserStore {
    /// Create an empty store handing `initial_credit` to new users
    pub fn new(initial_credit: i64) -> Result<Self> {
        check_initial_credit(initial_credit)?;
        Ok(Self {
            users: RwLock::new(BTreeMap::new()),
            initial_credit: RwLock::new(initial_credit),
            default_credit: initial_credit,
        })
    }

    /// Credit given to users registered from now on
    pub fn initial_credit(&self) -> i64 {
        *self.initial_credit.read()
    }

    /// Change the credit given to new users.
    ///
    /// Existing users keep their balance.
    pub fn init(&self, initial_credit: i64) -> Result<()> {
        check_initial_credit(initial_credit)?;
        *self.initial_credit.write() = initial_credit;
        Ok(())
    }

    /// Drop every user and restore the configured initial credit
    pub fn reset(&self) {
        self.users.write().clear();
        *self.initial_credit.write() = self.default_credit;
    }

    /// Register a new user.
    ///
    /// The user is returned already locked, so no rental can start before
    /// the caller has finished setting the user up.
    pub fn register(&self, email: &str) -> Result<MutexGuardArc<User>> {
        let email = Email::parse(email)?;
        let mut users = self.users.write();
        let duplicate = || BinasError::UserAlreadyExists {
            email: email.to_string(),
        };
        if users.contains_key(&email) {
            return Err(duplicate());
        }
        let entry = Arc::new(Mutex::new(User::new(
            email.clone(),
            *self.initial_credit.read(),
        )));
        let guard = entry.try_lock_arc().ok_or_else(duplicate)?;
        users.insert(email, entry);
        Ok(guard)
    }

    /// Drop a user, e.g. when registration could not be completed
    pub fn remove(&self, email: &Email) -> bool {
        self.users.write().remove(email).is_some()
    }

    /// The entry for `email`; a malformed address is simply not found
    pub fn entry(&self, email: &str) -> Result<UserEntry> {
        let key = Email::parse(email).map_err(|_| BinasError::user_not_found(email))?;
        self.users
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| BinasError::user_not_found(email))
    }

    /// Number of registered users
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// True when nobody is registered
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

fn check_initial_credit(initial_credit: i64) -> Result<()> {
    if initial_credit < 0 {
        return Err(BinasError::bad_init(format!(
            "initial credit must be non-negative, got {initial_credit}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use binas_core::ErrorKind;

    #[test]
    fn register_assigns_initial_credit() {
        let store = UserStore::new(10).unwrap();
        let user = store.register("ana@binas.org").unwrap();
        assert_eq!(user.credit, 10);
        assert!(!user.has_bina);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn registered_user_starts_locked() {
        let store = UserStore::new(10).unwrap();
        let guard = store.register("ana@binas.org").unwrap();
        let entry = store.entry("ana@binas.org").unwrap();
        assert!(entry.try_lock().is_none());
        drop(guard);
        assert!(entry.try_lock().is_some());
    }

    #[test]
    fn removed_user_can_register_again() {
        let store = UserStore::new(10).unwrap();
        let email = store.register("ana@binas.org").unwrap().email.clone();
        assert!(store.remove(&email));
        assert!(!store.remove(&email));
        assert!(store.register("ana@binas.org").is_ok());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let store = UserStore::new(10).unwrap();
        store.register("ana@binas.org").unwrap();
        assert_matches!(
            store.register("ana@binas.org"),
            Err(BinasError::UserAlreadyExists { .. })
        );
    }

    #[test]
    fn malformed_email_is_rejected() {
        let store = UserStore::new(10).unwrap();
        for raw in ["", "ana", "@binas.org", "ana@", "ana..x@binas.org", "a na@binas.org"] {
            assert_matches!(store.register(raw), Err(BinasError::InvalidEmail { .. }));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn negative_initial_credit_is_bad_init() {
        let err = UserStore::new(-1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let store = UserStore::new(3).unwrap();
        assert_matches!(store.init(-1), Err(BinasError::BadInit { .. }));
        assert_eq!(store.initial_credit(), 3);
    }

    #[test]
    fn init_applies_to_later_registrations_only() {
        let store = UserStore::new(10).unwrap();
        store.register("early@binas.org").unwrap();
        store.init(2).unwrap();
        let late = store.register("late@binas.org").unwrap();
        assert_eq!(late.credit, 2);
        let early = store.entry("early@binas.org").unwrap();
        assert_eq!(early.try_lock().unwrap().credit, 10);
    }

    #[test]
    fn reset_clears_users_and_credit() {
        let store = UserStore::new(10).unwrap();
        store.init(0).unwrap();
        store.register("ana@binas.org").unwrap();
        store.reset();
        assert!(store.is_empty());
        assert_eq!(store.initial_credit(), 10);
        assert_matches!(
            store.entry("ana@binas.org"),
            Err(BinasError::UserNotFound { .. })
        );
    }

    #[test]
    fn unknown_or_malformed_lookup_is_not_found() {
        let store = UserStore::new(10).unwrap();
        assert_matches!(store.entry("x@y"), Err(BinasError::UserNotFound { .. }));
        assert_matches!(store.entry("nope"), Err(BinasError::UserNotFound { .. }));
    }
}
