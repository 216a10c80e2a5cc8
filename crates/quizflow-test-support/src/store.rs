//! Test stores — mock `SessionStore` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use quizflow_core::error::DomainError;
use quizflow_core::store::{SessionKey, SessionSnapshot, SessionStore};

/// A session store backed by a `HashMap` that records every save and
/// delete.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<SessionKey, SessionSnapshot>>,
    saves: Mutex<Vec<SessionSnapshot>>,
    deletes: Mutex<Vec<SessionKey>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with `snapshot`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_snapshot(snapshot: SessionSnapshot) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap()
            .insert(snapshot.key(), snapshot);
        store
    }

    /// Returns the snapshot currently stored under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn get(&self, key: &SessionKey) -> Option<SessionSnapshot> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Returns every snapshot passed to `save`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved(&self) -> Vec<SessionSnapshot> {
        self.saves.lock().unwrap().clone()
    }

    /// Returns every key passed to `delete`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn deleted(&self) -> Vec<SessionKey> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<SessionSnapshot>, DomainError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), DomainError> {
        self.entries
            .lock()
            .unwrap()
            .insert(snapshot.key(), snapshot.clone());
        self.saves.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), DomainError> {
        self.entries.lock().unwrap().remove(key);
        self.deletes.lock().unwrap().push(key.clone());
        Ok(())
    }
}

/// A session store that always returns an infrastructure error. Useful for
/// testing that persistence failures never stall the flow.
#[derive(Debug)]
pub struct FailingSessionStore;

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn load(&self, _key: &SessionKey) -> Result<Option<SessionSnapshot>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save(&self, _snapshot: &SessionSnapshot) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete(&self, _key: &SessionKey) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
