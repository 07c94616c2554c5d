//! Test helpers for integration tests.
//!
//! Provides an in-memory identity store with failure injection and gates for
//! holding store calls open, plus fixture builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Notify;

use warden::db::normalize_email;
use warden::{
    AuthConfig, Identity, IdentityId, IdentityStore, IdentityUpdate, NewIdentity, StoreError,
};

/// Fixed reference instant for deterministic clocks.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

/// `t0` shifted by the given number of seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

/// Auth config with a 5 second session timeout.
pub fn config_5s<I: IntoIterator<Item = &'static str>>(superusers: I) -> AuthConfig {
    AuthConfig::new(5000, superusers)
}

/// In-memory identity store.
#[derive(Default)]
pub struct MemoryStore {
    identities: Mutex<HashMap<IdentityId, Identity>>,
    next_id: AtomicI64,
    find_calls: AtomicUsize,
    update_calls: AtomicUsize,
    fail_find: AtomicBool,
    fail_update: AtomicBool,
    find_gates: Mutex<HashMap<IdentityId, Arc<Notify>>>,
    update_gate: Mutex<Option<Arc<Notify>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    /// Insert a blank identity and return its ID.
    pub fn insert(&self, email: &str, last_request_at: Option<DateTime<Utc>>) -> IdentityId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut identity = Identity::blank(id, email);
        identity.last_request_at = last_request_at;
        self.identities.lock().unwrap().insert(id, identity);
        id
    }

    pub fn get(&self, id: IdentityId) -> Option<Identity> {
        self.identities.lock().unwrap().get(&id).cloned()
    }

    pub fn remove(&self, id: IdentityId) {
        self.identities.lock().unwrap().remove(&id);
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn fail_find(&self, fail: bool) {
        self.fail_find.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    /// Hold lookups of `id` until the returned gate is notified.
    pub fn gate_find(&self, id: IdentityId) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.find_gates.lock().unwrap().insert(id, Arc::clone(&gate));
        gate
    }

    /// Hold every update until the returned gate is notified.
    pub fn gate_updates(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.update_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn create(&self, new_identity: &NewIdentity) -> Result<Identity, StoreError> {
        let email = normalize_email(&new_identity.email)?;
        let mut identities = self.identities.lock().unwrap();
        if identities.values().any(|i| i.email == email) {
            return Err(StoreError::Conflict(email));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut identity = Identity::blank(id, email);
        identity.first_name = new_identity.first_name.clone();
        identity.last_name = new_identity.last_name.clone();
        identity.role = new_identity.role;
        identity.salt = new_identity.credentials.salt.clone();
        identity.hashed_password = new_identity.credentials.hashed_password.clone();
        identities.insert(id, identity.clone());
        Ok(identity)
    }

    async fn find_by_id(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.find_gates.lock().unwrap().get(&id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_find.load(Ordering::SeqCst) {
            return Err(StoreError::Database("lookup failed".to_string()));
        }
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(StoreError::Database("lookup failed".to_string()));
        }
        Ok(self
            .identities
            .lock()
            .unwrap()
            .values()
            .find(|i| i.email == email)
            .cloned())
    }

    async fn update_by_id(
        &self,
        id: IdentityId,
        update: &IdentityUpdate,
    ) -> Result<bool, StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.update_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_update.load(Ordering::SeqCst) {
            return Err(StoreError::Database("update failed".to_string()));
        }

        let mut update = update.clone();
        if let Some(email) = update.email.take() {
            update.email = Some(normalize_email(&email)?);
        }

        let mut identities = self.identities.lock().unwrap();
        match identities.get_mut(&id) {
            Some(identity) => {
                update.apply_to(identity);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
