//! Nullable store: thread-safe in-memory storage.
//!
//! One mutex guards every table, so a check-in's ledger append and pass
//! update are atomic the same way they are in a single LMDB transaction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use guestpass_store::{PassStore, ResidentStore, StoreError, UsedTokenStore};
use guestpass_types::{Pass, PassId, Resident, ResidentId, UsedToken};

#[derive(Default)]
struct Inner {
    passes: HashMap<String, Pass>,
    residents: HashMap<String, Resident>,
    used_tokens: HashMap<(String, String), UsedToken>,
}

impl Inner {
    fn put_conditional(&mut self, pass: &Pass, expected_revision: u64) -> Result<Pass, StoreError> {
        let current = self
            .passes
            .get(pass.id.as_str())
            .ok_or_else(|| StoreError::NotFound(format!("pass {}", pass.id)))?;
        if current.revision != expected_revision {
            return Err(StoreError::Conflict(format!(
                "pass {} at revision {}, expected {}",
                pass.id, current.revision, expected_revision
            )));
        }
        let mut stored = pass.clone();
        stored.revision = expected_revision + 1;
        self.passes.insert(pass.id.to_string(), stored.clone());
        Ok(stored)
    }
}

/// An in-memory record store.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with a backend error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Ledger entries recorded for `pass_id`.
    pub fn used_tokens_for(&self, pass_id: &PassId) -> Vec<UsedToken> {
        match self.inner.lock() {
            Ok(inner) => inner
                .used_tokens
                .values()
                .filter(|u| &u.pass_id == pass_id)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store unavailable".into()));
        }
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))
    }
}

fn newest_first(mut passes: Vec<Pass>) -> Vec<Pass> {
    passes.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });
    passes
}

impl PassStore for NullStore {
    fn get_pass(&self, id: &PassId) -> Result<Pass, StoreError> {
        self.lock()?
            .passes
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("pass {id}")))
    }

    fn insert_pass(&self, pass: &Pass) -> Result<Pass, StoreError> {
        let mut inner = self.lock()?;
        if inner.passes.contains_key(pass.id.as_str()) {
            return Err(StoreError::Duplicate(format!("pass {}", pass.id)));
        }
        let mut stored = pass.clone();
        stored.revision = 1;
        inner.passes.insert(pass.id.to_string(), stored.clone());
        Ok(stored)
    }

    fn update_pass(&self, pass: &Pass, expected_revision: u64) -> Result<Pass, StoreError> {
        self.lock()?.put_conditional(pass, expected_revision)
    }

    fn list_passes_for_resident(&self, resident: &ResidentId) -> Result<Vec<Pass>, StoreError> {
        let passes = self
            .lock()?
            .passes
            .values()
            .filter(|p| &p.resident_id == resident)
            .cloned()
            .collect();
        Ok(newest_first(passes))
    }

    fn list_passes(&self) -> Result<Vec<Pass>, StoreError> {
        Ok(newest_first(self.lock()?.passes.values().cloned().collect()))
    }
}

impl ResidentStore for NullStore {
    fn get_resident(&self, id: &ResidentId) -> Result<Resident, StoreError> {
        self.lock()?
            .residents
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("resident {id}")))
    }

    fn find_resident_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Resident>, StoreError> {
        Ok(self
            .lock()?
            .residents
            .values()
            .find(|r| r.external_id == external_id)
            .cloned())
    }

    fn put_resident(&self, resident: &Resident) -> Result<(), StoreError> {
        self.lock()?
            .residents
            .insert(resident.id.to_string(), resident.clone());
        Ok(())
    }
}

impl UsedTokenStore for NullStore {
    fn get_used_token(
        &self,
        pass_id: &PassId,
        token_id: &str,
    ) -> Result<Option<UsedToken>, StoreError> {
        Ok(self
            .lock()?
            .used_tokens
            .get(&(pass_id.to_string(), token_id.to_string()))
            .cloned())
    }

    fn record_check_in(
        &self,
        used: &UsedToken,
        pass: &Pass,
        expected_revision: u64,
    ) -> Result<Pass, StoreError> {
        let mut inner = self.lock()?;
        let key = (used.pass_id.to_string(), used.token_id.clone());
        if inner.used_tokens.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "token {} for pass {}",
                used.token_id, used.pass_id
            )));
        }
        let stored = inner.put_conditional(pass, expected_revision)?;
        inner.used_tokens.insert(key, used.clone());
        Ok(stored)
    }
}
