//! The pass engine: collaborators, configuration and the shared
//! read-guard-write loop every mutating operation goes through.
//!
//! The engine holds no locks. Correctness under concurrent requests rests
//! on the store's conditional writes: a write that loses the race is
//! retried once against a fresh read, so the loser reports the real reason
//! (used nonce, replay, wrong status) instead of a bare conflict.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use guestpass_crypto::{AccessVerifier, TokenCodec};
use guestpass_store::{GuestPassStore, StoreError};
use guestpass_types::{Pass, PassId, Timestamp};

use crate::{
    Clock, EngineConfig, GatewayError, MembershipProvider, Notifier, PassError,
    VerificationGateway, WalletIssuer,
};

const WRITE_ATTEMPTS: usize = 2;

/// Everything the engine talks to.
#[derive(Clone)]
pub struct EngineDeps {
    pub store: Arc<dyn GuestPassStore>,
    pub clock: Arc<dyn Clock>,
    pub codec: TokenCodec,
    /// Keys the hash in wallet QR payloads. `None` disables wallet QR.
    pub wallet_secret: Option<Vec<u8>>,
    pub verification: Arc<dyn VerificationGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub wallet: Arc<dyn WalletIssuer>,
    pub membership: Arc<dyn MembershipProvider>,
}

pub struct PassEngine {
    pub(crate) deps: EngineDeps,
    pub(crate) config: EngineConfig,
    pub(crate) access: AccessVerifier,
}

impl PassEngine {
    pub fn new(deps: EngineDeps, config: EngineConfig) -> Self {
        let access = AccessVerifier::new(
            deps.codec.clone(),
            deps.wallet_secret.clone(),
            config.calendar,
        );
        Self {
            deps,
            config,
            access,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn GuestPassStore {
        self.deps.store.as_ref()
    }

    /// The engine clock's current instant.
    pub fn now(&self) -> Timestamp {
        self.deps.clock.now()
    }

    /// Building-local date at `now`.
    pub(crate) fn today_at(&self, now: Timestamp) -> NaiveDate {
        self.config.calendar.today(now)
    }

    pub fn today(&self) -> NaiveDate {
        self.today_at(self.now())
    }

    pub(crate) fn load_pass(&self, id: &PassId) -> Result<Pass, PassError> {
        self.deps.store.get_pass(id).map_err(|e| match e {
            StoreError::NotFound(_) => PassError::PassNotFound(id.to_string()),
            other => other.into(),
        })
    }

    /// Run an external call under the configured timeout.
    pub(crate) async fn call<T, F>(&self, what: &str, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(what.to_string())),
        }
    }

    /// Read the pass, let `apply` check guards and produce the next record,
    /// and write it conditionally on the revision read.
    pub(crate) fn modify_pass<F>(&self, id: &PassId, mut apply: F) -> Result<Pass, PassError>
    where
        F: FnMut(Pass) -> Result<Pass, PassError>,
    {
        for attempt in 1..=WRITE_ATTEMPTS {
            let current = self.load_pass(id)?;
            let revision = current.revision;
            let mut next = apply(current)?;
            next.updated_at = self.now();
            match self.deps.store.update_pass(&next, revision) {
                Ok(stored) => return Ok(stored),
                Err(StoreError::Conflict(reason)) => {
                    debug!(pass_id = %id, attempt, %reason, "pass write lost a race, re-reading");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(PassError::StoreUnavailable(format!(
            "pass {id} is being updated concurrently"
        )))
    }
}
