//! Nullable gateways: record calls instead of reaching third parties.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use guestpass_lifecycle::{
    GatewayError, MemberProfile, MembershipProvider, Notifier, VerificationGateway,
    VerificationRequest, VerificationSession, WalletArtifact, WalletIssuer, WalletPassRequest,
};

/// Shared failure switch for the recording gateways.
#[derive(Default)]
struct Failure {
    error: Mutex<Option<GatewayError>>,
    delay: Mutex<Option<Duration>>,
}

impl Failure {
    fn set(&self, error: Option<GatewayError>) {
        if let Ok(mut slot) = self.error.lock() {
            *slot = error;
        }
    }

    fn set_delay(&self, delay: Option<Duration>) {
        if let Ok(mut slot) = self.delay.lock() {
            *slot = delay;
        }
    }

    async fn check(&self) -> Result<(), GatewayError> {
        let delay = self.delay.lock().ok().and_then(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.error.lock() {
            Ok(slot) => slot.clone().map_or(Ok(()), Err),
            Err(_) => Err(GatewayError::Unavailable("null gateway".into())),
        }
    }
}

fn recorded<T: Clone>(log: &Mutex<Vec<T>>) -> Vec<T> {
    log.lock().map(|l| l.clone()).unwrap_or_default()
}

/// Identity provider that hands out sequential session ids.
#[derive(Default)]
pub struct NullVerificationGateway {
    next: AtomicU64,
    requests: Mutex<Vec<VerificationRequest>>,
    failure: Failure,
}

impl NullVerificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: Option<GatewayError>) {
        self.failure.set(error);
    }

    /// Make every call take `delay` before answering.
    pub fn delay(&self, delay: Option<Duration>) {
        self.failure.set_delay(delay);
    }

    pub fn requests(&self) -> Vec<VerificationRequest> {
        recorded(&self.requests)
    }
}

#[async_trait]
impl VerificationGateway for NullVerificationGateway {
    async fn start_session(
        &self,
        request: VerificationRequest,
    ) -> Result<VerificationSession, GatewayError> {
        self.failure.check().await?;
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut log) = self.requests.lock() {
            log.push(request);
        }
        Ok(VerificationSession {
            session_id: format!("vs_null_{n}"),
            url: format!("https://verify.invalid/session/vs_null_{n}"),
        })
    }
}

/// SMS sink.
#[derive(Default)]
pub struct NullNotifier {
    sent: Mutex<Vec<(String, String)>>,
    failure: Failure,
}

impl NullNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: Option<GatewayError>) {
        self.failure.set(error);
    }

    /// `(recipient, body)` of every delivered message.
    pub fn sent(&self) -> Vec<(String, String)> {
        recorded(&self.sent)
    }
}

#[async_trait]
impl Notifier for NullNotifier {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), GatewayError> {
        self.failure.check().await?;
        if let Ok(mut log) = self.sent.lock() {
            log.push((to.to_string(), body.to_string()));
        }
        Ok(())
    }
}

/// Wallet signer that counts issuances.
#[derive(Default)]
pub struct NullWalletIssuer {
    requests: Mutex<Vec<WalletPassRequest>>,
    failure: Failure,
}

impl NullWalletIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: Option<GatewayError>) {
        self.failure.set(error);
    }

    pub fn issued(&self) -> Vec<WalletPassRequest> {
        recorded(&self.requests)
    }
}

#[async_trait]
impl WalletIssuer for NullWalletIssuer {
    async fn issue(&self, request: WalletPassRequest) -> Result<WalletArtifact, GatewayError> {
        self.failure.check().await?;
        let serial = request.pass_id.to_string();
        if let Ok(mut log) = self.requests.lock() {
            log.push(request);
        }
        Ok(WalletArtifact {
            url: format!("https://wallet.invalid/passes/{serial}.pkpass"),
            serial,
        })
    }
}

/// Membership provider backed by a credential table.
#[derive(Default)]
pub struct NullMembership {
    members: Mutex<HashMap<String, MemberProfile>>,
    failure: Failure,
}

impl NullMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(self, credential: impl Into<String>, profile: MemberProfile) -> Self {
        if let Ok(mut members) = self.members.lock() {
            members.insert(credential.into(), profile);
        }
        self
    }

    pub fn fail_with(&self, error: Option<GatewayError>) {
        self.failure.set(error);
    }
}

#[async_trait]
impl MembershipProvider for NullMembership {
    async fn authenticate(&self, credential: &str) -> Result<MemberProfile, GatewayError> {
        self.failure.check().await?;
        self.members
            .lock()
            .ok()
            .and_then(|members| members.get(credential).cloned())
            .ok_or_else(|| GatewayError::Rejected("unknown credential".into()))
    }
}
