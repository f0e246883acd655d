//! Interfaces to the external collaborators the engine drives: identity
//! verification, SMS delivery, wallet-pass signing and the membership
//! provider. Every call is wrapped in the engine's timeout.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use guestpass_types::{PassId, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{0} timed out")]
    Timeout(String),

    #[error("{0} unavailable")]
    Unavailable(String),

    /// The collaborator answered and refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("{0} not configured")]
    NotConfigured(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationRequest {
    pub pass_id: PassId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    /// Where the provider sends the guest when the check is done.
    pub return_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationSession {
    pub session_id: String,
    /// Hosted page where the guest captures document and selfie.
    pub url: String,
}

#[async_trait]
pub trait VerificationGateway: Send + Sync {
    async fn start_session(
        &self,
        request: VerificationRequest,
    ) -> Result<VerificationSession, GatewayError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), GatewayError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletPassRequest {
    pub pass_id: PassId,
    pub guest_name: String,
    pub host_name: Option<String>,
    pub visit_date: NaiveDate,
    pub floor: Option<String>,
    /// Hash-bound QR payload (JSON) to embed in the pass barcode.
    pub qr_payload: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletArtifact {
    pub url: String,
    pub serial: String,
}

#[async_trait]
pub trait WalletIssuer: Send + Sync {
    async fn issue(&self, request: WalletPassRequest) -> Result<WalletArtifact, GatewayError>;
}

/// What the membership provider knows about a signed-in member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberProfile {
    pub external_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub unit: Option<String>,
    pub verified_member: bool,
    pub role: Role,
}

#[async_trait]
pub trait MembershipProvider: Send + Sync {
    /// Exchange a provider credential for the member's profile.
    /// `Rejected` means the credential is not valid.
    async fn authenticate(&self, credential: &str) -> Result<MemberProfile, GatewayError>;
}
