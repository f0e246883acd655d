//! HTTP clients for the external collaborators.
//!
//! Each client posts JSON to `{endpoint}/{path}` with an optional bearer
//! key. Transport failures and 5xx answers are `Unavailable` (retryable);
//! 4xx answers are `Rejected`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::json;

use guestpass_lifecycle::{
    GatewayError, MemberProfile, MembershipProvider, Notifier, VerificationGateway,
    VerificationRequest, VerificationSession, WalletArtifact, WalletIssuer, WalletPassRequest,
};
use guestpass_types::Role;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// One configured endpoint.
#[derive(Clone)]
pub struct HttpEndpoint {
    name: &'static str,
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpEndpoint {
    pub fn new(
        name: &'static str,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .unwrap_or_default();
        Self {
            name,
            http_client,
            base_url: base_url.into(),
            api_key,
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let mut request = self.http_client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(self.name.to_string())
            } else {
                GatewayError::Unavailable(format!("{}: {e}", self.name))
            }
        })?;

        let status = response.status();
        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected(format!(
                "{} answered {status}: {detail}",
                self.name
            )));
        }
        if !status.is_success() {
            return Err(GatewayError::Unavailable(format!(
                "{} answered {status}",
                self.name
            )));
        }
        response.json().await.map_err(|e| {
            GatewayError::Unavailable(format!("{}: unreadable response: {e}", self.name))
        })
    }
}

// ── Identity verification ──────────────────────────────────────────────

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: String,
}

/// `POST {endpoint}/verification_sessions`
pub struct HttpVerificationGateway(pub HttpEndpoint);

#[async_trait]
impl VerificationGateway for HttpVerificationGateway {
    async fn start_session(
        &self,
        request: VerificationRequest,
    ) -> Result<VerificationSession, GatewayError> {
        let body = json!({
            "type": "document",
            "return_url": request.return_url,
            "provided_details": {
                "email": request.email,
                "first_name": request.first_name,
                "last_name": request.last_name,
            },
            "metadata": { "guest_pass_id": request.pass_id.as_str() },
        });
        let session: SessionResponse = self.0.post("verification_sessions", &body).await?;
        Ok(VerificationSession {
            session_id: session.id,
            url: session.url,
        })
    }
}

// ── SMS ────────────────────────────────────────────────────────────────

/// `POST {endpoint}/messages`
pub struct HttpNotifier(pub HttpEndpoint);

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), GatewayError> {
        let _: IgnoredAny = self
            .0
            .post("messages", &json!({ "to": to, "body": body }))
            .await?;
        Ok(())
    }
}

// ── Wallet passes ──────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletResponse {
    url: String,
    serial_number: String,
}

/// `POST {endpoint}/passes`
pub struct HttpWalletIssuer(pub HttpEndpoint);

#[async_trait]
impl WalletIssuer for HttpWalletIssuer {
    async fn issue(&self, request: WalletPassRequest) -> Result<WalletArtifact, GatewayError> {
        let body = json!({
            "passId": request.pass_id.as_str(),
            "guestName": request.guest_name,
            "hostName": request.host_name,
            "visitDate": request.visit_date,
            "floor": request.floor,
            "barcode": { "format": "qr", "message": request.qr_payload },
        });
        let issued: WalletResponse = self.0.post("passes", &body).await?;
        Ok(WalletArtifact {
            url: issued.url,
            serial: issued.serial_number,
        })
    }
}

// ── Membership ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberResponse {
    id: String,
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    verified: bool,
    #[serde(default)]
    role: Option<String>,
}

/// `POST {endpoint}/authenticate`
pub struct HttpMembership(pub HttpEndpoint);

#[async_trait]
impl MembershipProvider for HttpMembership {
    async fn authenticate(&self, credential: &str) -> Result<MemberProfile, GatewayError> {
        let member: MemberResponse = self
            .0
            .post("authenticate", &json!({ "credential": credential }))
            .await?;
        let role = match member.role.as_deref() {
            Some(raw) => raw
                .parse()
                .map_err(|_| GatewayError::Rejected(format!("unknown role {raw}")))?,
            None => Role::Resident,
        };
        Ok(MemberProfile {
            external_id: member.id,
            name: member.name,
            email: member.email,
            phone: member.phone,
            unit: member.unit,
            verified_member: member.verified,
            role,
        })
    }
}

// ── Unconfigured ───────────────────────────────────────────────────────

/// Stand-in for a collaborator with no endpoint configured.
pub struct Unconfigured(pub &'static str);

impl Unconfigured {
    fn error(&self) -> GatewayError {
        GatewayError::NotConfigured(self.0.to_string())
    }
}

#[async_trait]
impl VerificationGateway for Unconfigured {
    async fn start_session(&self, _: VerificationRequest) -> Result<VerificationSession, GatewayError> {
        Err(self.error())
    }
}

#[async_trait]
impl Notifier for Unconfigured {
    async fn send_sms(&self, _: &str, _: &str) -> Result<(), GatewayError> {
        Err(self.error())
    }
}

#[async_trait]
impl WalletIssuer for Unconfigured {
    async fn issue(&self, _: WalletPassRequest) -> Result<WalletArtifact, GatewayError> {
        Err(self.error())
    }
}

#[async_trait]
impl MembershipProvider for Unconfigured {
    async fn authenticate(&self, _: &str) -> Result<MemberProfile, GatewayError> {
        Err(self.error())
    }
}

/// The four collaborators, ready for `EngineDeps`.
pub struct Gateways {
    pub verification: Arc<dyn VerificationGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub wallet: Arc<dyn WalletIssuer>,
    pub membership: Arc<dyn MembershipProvider>,
}

impl Gateways {
    /// HTTP clients for configured endpoints, `Unconfigured` for the rest.
    pub fn http(
        verification_url: Option<&str>,
        sms_url: Option<&str>,
        wallet_url: Option<&str>,
        membership_url: Option<&str>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let endpoint =
            |name: &'static str, url: &str| HttpEndpoint::new(name, url, api_key.clone(), timeout);
        Self {
            verification: match verification_url {
                Some(url) => Arc::new(HttpVerificationGateway(endpoint("identity provider", url))),
                None => Arc::new(Unconfigured("identity provider")),
            },
            notifier: match sms_url {
                Some(url) => Arc::new(HttpNotifier(endpoint("sms gateway", url))),
                None => Arc::new(Unconfigured("sms gateway")),
            },
            wallet: match wallet_url {
                Some(url) => Arc::new(HttpWalletIssuer(endpoint("wallet signer", url))),
                None => Arc::new(Unconfigured("wallet signer")),
            },
            membership: match membership_url {
                Some(url) => Arc::new(HttpMembership(endpoint("membership provider", url))),
                None => Arc::new(Unconfigured("membership provider")),
            },
        }
    }
}
