//! Resident sessions: exchanging a membership credential for a bearer
//! token, and authenticating requests that present one.

use serde::Serialize;
use tracing::{info, warn};

use guestpass_crypto::{Audience, TokenRequest};
use guestpass_types::{Resident, ResidentId, Role, Timestamp};

use crate::{GatewayError, PassEngine, PassError};

/// An authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub resident_id: ResidentId,
    pub role: Role,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub token: String,
    pub expires_at: String,
    pub resident_id: String,
    pub name: String,
    pub role: Role,
    pub verified_member: bool,
}

impl PassEngine {
    /// Authenticate a membership credential, refresh the resident record and
    /// mint a session token.
    pub async fn open_session(&self, credential: &str) -> Result<SessionGrant, PassError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(PassError::InvalidInput("credential is required".into()));
        }
        let profile = self
            .call(
                "membership provider",
                self.deps.membership.authenticate(credential),
            )
            .await
            .map_err(|e| match e {
                GatewayError::Rejected(reason) => PassError::Unauthorized(reason),
                other => other.into(),
            })?;

        let now = self.now();
        let resident = match self
            .deps
            .store
            .find_resident_by_external_id(&profile.external_id)?
        {
            Some(existing) => Resident {
                name: profile.name,
                email: profile.email,
                phone: profile.phone,
                unit: profile.unit,
                verified_member: profile.verified_member,
                role: profile.role,
                last_login_at: now,
                ..existing
            },
            None => Resident {
                id: ResidentId::generate(),
                external_id: profile.external_id,
                name: profile.name,
                email: profile.email,
                phone: profile.phone,
                unit: profile.unit,
                verified_member: profile.verified_member,
                role: profile.role,
                created_at: now,
                last_login_at: now,
            },
        };
        self.deps.store.put_resident(&resident)?;

        let minted = self.deps.codec.mint(
            TokenRequest::new(
                Audience::ResidentSession,
                resident.id.as_str(),
                now.plus_secs(self.config.session_ttl_secs),
            )
            .role(resident.role.as_str()),
            now,
        )?;
        info!(resident_id = %resident.id, role = %resident.role, "session opened");

        Ok(SessionGrant {
            token: minted.token,
            expires_at: Timestamp::new(minted.claims.exp).to_rfc3339(),
            resident_id: resident.id.to_string(),
            name: resident.name,
            role: resident.role,
            verified_member: resident.verified_member,
        })
    }

    /// Verify a session token. Any token failure is `Unauthorized`, except a
    /// missing signing key.
    pub fn authenticate(&self, token: &str) -> Result<Session, PassError> {
        let claims = self
            .deps
            .codec
            .verify(token, &[Audience::ResidentSession], self.now())
            .map_err(|e| {
                if e.is_misconfiguration() {
                    PassError::from(e)
                } else {
                    warn!(error = %e, "rejected session token");
                    PassError::Unauthorized(e.to_string())
                }
            })?;
        let resident_id = ResidentId::parse(&claims.sub)
            .map_err(|e| PassError::Unauthorized(e.to_string()))?;
        let role = match claims.role.as_deref() {
            Some(role) => role
                .parse()
                .map_err(|_| PassError::Unauthorized(format!("unknown role {role}")))?,
            None => Role::Resident,
        };
        Ok(Session { resident_id, role })
    }
}
