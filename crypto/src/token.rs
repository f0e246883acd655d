//! Signed tokens (HS256 JWT) with audiences and `kid` rotation.
//!
//! # Token format
//!
//! - Header: `{"alg":"HS256","typ":"JWT","kid":"<kid>"}`
//! - Payload: [`Claims`]
//! - Signature: HMAC-SHA256 over `base64url(header).base64url(payload)`
//!
//! Verification runs in a fixed order: format, header, key lookup,
//! signature, expiry, issuer, audience. An expired token is therefore
//! reported as expired before any claim is looked at.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

use guestpass_types::Timestamp;

use crate::{nonce, KeyRing, TokenError};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

/// Who a token is meant for. A token is only accepted on paths that list its
/// audience.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Audience {
    /// Short-lived QR shown at the door.
    DoorScanner,
    /// Invite link, leads to registration.
    GuestPrereg,
    /// Registration link, leads to the identity check.
    GuestVerification,
    /// Signed-in resident, staff or admin.
    ResidentSession,
}

impl Audience {
    pub const ALL: [Audience; 4] = [
        Audience::DoorScanner,
        Audience::GuestPrereg,
        Audience::GuestVerification,
        Audience::ResidentSession,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DoorScanner => "door-scanner",
            Self::GuestPrereg => "guest-prereg",
            Self::GuestVerification => "guest-verification",
            Self::ResidentSession => "resident-session",
        }
    }

    pub fn default_ttl_secs(&self) -> u64 {
        match self {
            Self::DoorScanner => 10 * 60,
            Self::GuestPrereg => 24 * 60 * 60,
            Self::GuestVerification => 48 * 60 * 60,
            Self::ResidentSession => 8 * 60 * 60,
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|aud| aud.as_str() == s)
            .ok_or_else(|| TokenError::Malformed(format!("unknown audience {s}")))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
    #[serde(default)]
    kid: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub aud: String,
    /// Pass id, or resident id for session tokens.
    pub sub: String,
    /// Unique token id; the replay-ledger key for door tokens.
    pub jti: String,
    pub iat: u64,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Single-use nonce; absent only on tokens minted before nonces existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Claims {
    pub fn expires_at(&self) -> Timestamp {
        Timestamp::new(self.exp)
    }

    pub fn issued_at(&self) -> Timestamp {
        Timestamp::new(self.iat)
    }
}

/// Parameters for a token about to be minted.
#[derive(Clone, Debug)]
pub struct TokenRequest {
    audience: Audience,
    subject: String,
    expires_at: Timestamp,
    host: Option<String>,
    nonce: Option<String>,
    role: Option<String>,
}

impl TokenRequest {
    pub fn new(audience: Audience, subject: impl Into<String>, expires_at: Timestamp) -> Self {
        Self {
            audience,
            subject: subject.into(),
            expires_at,
            host: None,
            nonce: None,
            role: None,
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

#[derive(Clone, Debug)]
pub struct MintedToken {
    pub token: String,
    pub claims: Claims,
}

/// Mints and verifies signed tokens for one issuer.
#[derive(Clone, Debug)]
pub struct TokenCodec {
    issuer: String,
    keys: KeyRing,
}

impl TokenCodec {
    pub fn new(issuer: impl Into<String>, keys: KeyRing) -> Self {
        Self {
            issuer: issuer.into(),
            keys,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    pub fn mint(&self, request: TokenRequest, now: Timestamp) -> Result<MintedToken, TokenError> {
        let (kid, secret) = self.keys.signing_secret()?;
        let claims = Claims {
            iss: self.issuer.clone(),
            aud: request.audience.as_str().to_string(),
            sub: request.subject,
            jti: nonce::generate_token_id(),
            iat: now.as_secs(),
            exp: request.expires_at.as_secs(),
            host: request.host,
            nonce: request.nonce,
            role: request.role,
        };
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
            kid: Some(kid.to_string()),
        };
        let token = encode(&header, &claims, secret)?;
        Ok(MintedToken { token, claims })
    }

    /// Verify `token` and require its audience to be one of `accepted`.
    pub fn verify(
        &self,
        token: &str,
        accepted: &[Audience],
        now: Timestamp,
    ) -> Result<Claims, TokenError> {
        let mut parts = token.trim().split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed("expected three segments".into()));
        };

        let header: Header = decode_segment(header_b64)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::Malformed(format!(
                "unsupported algorithm {}",
                header.alg
            )));
        }
        let kid = header.kid.ok_or(TokenError::MissingKid)?;
        let secret = self.keys.verification_secret(&kid)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed("signature is not base64url".into()))?;
        let mut mac = HmacSha256::new_from_slice(secret)
            .map_err(|_| TokenError::KeyUnavailable(kid.clone()))?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = decode_segment(payload_b64)?;
        if claims.expires_at().is_reached_at(now) {
            return Err(TokenError::Expired);
        }
        if claims.iss != self.issuer {
            return Err(TokenError::IssuerMismatch);
        }
        if !accepted.iter().any(|aud| aud.as_str() == claims.aud) {
            let expected = accepted
                .iter()
                .map(Audience::as_str)
                .collect::<Vec<_>>()
                .join("|");
            return Err(TokenError::AudienceMismatch {
                expected,
                found: claims.aud,
            });
        }
        Ok(claims)
    }
}

fn encode(header: &Header, claims: &Claims, secret: &[u8]) -> Result<String, TokenError> {
    let header_json =
        serde_json::to_vec(header).map_err(|e| TokenError::Malformed(e.to_string()))?;
    let claims_json =
        serde_json::to_vec(claims).map_err(|e| TokenError::Malformed(e.to_string()))?;
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| TokenError::KeyUnavailable(e.to_string()))?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{signing_input}.{signature}"))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed("segment is not base64url".into()))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))
}
