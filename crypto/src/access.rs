//! Door access tokens: one dispatch over both QR formats.

use guestpass_types::{BuildingCalendar, EntryMethod, PassId, Timestamp};

use crate::{Audience, TokenCodec, TokenError, WalletQr};

/// What a scanner read off a guest's screen or wallet pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresentedToken {
    /// Short-lived HS256 token (`door-scanner` audience).
    Signed(String),
    /// Wallet payload carrying a keyed hash.
    HashBound(WalletQr),
}

impl PresentedToken {
    /// JSON objects are wallet payloads; anything else is treated as a
    /// signed token.
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TokenError::Malformed("empty token".into()));
        }
        if raw.starts_with('{') {
            let qr: WalletQr = serde_json::from_str(raw)
                .map_err(|e| TokenError::Malformed(format!("wallet payload: {e}")))?;
            if qr.pass_id.is_empty() || qr.security_hash.is_empty() {
                return Err(TokenError::Malformed("wallet payload lacks passId".into()));
            }
            return Ok(Self::HashBound(qr));
        }
        Ok(Self::Signed(raw.to_string()))
    }

    pub fn method(&self) -> EntryMethod {
        match self {
            Self::Signed(_) => EntryMethod::SignedQr,
            Self::HashBound(_) => EntryMethod::WalletQr,
        }
    }
}

/// A cryptographically valid door token, not yet checked against the pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessGrant {
    pub pass_id: PassId,
    pub token_id: String,
    pub method: EntryMethod,
    /// Resident the token names, when it names one.
    pub host: Option<String>,
    /// Guest email bound into a wallet hash.
    pub guest_email: Option<String>,
    pub expires_at: Option<Timestamp>,
}

#[derive(Clone, Debug)]
pub struct AccessVerifier {
    codec: TokenCodec,
    wallet_secret: Option<Vec<u8>>,
    calendar: BuildingCalendar,
}

impl AccessVerifier {
    pub fn new(
        codec: TokenCodec,
        wallet_secret: Option<Vec<u8>>,
        calendar: BuildingCalendar,
    ) -> Self {
        Self {
            codec,
            wallet_secret,
            calendar,
        }
    }

    pub fn verify(&self, token: &PresentedToken, now: Timestamp) -> Result<AccessGrant, TokenError> {
        match token {
            PresentedToken::Signed(raw) => {
                let claims = self.codec.verify(raw, &[Audience::DoorScanner], now)?;
                let pass_id = PassId::parse(&claims.sub)
                    .map_err(|e| TokenError::Malformed(e.to_string()))?;
                Ok(AccessGrant {
                    pass_id,
                    expires_at: Some(claims.expires_at()),
                    token_id: claims.jti,
                    method: EntryMethod::SignedQr,
                    host: claims.host,
                    guest_email: None,
                })
            }
            PresentedToken::HashBound(qr) => {
                let secret = self
                    .wallet_secret
                    .as_deref()
                    .ok_or_else(|| TokenError::KeyUnavailable("wallet secret".into()))?;
                let expires_at = qr.verify(secret, now, &self.calendar)?;
                let pass_id = PassId::parse(&qr.pass_id)
                    .map_err(|e| TokenError::Malformed(e.to_string()))?;
                Ok(AccessGrant {
                    pass_id,
                    token_id: qr.token_id(),
                    method: EntryMethod::WalletQr,
                    host: Some(qr.resident_id.clone()),
                    guest_email: Some(qr.guest_email.clone()),
                    expires_at,
                })
            }
        }
    }
}
