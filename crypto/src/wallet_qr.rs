//! Hash-bound QR payload embedded in mobile-wallet passes.
//!
//! The payload is plain JSON. Its integrity rests on `securityHash`, the
//! first 16 hex characters of
//! `SHA-256("{passId}_{guestEmail}_{residentId}_{secret}")`. There is no key
//! rotation for this format: changing the wallet secret invalidates every
//! wallet pass already issued.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use guestpass_types::{BuildingCalendar, Pass, Timestamp};

use crate::TokenError;

const HASH_LEN: usize = 16;
const TOKEN_ID_PREFIX: &str = "enhanced-qr-";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletQr {
    pub pass_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
    #[serde(default)]
    pub guest_email: String,
    pub resident_id: String,
    pub security_hash: String,
    /// RFC 3339 instant, or a bare date meaning the end of that local day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_type: Option<String>,
}

pub fn security_hash(pass_id: &str, guest_email: &str, resident_id: &str, secret: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pass_id.as_bytes());
    hasher.update(b"_");
    hasher.update(guest_email.as_bytes());
    hasher.update(b"_");
    hasher.update(resident_id.as_bytes());
    hasher.update(b"_");
    hasher.update(secret);
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(HASH_LEN);
    hex
}

impl WalletQr {
    /// Build the payload for an approved pass, valid through its visit day.
    pub fn issue(pass: &Pass, secret: &[u8], building_code: Option<&str>) -> Self {
        let guest_email = pass.guest.email.clone().unwrap_or_default();
        let visit_date = pass.visit_date.format("%Y-%m-%d").to_string();
        Self {
            security_hash: security_hash(
                pass.id.as_str(),
                &guest_email,
                pass.resident_id.as_str(),
                secret,
            ),
            pass_id: pass.id.to_string(),
            guest_name: Some(pass.guest.name.clone()),
            guest_email,
            resident_id: pass.resident_id.to_string(),
            valid_until: Some(visit_date.clone()),
            visit_date: Some(visit_date),
            building_code: building_code.map(str::to_string),
            pass_type: Some("wallet".to_string()),
        }
    }

    pub fn to_json(&self) -> Result<String, TokenError> {
        serde_json::to_string(self).map_err(|e| TokenError::Malformed(e.to_string()))
    }

    /// Replay-ledger key; stable for the lifetime of the pass.
    pub fn token_id(&self) -> String {
        format!("{TOKEN_ID_PREFIX}{}", self.security_hash)
    }

    pub fn expires_at(&self, calendar: &BuildingCalendar) -> Result<Option<Timestamp>, TokenError> {
        let Some(raw) = self.valid_until.as_deref() else {
            return Ok(None);
        };
        if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Some(Timestamp::from_datetime(instant.with_timezone(&Utc))));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|date| Some(calendar.end_of_day(date)))
            .map_err(|_| TokenError::Malformed(format!("unreadable validUntil {raw}")))
    }

    /// Recompute the hash, then check `validUntil` (inclusive).
    pub fn verify(
        &self,
        secret: &[u8],
        now: Timestamp,
        calendar: &BuildingCalendar,
    ) -> Result<Option<Timestamp>, TokenError> {
        let expected = security_hash(&self.pass_id, &self.guest_email, &self.resident_id, secret);
        if !constant_time_eq(expected.as_bytes(), self.security_hash.as_bytes()) {
            return Err(TokenError::HashMismatch);
        }
        let expires_at = self.expires_at(calendar)?;
        if expires_at.is_some_and(|exp| exp.is_reached_at(now)) {
            return Err(TokenError::Expired);
        }
        Ok(expires_at)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
