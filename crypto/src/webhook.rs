//! Signatures on identity-provider webhook deliveries.
//!
//! Header format: `t=<unix seconds>,v1=<hex HMAC-SHA256(secret, "{t}.{body}")>`.
//! Several `v1` entries may be present while the provider rotates secrets;
//! any one matching is enough.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use guestpass_types::Timestamp;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "identity-signature";
pub const DEFAULT_TOLERANCE_SECS: u64 = 300;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WebhookSignatureError {
    #[error("malformed signature header")]
    Malformed,

    #[error("signature timestamp outside tolerance")]
    Stale,

    #[error("no signature matched")]
    Mismatch,

    #[error("webhook secret not configured")]
    SecretUnavailable,
}

fn mac_for(secret: &[u8], timestamp: u64, body: &[u8]) -> Result<HmacSha256, WebhookSignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|_| WebhookSignatureError::SecretUnavailable)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Header value for `body` signed at `timestamp`.
pub fn sign_webhook_payload(
    secret: &[u8],
    timestamp: Timestamp,
    body: &[u8],
) -> Result<String, WebhookSignatureError> {
    let mac = mac_for(secret, timestamp.as_secs(), body)?;
    Ok(format!(
        "t={},v1={}",
        timestamp.as_secs(),
        hex::encode(mac.finalize().into_bytes())
    ))
}

pub fn verify_webhook_signature(
    secret: &[u8],
    header: &str,
    body: &[u8],
    now: Timestamp,
    tolerance_secs: u64,
) -> Result<(), WebhookSignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| WebhookSignatureError::Malformed)?,
                )
            }
            Some(("v1", value)) => {
                signatures.push(hex::decode(value).map_err(|_| WebhookSignatureError::Malformed)?)
            }
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(WebhookSignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(WebhookSignatureError::Malformed);
    }
    if now.as_secs().abs_diff(timestamp) > tolerance_secs {
        return Err(WebhookSignatureError::Stale);
    }
    for candidate in &signatures {
        if mac_for(secret, timestamp, body)?.verify_slice(candidate).is_ok() {
            return Ok(());
        }
    }
    Err(WebhookSignatureError::Mismatch)
}
