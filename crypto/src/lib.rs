//! Token codec for the guest pass service.
//!
//! - **HS256** signed tokens with audiences and `kid` key rotation
//! - **Wallet QR** payloads protected by a keyed SHA-256 hash
//! - A single [`PresentedToken`] dispatch over both door formats
//! - Webhook signature checks and random nonce generation

pub mod access;
pub mod error;
pub mod keys;
pub mod nonce;
pub mod token;
pub mod wallet_qr;
pub mod webhook;

pub use access::{AccessGrant, AccessVerifier, PresentedToken};
pub use error::TokenError;
pub use keys::KeyRing;
pub use nonce::{generate_nonce, generate_secret, generate_token_id};
pub use token::{Audience, Claims, MintedToken, TokenCodec, TokenRequest};
pub use wallet_qr::{security_hash, WalletQr};
pub use webhook::{
    sign_webhook_payload, verify_webhook_signature, WebhookSignatureError,
    DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER,
};
