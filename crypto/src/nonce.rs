//! Random identifiers: token ids, single-use nonces and key material.

use uuid::Uuid;

/// A fresh single-use nonce (128-bit random, hex).
pub fn generate_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A fresh `jti`.
pub fn generate_token_id() -> String {
    Uuid::new_v4().to_string()
}

/// `len` bytes of OS randomness, for signing and webhook secrets.
pub fn generate_secret(len: usize) -> Result<Vec<u8>, getrandom::Error> {
    let mut secret = vec![0u8; len];
    getrandom::getrandom(&mut secret)?;
    Ok(secret)
}
