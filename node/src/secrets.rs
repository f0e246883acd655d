//! Resolving secrets named in the config.
//!
//! Values are taken verbatim as bytes, or hex-decoded when prefixed with
//! `hex:`. A missing secret only disables what needs it.

use tracing::warn;

use guestpass_crypto::KeyRing;

use crate::config::TokensConfig;
use crate::NodeError;

const HEX_PREFIX: &str = "hex:";

/// Where secret values come from.
pub trait SecretSource {
    fn get(&self, name: &str) -> Option<String>;
}

/// The process environment.
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl<F> SecretSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        self(name)
    }
}

pub fn decode_secret(raw: &str) -> Result<Vec<u8>, NodeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(NodeError::Secret("empty secret".into()));
    }
    match raw.strip_prefix(HEX_PREFIX) {
        Some(encoded) => hex::decode(encoded).map_err(|e| NodeError::Secret(e.to_string())),
        None => Ok(raw.as_bytes().to_vec()),
    }
}

/// `Ok(None)` when the variable is unset.
pub fn load_secret(source: &dyn SecretSource, name: &str) -> Result<Option<Vec<u8>>, NodeError> {
    match source.get(name) {
        None => {
            warn!(env = name, "secret not set");
            Ok(None)
        }
        Some(raw) => decode_secret(&raw)
            .map(Some)
            .map_err(|e| NodeError::Secret(format!("{name}: {e}"))),
    }
}

/// Build the token key ring. Keys whose secret is missing stay in the ring
/// as unavailable, so tokens naming them fail as a misconfiguration.
pub fn load_key_ring(tokens: &TokensConfig, source: &dyn SecretSource) -> Result<KeyRing, NodeError> {
    let mut ring = KeyRing::new();
    for key in &tokens.keys {
        let active = key.kid == tokens.active_kid && !key.verify_only;
        ring = match load_secret(source, &key.secret_env)? {
            Some(secret) if active => ring.with_signing_key(key.kid.clone(), secret),
            Some(secret) => ring.with_verify_only_key(key.kid.clone(), secret),
            None => ring.with_unavailable_key(key.kid.clone(), active),
        };
    }
    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyConfig;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn tokens() -> TokensConfig {
        TokensConfig {
            active_kid: "k2".into(),
            keys: vec![
                KeyConfig {
                    kid: "k1".into(),
                    secret_env: "KEY_ONE".into(),
                    verify_only: true,
                },
                KeyConfig {
                    kid: "k2".into(),
                    secret_env: "KEY_TWO".into(),
                    verify_only: false,
                },
            ],
            ..TokensConfig::default()
        }
    }

    #[test]
    fn hex_prefix_is_decoded() {
        assert_eq!(decode_secret("hex:0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert_eq!(decode_secret("plain").unwrap(), b"plain".to_vec());
        assert!(decode_secret("hex:zz").is_err());
        assert!(decode_secret("  ").is_err());
    }

    #[test]
    fn active_key_signs_and_old_keys_verify() {
        let ring = load_key_ring(&tokens(), &source(&[("KEY_ONE", "one"), ("KEY_TWO", "two")]))
            .unwrap();
        let (kid, secret) = ring.signing_secret().unwrap();
        assert_eq!(kid, "k2");
        assert_eq!(secret, b"two");
        assert_eq!(ring.verification_secret("k1").unwrap(), b"one");
    }

    #[test]
    fn missing_signing_secret_leaves_verification_working() {
        let ring = load_key_ring(&tokens(), &source(&[("KEY_ONE", "one")])).unwrap();
        assert!(ring.signing_secret().is_err());
        assert!(ring.verification_secret("k1").is_ok());
        assert!(ring.contains("k2"));
    }
}
