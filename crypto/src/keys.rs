//! Signing key ring with `kid` based rotation.
//!
//! Exactly one key is active for signing. Older keys may stay in the ring as
//! verify-only so tokens minted before a rotation keep working until they
//! expire. A key whose secret is missing from the environment stays listed so
//! that tokens naming it fail with a configuration error rather than an
//! "unknown kid".

use std::collections::HashMap;
use std::fmt;

use crate::TokenError;

#[derive(Clone)]
struct KeyEntry {
    secret: Option<Vec<u8>>,
    verify_only: bool,
}

#[derive(Clone, Default)]
pub struct KeyRing {
    active_kid: Option<String>,
    keys: HashMap<String, KeyEntry>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key and make it the signing key.
    pub fn with_signing_key(mut self, kid: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        let kid = kid.into();
        self.keys.insert(
            kid.clone(),
            KeyEntry {
                secret: Some(secret.into()),
                verify_only: false,
            },
        );
        self.active_kid = Some(kid);
        self
    }

    /// Add a key that is accepted on verification but never signs.
    pub fn with_verify_only_key(
        mut self,
        kid: impl Into<String>,
        secret: impl Into<Vec<u8>>,
    ) -> Self {
        self.keys.insert(
            kid.into(),
            KeyEntry {
                secret: Some(secret.into()),
                verify_only: true,
            },
        );
        self
    }

    /// Register a key whose secret is not configured.
    pub fn with_unavailable_key(mut self, kid: impl Into<String>, active: bool) -> Self {
        let kid = kid.into();
        self.keys.insert(
            kid.clone(),
            KeyEntry {
                secret: None,
                verify_only: !active,
            },
        );
        if active {
            self.active_kid = Some(kid);
        }
        self
    }

    pub fn active_kid(&self) -> Option<&str> {
        self.active_kid.as_deref()
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    /// The active kid and its secret.
    pub fn signing_secret(&self) -> Result<(&str, &[u8]), TokenError> {
        let kid = self
            .active_kid
            .as_deref()
            .ok_or_else(|| TokenError::KeyUnavailable("no active signing key".into()))?;
        let entry = self
            .keys
            .get(kid)
            .ok_or_else(|| TokenError::KeyUnavailable(kid.to_string()))?;
        if entry.verify_only {
            return Err(TokenError::KeyUnavailable(format!("{kid} is verify-only")));
        }
        let secret = entry
            .secret
            .as_deref()
            .ok_or_else(|| TokenError::KeyUnavailable(kid.to_string()))?;
        Ok((kid, secret))
    }

    pub fn verification_secret(&self, kid: &str) -> Result<&[u8], TokenError> {
        let entry = self
            .keys
            .get(kid)
            .ok_or_else(|| TokenError::UnknownKid(kid.to_string()))?;
        entry
            .secret
            .as_deref()
            .ok_or_else(|| TokenError::KeyUnavailable(kid.to_string()))
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kids: Vec<&String> = self.keys.keys().collect();
        kids.sort();
        f.debug_struct("KeyRing")
            .field("active_kid", &self.active_kid)
            .field("kids", &kids)
            .finish()
    }
}
