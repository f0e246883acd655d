use thiserror::Error;

/// Reasons a presented token is refused or cannot be produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token header carries no key id")]
    MissingKid,

    #[error("unknown key id: {0}")]
    UnknownKid(String),

    #[error("invalid token signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("token issuer mismatch")]
    IssuerMismatch,

    #[error("token audience mismatch: expected {expected}, found {found}")]
    AudienceMismatch { expected: String, found: String },

    #[error("security hash mismatch")]
    HashMismatch,

    /// The key material needed for this operation is not configured.
    #[error("key unavailable: {0}")]
    KeyUnavailable(String),
}

impl TokenError {
    /// Whether the failure stems from configuration rather than the token.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, Self::KeyUnavailable(_))
    }
}
