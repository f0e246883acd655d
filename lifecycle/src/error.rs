use chrono::NaiveDate;
use thiserror::Error;

use guestpass_crypto::TokenError;
use guestpass_store::StoreError;
use guestpass_types::PassStatus;

use crate::GatewayError;

/// Every way an engine operation can be refused or fail.
///
/// Guard failures never mutate state. `code()` is the stable reason string
/// reported to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PassError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("Invalid or used token")]
    InvalidOrUsedToken,

    #[error("Pass is for {visit_date}, today is {today}")]
    WrongDay {
        visit_date: NaiveDate,
        today: NaiveDate,
    },

    #[error("Pass is {0}")]
    PassNotScheduled(PassStatus),

    #[error("already processed: {0}")]
    AlreadyProcessed(String),

    #[error("pass not found: {0}")]
    PassNotFound(String),

    #[error("cannot {event} a pass that is {from}")]
    InvalidTransition {
        from: PassStatus,
        event: &'static str,
    },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("dependency failure: {0}")]
    TransientDependencyFailure(String),

    #[error("system misconfiguration: {0}")]
    SystemMisconfiguration(String),
}

impl PassError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::TokenExpired => "token_expired",
            Self::TokenInvalid(_) => "token_invalid",
            Self::InvalidOrUsedToken => "invalid_or_used_token",
            Self::WrongDay { .. } => "wrong_day",
            Self::PassNotScheduled(_) => "pass_not_scheduled",
            Self::AlreadyProcessed(_) => "already_processed",
            Self::PassNotFound(_) => "pass_not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::TransientDependencyFailure(_) => "transient_dependency_failure",
            Self::SystemMisconfiguration(_) => "system_misconfiguration",
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::TransientDependencyFailure(_)
        )
    }
}

impl From<TokenError> for PassError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => PassError::TokenExpired,
            TokenError::KeyUnavailable(what) => PassError::SystemMisconfiguration(what),
            other => PassError::TokenInvalid(other.to_string()),
        }
    }
}

impl From<StoreError> for PassError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => PassError::PassNotFound(what),
            other => PassError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<GatewayError> for PassError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::NotConfigured(what) => PassError::SystemMisconfiguration(what),
            other => PassError::TransientDependencyFailure(other.to_string()),
        }
    }
}
