//! HTTP error mapping.
//!
//! Every failure leaves as `{"ok": false, "error": <code>, "message": ...}`
//! with a status derived from the engine's reason.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use guestpass_crypto::WebhookSignatureError;
use guestpass_lifecycle::PassError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Pass(#[from] PassError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("authentication required")]
    MissingCredentials,

    #[error("webhook signature: {0}")]
    Signature(#[from] WebhookSignatureError),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pass(e) => e.code(),
            Self::InvalidRequest(_) => "invalid_input",
            Self::MissingCredentials => "unauthorized",
            Self::Signature(WebhookSignatureError::SecretUnavailable) => "system_misconfiguration",
            Self::Signature(_) => "invalid_signature",
            Self::Server(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Pass(e) => pass_status(e),
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingCredentials => StatusCode::UNAUTHORIZED,
            Self::Signature(WebhookSignatureError::SecretUnavailable) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Signature(_) => StatusCode::BAD_REQUEST,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn pass_status(e: &PassError) -> StatusCode {
    match e {
        PassError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PassError::Unauthorized(_) | PassError::TokenExpired | PassError::TokenInvalid(_) => {
            StatusCode::UNAUTHORIZED
        }
        PassError::Forbidden(_) => StatusCode::FORBIDDEN,
        PassError::PassNotFound(_) => StatusCode::NOT_FOUND,
        PassError::InvalidOrUsedToken
        | PassError::WrongDay { .. }
        | PassError::PassNotScheduled(_)
        | PassError::AlreadyProcessed(_)
        | PassError::InvalidTransition { .. } => StatusCode::CONFLICT,
        PassError::StoreUnavailable(_) | PassError::TransientDependencyFailure(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        PassError::SystemMisconfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "request failed");
        } else {
            warn!(code = self.code(), error = %self, "request rejected");
        }
        let body = Json(json!({
            "ok": false,
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<JsonRejection> for RpcError {
    fn from(e: JsonRejection) -> Self {
        RpcError::InvalidRequest(e.body_text())
    }
}

impl From<QueryRejection> for RpcError {
    fn from(e: QueryRejection) -> Self {
        RpcError::InvalidRequest(e.body_text())
    }
}
