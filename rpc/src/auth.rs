//! Bearer-token authentication and the session endpoint.

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::Deserialize;

use guestpass_lifecycle::{Session, SessionGrant};

use crate::{AppState, Envelope, RpcError};

/// The caller's verified resident session.
pub struct AuthSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, RpcError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(RpcError::MissingCredentials)?;
        let session = state.engine.authenticate(token)?;
        Ok(AuthSession(session))
    }
}

#[derive(Deserialize)]
pub struct SessionRequest {
    pub credential: String,
}

pub async fn open_session(
    State(state): State<AppState>,
    payload: Result<Json<SessionRequest>, JsonRejection>,
) -> Result<Json<Envelope<SessionGrant>>, RpcError> {
    let Json(request) = payload?;
    let grant = state.engine.open_session(&request.credential).await?;
    Ok(Envelope::ok(grant))
}
