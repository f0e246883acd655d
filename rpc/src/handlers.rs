//! Request handlers for hosts, guests and door staff.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use guestpass_lifecycle::{
    CheckInOutcome, CheckInResult, DashboardMetrics, DoorToken, InvitationDetails, InviteRequest,
    InviteResult, PassView, RecentActivity, RegistrationStarted, RegistrationSubmission,
    VerificationStatusView,
};
use guestpass_types::PassId;

use crate::{AppState, AuthSession, RpcError};

/// Success body: `{"ok": true, ...fields}`.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { ok: true, data })
    }
}

#[derive(Serialize)]
pub struct PassList {
    pub passes: Vec<PassView>,
}

#[derive(Serialize)]
pub struct PassBody {
    pub pass: PassView,
}

fn pass_id(raw: &str) -> Result<PassId, RpcError> {
    PassId::parse(raw).map_err(|e| RpcError::InvalidRequest(e.to_string()))
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "ok": true,
        "status": "healthy",
        "service": "guestpass",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── Hosts ────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct InviteBody {
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub visit_date: Option<NaiveDate>,
    pub floor: Option<String>,
    pub purpose: Option<String>,
    pub special_instructions: Option<String>,
}

impl From<InviteBody> for InviteRequest {
    fn from(body: InviteBody) -> Self {
        InviteRequest {
            guest_name: body.guest_name,
            guest_email: body.guest_email,
            guest_phone: body.guest_phone,
            visit_date: body.visit_date,
            floor: body.floor,
            purpose: body.purpose,
            special_instructions: body.special_instructions,
        }
    }
}

pub async fn invite(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    payload: Result<Json<InviteBody>, JsonRejection>,
) -> Result<Json<Envelope<InviteResult>>, RpcError> {
    let Json(body) = payload?;
    let result = state.engine.invite(&session, body.into()).await?;
    Ok(Envelope::ok(result))
}

pub async fn register(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    payload: Result<Json<InviteBody>, JsonRejection>,
) -> Result<Json<Envelope<InviteResult>>, RpcError> {
    let Json(body) = payload?;
    let result = state.engine.register(&session, body.into()).await?;
    Ok(Envelope::ok(result))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveBody {
    pub pass_id: String,
    #[serde(default = "default_approve")]
    pub approve: bool,
}

fn default_approve() -> bool {
    true
}

pub async fn approve(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    payload: Result<Json<ApproveBody>, JsonRejection>,
) -> Result<Json<Envelope<PassBody>>, RpcError> {
    let Json(body) = payload?;
    let pass = state
        .engine
        .approve(&pass_id(&body.pass_id)?, &session, body.approve)?;
    Ok(Envelope::ok(PassBody { pass }))
}

pub async fn cancel(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Json<Envelope<PassBody>>, RpcError> {
    let pass = state.engine.cancel(&pass_id(&id)?, &session)?;
    Ok(Envelope::ok(PassBody { pass }))
}

pub async fn door_qr(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Json<Envelope<DoorToken>>, RpcError> {
    let token = state.engine.issue_door_token(&pass_id(&id)?, &session)?;
    Ok(Envelope::ok(token))
}

pub async fn resident_passes(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<Envelope<PassList>>, RpcError> {
    let passes = state.engine.resident_passes(&session)?;
    Ok(Envelope::ok(PassList { passes }))
}

// ── Guests ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

pub async fn invitation(
    State(state): State<AppState>,
    query: Result<Query<TokenQuery>, QueryRejection>,
) -> Result<Json<Envelope<InvitationDetails>>, RpcError> {
    let Query(query) = query?;
    let details = state.engine.invitation_details(&query.token)?;
    Ok(Envelope::ok(details))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteBody {
    pub token: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub id_country: Option<String>,
    #[serde(default)]
    pub id_type: Option<String>,
    #[serde(default)]
    pub id_last4: Option<String>,
    #[serde(default)]
    pub policy_version: Option<String>,
}

pub async fn complete(
    State(state): State<AppState>,
    payload: Result<Json<CompleteBody>, JsonRejection>,
) -> Result<Json<Envelope<RegistrationStarted>>, RpcError> {
    let Json(body) = payload?;
    let submission = RegistrationSubmission {
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        phone: body.phone,
        id_country: body.id_country,
        id_type: body.id_type,
        id_last4: body.id_last4,
        policy_version: body.policy_version,
    };
    let started = state
        .engine
        .complete_registration(&body.token, submission)
        .await?;
    Ok(Envelope::ok(started))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatusQuery {
    pub pass_id: String,
    pub session_id: String,
}

pub async fn verification_status(
    State(state): State<AppState>,
    query: Result<Query<VerificationStatusQuery>, QueryRejection>,
) -> Result<Json<Envelope<VerificationStatusView>>, RpcError> {
    let Query(query) = query?;
    let view = state
        .engine
        .verification_status(&pass_id(&query.pass_id)?, &query.session_id)?;
    Ok(Envelope::ok(view))
}

// ── Door staff ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CheckInBody {
    pub token: String,
}

#[derive(Serialize)]
pub struct CheckInResponse {
    pub ok: bool,
    pub message: &'static str,
    #[serde(flatten)]
    pub result: CheckInResult,
}

/// A replay of a token whose visit is over answers 409 with the pass
/// attached; the other outcomes are successes.
pub async fn check_in(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    payload: Result<Json<CheckInBody>, JsonRejection>,
) -> Result<Response, RpcError> {
    let Json(body) = payload?;
    let result = state.engine.check_in(&body.token, &session)?;
    let status = match result.outcome {
        CheckInOutcome::TokenAlreadyUsed => StatusCode::CONFLICT,
        CheckInOutcome::CheckedIn | CheckInOutcome::AlreadyCheckedIn => StatusCode::OK,
    };
    let response = CheckInResponse {
        ok: result.outcome.is_success(),
        message: result.outcome.message(),
        result,
    };
    Ok((status, Json(response)).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutBody {
    pub pass_id: String,
}

pub async fn check_out(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    payload: Result<Json<CheckOutBody>, JsonRejection>,
) -> Result<Json<Envelope<PassBody>>, RpcError> {
    let Json(body) = payload?;
    let pass = state.engine.check_out(&pass_id(&body.pass_id)?, &session)?;
    Ok(Envelope::ok(PassBody { pass }))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub date: Option<NaiveDate>,
}

pub async fn all_passes(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Envelope<PassList>>, RpcError> {
    let Query(query) = query?;
    let passes = state.engine.all_passes(&session, query.date)?;
    Ok(Envelope::ok(PassList { passes }))
}

pub async fn metrics(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<Envelope<DashboardMetrics>>, RpcError> {
    Ok(Envelope::ok(state.engine.metrics(&session)?))
}

pub async fn recent_activity(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<Envelope<RecentActivity>>, RpcError> {
    Ok(Envelope::ok(state.engine.recent_activity(&session)?))
}
