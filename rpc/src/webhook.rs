//! Identity-provider callback endpoint.
//!
//! The signature is checked over the raw body before anything in it is
//! trusted. Events the engine does not act on are still acknowledged so the
//! provider stops redelivering them; store and dependency failures answer
//! 503 so it tries again.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use tracing::{debug, warn};

use guestpass_crypto::{verify_webhook_signature, WebhookSignatureError, SIGNATURE_HEADER};
use guestpass_lifecycle::{VerificationEvent, VerificationEventKind, WebhookOutcome};
use guestpass_types::PassId;

use crate::{AppState, Envelope, RpcError};

/// Accepts the provider's envelope (`data.object`) and the flat form
/// (`sessionId` and `metadata` at the top level).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    metadata: Option<EventMetadata>,
    #[serde(default)]
    data: Option<EventData>,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: SessionObject,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    #[serde(default)]
    metadata: Option<EventMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct EventMetadata {
    #[serde(default, rename = "passId", alias = "guest_pass_id", alias = "pass_id")]
    pass_id: Option<String>,
}

impl IdentityEvent {
    /// `None` when the event names no verification session.
    fn into_event(self) -> Option<VerificationEvent> {
        let (session_id, metadata) = match self.data {
            Some(data) => (Some(data.object.id), data.object.metadata),
            None => (self.session_id, self.metadata),
        };
        let session_id = session_id.filter(|s| !s.is_empty())?;
        let pass_id = metadata
            .and_then(|m| m.pass_id)
            .and_then(|raw| PassId::parse(raw).ok());
        Some(VerificationEvent {
            kind: VerificationEventKind::parse(&self.kind),
            session_id,
            pass_id,
        })
    }
}

pub async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Envelope<WebhookOutcome>>, RpcError> {
    let secret = state
        .webhook
        .secret
        .as_deref()
        .ok_or(WebhookSignatureError::SecretUnavailable)?;
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookSignatureError::Malformed)?;
    verify_webhook_signature(
        secret,
        header,
        &body,
        state.engine.now(),
        state.webhook.tolerance_secs,
    )
    .map_err(|e| {
        warn!(error = %e, "rejected identity webhook");
        e
    })?;

    let event: IdentityEvent = serde_json::from_slice(&body)
        .map_err(|e| RpcError::InvalidRequest(format!("event body: {e}")))?;
    let kind = event.kind.clone();
    let Some(event) = event.into_event() else {
        warn!(kind = %kind, "identity webhook without a session id, acknowledging");
        return Ok(Envelope::ok(WebhookOutcome::Ignored("no session id".into())));
    };
    debug!(session_id = %event.session_id, kind = ?event.kind, "identity webhook received");

    let outcome = state.engine.handle_verification_event(event).await?;
    Ok(Envelope::ok(outcome))
}
