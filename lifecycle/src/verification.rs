//! Identity-provider callbacks and wallet-pass issuance.
//!
//! Deliveries are at-least-once. An outcome is applied only to a pass that
//! is still `pending_verification` under the same session; the wallet
//! issuance is claimed in the same write that approves the pass, so a
//! duplicate `verified` delivery can never issue a second wallet pass.

use serde::Serialize;
use tracing::{debug, info, warn};

use guestpass_crypto::WalletQr;
use guestpass_types::{
    IssuedWallet, Pass, PassId, PassStatus, VerificationOutcome, WalletRecord,
};

use crate::state::{next_status, PassEvent};
use crate::{PassEngine, PassError, WalletPassRequest};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationEventKind {
    Verified,
    RequiresInput,
    Canceled,
    /// Any other provider event; acknowledged and ignored.
    Other(String),
}

impl VerificationEventKind {
    /// Accepts bare names and provider-prefixed ones
    /// (`identity.verification_session.verified`).
    pub fn parse(raw: &str) -> Self {
        let name = raw.rsplit('.').next().unwrap_or(raw);
        match name {
            "verified" => Self::Verified,
            "requires_input" => Self::RequiresInput,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Other(raw.to_string()),
        }
    }

    fn outcome(&self) -> Option<(VerificationOutcome, PassEvent)> {
        match self {
            Self::Verified => Some((VerificationOutcome::Verified, PassEvent::VerificationSucceeded)),
            Self::RequiresInput => Some((
                VerificationOutcome::RequiresInput,
                PassEvent::VerificationFailed,
            )),
            Self::Canceled => Some((
                VerificationOutcome::Canceled,
                PassEvent::VerificationCanceled,
            )),
            Self::Other(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationEvent {
    pub kind: VerificationEventKind,
    pub session_id: String,
    /// From the session metadata; events without one cannot be routed.
    pub pass_id: Option<PassId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "detail")]
pub enum WebhookOutcome {
    Applied(PassStatus),
    /// Duplicate delivery of an outcome already recorded.
    AlreadyProcessed,
    /// Nothing to do; the reason is logged.
    Ignored(String),
}

impl PassEngine {
    pub async fn handle_verification_event(
        &self,
        event: VerificationEvent,
    ) -> Result<WebhookOutcome, PassError> {
        let Some((outcome, transition)) = event.kind.outcome() else {
            debug!(session_id = %event.session_id, kind = ?event.kind, "ignoring verification event");
            return Ok(WebhookOutcome::Ignored("unhandled event type".into()));
        };
        let Some(pass_id) = event.pass_id.clone() else {
            warn!(session_id = %event.session_id, "verification event without pass id");
            return Ok(WebhookOutcome::Ignored("no pass id".into()));
        };

        let now = self.now();
        let mut duplicate = false;
        let mut claimed_wallet = false;
        let result = self.modify_pass(&pass_id, |mut pass: Pass| {
            duplicate = false;
            claimed_wallet = false;
            let Some(record) = pass.extended.verification.as_mut() else {
                return Err(PassError::AlreadyProcessed("pass has no verification session".into()));
            };
            if record.session_id != event.session_id {
                return Err(PassError::AlreadyProcessed("session mismatch".into()));
            }
            if record.outcome != VerificationOutcome::Pending
                || pass.status != PassStatus::PendingVerification
            {
                duplicate = true;
                return Err(PassError::AlreadyProcessed("outcome already recorded".into()));
            }
            let to = next_status(pass.status, transition)?;
            record.outcome = outcome;
            record.resolved_at = Some(now);
            if to == PassStatus::Approved && pass.extended.wallet.is_none() {
                pass.extended.wallet = Some(WalletRecord {
                    requested_at: now,
                    issued: None,
                    last_error: None,
                });
                claimed_wallet = true;
            }
            pass.status = to;
            Ok(pass)
        });

        let pass = match result {
            Ok(pass) => pass,
            Err(PassError::PassNotFound(_)) => {
                warn!(pass_id = %pass_id, "verification event for unknown pass");
                return Ok(WebhookOutcome::Ignored("unknown pass".into()));
            }
            Err(PassError::AlreadyProcessed(reason)) if duplicate => {
                debug!(pass_id = %pass_id, %reason, "duplicate verification event");
                return Ok(WebhookOutcome::AlreadyProcessed);
            }
            Err(PassError::AlreadyProcessed(reason)) => {
                warn!(pass_id = %pass_id, session_id = %event.session_id, %reason, "verification event does not match pass");
                return Ok(WebhookOutcome::Ignored(reason));
            }
            Err(e) => return Err(e),
        };
        let status = pass.status;
        info!(pass_id = %pass.id, %status, "verification outcome applied");

        if claimed_wallet {
            self.issue_wallet(pass).await;
        }
        Ok(WebhookOutcome::Applied(status))
    }

    /// Produce the wallet pass for a freshly approved pass and record the
    /// result. Failures are recorded on the pass, never surfaced: the
    /// approval already happened.
    async fn issue_wallet(&self, pass: Pass) {
        let pass_id = pass.id.clone();
        let result = match self.deps.wallet_secret.as_deref() {
            None => Err("wallet secret not configured".to_string()),
            Some(secret) => {
                let qr = WalletQr::issue(&pass, secret, self.config.building_code.as_deref());
                match qr.to_json() {
                    Err(e) => Err(e.to_string()),
                    Ok(qr_payload) => {
                        let host_name = self
                            .deps
                            .store
                            .get_resident(&pass.resident_id)
                            .ok()
                            .map(|r| r.name);
                        self.call(
                            "wallet issuer",
                            self.deps.wallet.issue(WalletPassRequest {
                                pass_id: pass.id.clone(),
                                guest_name: pass.guest.name.clone(),
                                host_name,
                                visit_date: pass.visit_date,
                                floor: pass.extended.visit.floor.clone(),
                                qr_payload,
                            }),
                        )
                        .await
                        .map_err(|e| e.to_string())
                    }
                }
            }
        };

        let now = self.now();
        let record = self.modify_pass(&pass_id, |mut pass: Pass| {
            let wallet = pass.extended.wallet.get_or_insert(WalletRecord {
                requested_at: now,
                issued: None,
                last_error: None,
            });
            match &result {
                Ok(artifact) => {
                    wallet.issued = Some(IssuedWallet {
                        url: artifact.url.clone(),
                        serial: artifact.serial.clone(),
                        issued_at: now,
                    });
                    wallet.last_error = None;
                }
                Err(reason) => wallet.last_error = Some(reason.clone()),
            }
            Ok(pass)
        });

        match (&result, record) {
            (Ok(artifact), Ok(_)) => {
                info!(pass_id = %pass_id, serial = %artifact.serial, "wallet pass issued")
            }
            (Err(reason), Ok(_)) => warn!(pass_id = %pass_id, %reason, "wallet pass not issued"),
            (_, Err(e)) => warn!(pass_id = %pass_id, error = %e, "could not record wallet issuance"),
        }
    }
}
