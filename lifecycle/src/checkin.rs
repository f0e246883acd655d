//! Door entry: short-lived QR issuance, the idempotent check-in protocol and
//! check-out.
//!
//! Check-in order: verify the token (expiry first), look the token up in
//! the used-token ledger, then load the pass and run the day-of-visit and
//! status guards. The ledger append and the pass update are one atomic store
//! write; a scan that loses the race to an identical scan lands in the
//! replay branch on its re-read.

use serde::Serialize;
use tracing::{debug, info, warn};

use guestpass_crypto::{generate_nonce, AccessGrant, Audience, PresentedToken, TokenRequest};
use guestpass_store::StoreError;
use guestpass_types::{EntryMethod, Pass, PassId, PassStatus, UsedToken};

use crate::guards::{
    check_can_view, check_scheduled, check_staff, check_token_host, check_visit_day,
    check_wallet_binding,
};
use crate::state::{next_status, PassEvent};
use crate::{GuardView, PassEngine, PassError, PassView, Session};

const CHECK_IN_ATTEMPTS: usize = 2;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorToken {
    pub pass_id: String,
    pub token: String,
    pub expires_at: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInOutcome {
    CheckedIn,
    /// Replay of a scan that already checked the guest in.
    AlreadyCheckedIn,
    /// Replay of a token whose pass is no longer checked in.
    TokenAlreadyUsed,
}

impl CheckInOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::CheckedIn => "Checked in",
            Self::AlreadyCheckedIn => "Already checked-in",
            Self::TokenAlreadyUsed => "Token already used",
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::TokenAlreadyUsed)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResult {
    pub outcome: CheckInOutcome,
    pub pass_id: String,
    pub method: EntryMethod,
    pub pass: PassView,
    pub guard: GuardView,
}

impl PassEngine {
    /// Mint the short-lived QR shown at the door. Only for a scheduled pass
    /// whose visit day has not passed; the token never outlives that day.
    pub fn issue_door_token(
        &self,
        pass_id: &PassId,
        session: &Session,
    ) -> Result<DoorToken, PassError> {
        let now = self.now();
        let today = self.today_at(now);
        let pass = self.load_pass(pass_id)?;
        check_can_view(&pass, session)?;
        if pass.visit_date < today {
            return Err(PassError::WrongDay {
                visit_date: pass.visit_date,
                today,
            });
        }
        check_scheduled(&pass)?;

        let expires_at = now
            .plus_secs(self.config.door_ttl_secs)
            .min(self.config.calendar.end_of_day(pass.visit_date));
        let minted = self.deps.codec.mint(
            TokenRequest::new(Audience::DoorScanner, pass.id.as_str(), expires_at)
                .host(pass.resident_id.as_str())
                .nonce(generate_nonce()),
            now,
        )?;
        debug!(pass_id = %pass.id, jti = %minted.claims.jti, "door token issued");
        Ok(DoorToken {
            pass_id: pass.id.to_string(),
            token: minted.token,
            expires_at: expires_at.to_rfc3339(),
        })
    }

    /// Verify a scanned token and check the guest in. Safe to repeat: the
    /// same token scanned again reports the original result without
    /// writing anything.
    pub fn check_in(&self, raw_token: &str, session: &Session) -> Result<CheckInResult, PassError> {
        check_staff(session)?;
        let now = self.now();
        let token = PresentedToken::parse(raw_token)?;
        let grant = self.access.verify(&token, now)?;

        for attempt in 1..=CHECK_IN_ATTEMPTS {
            if self
                .deps
                .store
                .get_used_token(&grant.pass_id, &grant.token_id)?
                .is_some()
            {
                return self.replayed(&grant);
            }

            let pass = self.load_pass(&grant.pass_id)?;
            check_binding(&pass, &grant)?;
            check_visit_day(&pass, self.today_at(now))?;
            check_scheduled(&pass)?;

            let mut next = pass.clone();
            next.status = next_status(pass.status, PassEvent::CheckIn)?;
            next.checked_in_at.get_or_insert(now);
            next.updated_at = now;
            let used = UsedToken {
                pass_id: pass.id.clone(),
                token_id: grant.token_id.clone(),
                method: grant.method,
                used_at: now,
            };

            match self.deps.store.record_check_in(&used, &next, pass.revision) {
                Ok(stored) => {
                    info!(pass_id = %stored.id, method = ?grant.method, "guest checked in");
                    return Ok(self.check_in_result(CheckInOutcome::CheckedIn, &stored, grant.method));
                }
                Err(StoreError::Duplicate(_)) => return self.replayed(&grant),
                Err(StoreError::Conflict(reason)) => {
                    debug!(pass_id = %grant.pass_id, attempt, %reason, "check-in lost a race, re-reading");
                }
                Err(other) => {
                    warn!(pass_id = %grant.pass_id, error = %other, "check-in write failed");
                    return Err(other.into());
                }
            }
        }
        Err(PassError::StoreUnavailable(format!(
            "pass {} is being updated concurrently",
            grant.pass_id
        )))
    }

    fn replayed(&self, grant: &AccessGrant) -> Result<CheckInResult, PassError> {
        let pass = self.load_pass(&grant.pass_id)?;
        let outcome = if pass.status == PassStatus::CheckedIn {
            CheckInOutcome::AlreadyCheckedIn
        } else {
            CheckInOutcome::TokenAlreadyUsed
        };
        debug!(pass_id = %pass.id, token_id = %grant.token_id, ?outcome, "replayed door token");
        Ok(self.check_in_result(outcome, &pass, grant.method))
    }

    fn check_in_result(
        &self,
        outcome: CheckInOutcome,
        pass: &Pass,
        method: EntryMethod,
    ) -> CheckInResult {
        let today = self.today();
        let host = self.deps.store.get_resident(&pass.resident_id).ok();
        CheckInResult {
            outcome,
            pass_id: pass.id.to_string(),
            method,
            pass: PassView::of(pass, today),
            guard: GuardView::of(pass, host.as_ref(), today),
        }
    }

    /// Record the guest leaving. Repeating it is a no-op.
    pub fn check_out(&self, pass_id: &PassId, session: &Session) -> Result<PassView, PassError> {
        check_staff(session)?;
        let now = self.now();
        let stored = self.modify_pass(pass_id, |mut pass: Pass| {
            if pass.status == PassStatus::CheckedOut {
                return Err(PassError::AlreadyProcessed("already checked out".into()));
            }
            pass.status = next_status(pass.status, PassEvent::CheckOut)?;
            pass.checked_out_at.get_or_insert(now);
            Ok(pass)
        });
        let pass = match stored {
            Ok(pass) => {
                info!(pass_id = %pass.id, "guest checked out");
                pass
            }
            Err(PassError::AlreadyProcessed(_)) => self.load_pass(pass_id)?,
            Err(e) => return Err(e),
        };
        Ok(PassView::of(&pass, self.today_at(now)))
    }
}

/// The token must name this pass's host; wallet payloads also bind the
/// guest email.
fn check_binding(pass: &Pass, grant: &AccessGrant) -> Result<(), PassError> {
    match grant.method {
        EntryMethod::SignedQr => match grant.host.as_deref() {
            Some(host) => check_token_host(pass, Some(host)),
            None => Ok(()),
        },
        EntryMethod::WalletQr => check_wallet_binding(
            pass,
            grant.host.as_deref().unwrap_or_default(),
            grant.guest_email.as_deref().unwrap_or_default(),
        ),
    }
}
