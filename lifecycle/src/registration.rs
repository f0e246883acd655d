//! Guest completes registration: the single-use completion token is
//! consumed and an identity-verification session is started.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use guestpass_crypto::{Audience, Claims};
use guestpass_types::{
    Pass, PassId, PassStatus, RegistrationRecord, VerificationOutcome, VerificationRecord,
};

use crate::guards::{check_nonce, check_registration_open, check_token_host};
use crate::state::{next_status, PassEvent};
use crate::{PassEngine, PassError, VerificationRequest};

const RETURN_PATH: &str = "guest/verification-complete";

/// Personal and ID details the guest submits.
#[derive(Clone, Debug, Default)]
pub struct RegistrationSubmission {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub id_country: Option<String>,
    pub id_type: Option<String>,
    pub id_last4: Option<String>,
    pub policy_version: Option<String>,
}

impl RegistrationSubmission {
    fn validate(&self) -> Result<(), PassError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(PassError::InvalidInput("first and last name are required".into()));
        }
        if self.phone.trim().is_empty() {
            return Err(PassError::InvalidInput("phone is required".into()));
        }
        if let Some(last4) = &self.id_last4 {
            if last4.len() != 4 || !last4.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(PassError::InvalidInput(
                    "id_last4 must be four letters or digits".into(),
                ));
            }
        }
        if let Some(email) = &self.email {
            if !email.trim().is_empty() && !email.contains('@') {
                return Err(PassError::InvalidInput("email is not valid".into()));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStarted {
    pub pass_id: String,
    pub session_id: String,
    pub verification_url: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatusView {
    pub pass_id: String,
    pub status: PassStatus,
    pub message: &'static str,
    pub wallet_url: Option<String>,
}

fn status_message(status: PassStatus) -> &'static str {
    match status {
        PassStatus::Invited | PassStatus::Registered => "Registration not completed",
        PassStatus::PendingVerification => "Verification in progress",
        PassStatus::Approved => "Identity verified, awaiting host confirmation",
        PassStatus::Scheduled => "Pass is ready",
        PassStatus::VerificationFailed => "Verification failed",
        PassStatus::VerificationCanceled => "Verification was canceled",
        PassStatus::CheckedIn => "Checked in",
        PassStatus::CheckedOut => "Visit completed",
        PassStatus::Canceled => "Pass canceled",
        PassStatus::Expired => "Pass expired",
    }
}

impl PassEngine {
    /// Consume a completion token and start identity verification.
    ///
    /// Guards run before the provider is called, and again inside the
    /// conditional write. The nonce is cleared only by that write, so a
    /// provider failure leaves the link usable.
    pub async fn complete_registration(
        &self,
        token: &str,
        submission: RegistrationSubmission,
    ) -> Result<RegistrationStarted, PassError> {
        submission.validate()?;
        let now = self.now();
        let today = self.today_at(now);
        let claims = self.deps.codec.verify(
            token,
            &[Audience::GuestPrereg, Audience::GuestVerification],
            now,
        )?;
        let pass_id =
            PassId::parse(&claims.sub).map_err(|e| PassError::TokenInvalid(e.to_string()))?;

        let pass = self.load_pass(&pass_id)?;
        self.registration_guards(&pass, &claims, today)?;

        let email = submission
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| pass.guest.email.clone());
        let started = self
            .call(
                "identity verification",
                self.deps.verification.start_session(VerificationRequest {
                    pass_id: pass_id.clone(),
                    first_name: submission.first_name.trim().to_string(),
                    last_name: submission.last_name.trim().to_string(),
                    email: email.clone(),
                    return_url: format!(
                        "{}/{RETURN_PATH}?passId={pass_id}",
                        self.config.public_base_url.trim_end_matches('/')
                    ),
                }),
            )
            .await
            .map_err(|e| {
                warn!(pass_id = %pass_id, error = %e, "could not start identity verification");
                PassError::from(e)
            })?;

        let record = RegistrationRecord {
            first_name: submission.first_name.trim().to_string(),
            last_name: submission.last_name.trim().to_string(),
            email,
            phone: submission.phone.trim().to_string(),
            id_country: submission.id_country,
            id_type: submission.id_type,
            id_last4: submission.id_last4,
            policy_version: submission.policy_version,
            completed_at: now,
        };
        let session_id = started.session_id.clone();

        let stored = self.modify_pass(&pass_id, |mut pass: Pass| {
            self.registration_guards(&pass, &claims, today)?;
            let to = next_status(
                pass.effective_status(today),
                PassEvent::RegistrationSubmitted,
            )?;
            pass.guest.name = format!("{} {}", record.first_name, record.last_name);
            if record.email.is_some() {
                pass.guest.email = record.email.clone();
            }
            pass.guest.phone = Some(record.phone.clone());
            pass.extended.pending_nonce = None;
            pass.extended.registration = Some(record.clone());
            pass.extended.verification = Some(VerificationRecord {
                session_id: session_id.clone(),
                outcome: VerificationOutcome::Pending,
                started_at: now,
                resolved_at: None,
            });
            pass.status = to;
            Ok(pass)
        })?;

        info!(pass_id = %stored.id, session_id = %session_id, "registration completed, verification started");
        Ok(RegistrationStarted {
            pass_id: stored.id.to_string(),
            session_id,
            verification_url: started.url,
        })
    }

    fn registration_guards(
        &self,
        pass: &Pass,
        claims: &Claims,
        today: NaiveDate,
    ) -> Result<(), PassError> {
        check_token_host(pass, claims.host.as_deref())?;
        check_nonce(pass, claims.nonce.as_deref())?;
        check_registration_open(pass, today)
    }

    /// Progress of a verification session, as polled by the guest's page.
    pub fn verification_status(
        &self,
        pass_id: &PassId,
        session_id: &str,
    ) -> Result<VerificationStatusView, PassError> {
        let pass = self.load_pass(pass_id)?;
        if pass.verification_session() != Some(session_id) {
            return Err(PassError::Unauthorized(
                "session does not belong to this pass".into(),
            ));
        }
        let status = pass.effective_status(self.today());
        Ok(VerificationStatusView {
            pass_id: pass.id.to_string(),
            status,
            message: status_message(status),
            wallet_url: pass.wallet_url().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> RegistrationSubmission {
        RegistrationSubmission {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone: "+15550100".into(),
            ..RegistrationSubmission::default()
        }
    }

    #[test]
    fn submission_requires_names_and_phone() {
        assert!(submission().validate().is_ok());
        let mut s = submission();
        s.last_name = " ".into();
        assert!(s.validate().is_err());
        let mut s = submission();
        s.phone = String::new();
        assert!(s.validate().is_err());
    }

    #[test]
    fn id_last4_is_four_characters() {
        let mut s = submission();
        s.id_last4 = Some("12a4".into());
        assert!(s.validate().is_ok());
        s.id_last4 = Some("123".into());
        assert!(s.validate().is_err());
        s.id_last4 = Some("12-4".into());
        assert!(s.validate().is_err());
    }

    #[test]
    fn every_status_has_a_message() {
        for status in PassStatus::ALL {
            assert!(!status_message(status).is_empty());
        }
    }
}
