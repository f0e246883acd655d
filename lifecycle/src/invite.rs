//! Pass creation by a host (invite, same-day register) and the
//! non-consuming invitation lookup used to prefill the completion page.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use guestpass_crypto::{generate_nonce, Audience, TokenRequest};
use guestpass_store::StoreError;
use guestpass_types::{GuestIdentity, Pass, PassId, PassStatus, VisitDetails};

use crate::guards::{check_nonce, check_token_host};
use crate::{PassEngine, PassError, PassView, Session};

const COMPLETE_PATH: &str = "guest/complete";
const VERIFY_PATH: &str = "guest/verify";

#[derive(Clone, Debug, Default)]
pub struct InviteRequest {
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub visit_date: Option<NaiveDate>,
    pub floor: Option<String>,
    pub purpose: Option<String>,
    pub special_instructions: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Sms,
    /// The host shares the link; SMS was not requested or did not go out.
    Link,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResult {
    pub pass_id: String,
    pub link: String,
    pub delivery: Delivery,
    pub pass: PassView,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationDetails {
    pub pass_id: String,
    pub guest_name: String,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub visit_date: NaiveDate,
    pub floor: Option<String>,
    pub host_name: Option<String>,
    pub status: PassStatus,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PassEngine {
    /// Host invites a guest for a future (or today's) visit. The pass is
    /// created `scheduled` with a pre-registration link.
    pub async fn invite(
        &self,
        session: &Session,
        request: InviteRequest,
    ) -> Result<InviteResult, PassError> {
        self.require_verified_host(session)?;
        let now = self.now();
        let today = self.today_at(now);

        let guest_email = non_empty(request.guest_email);
        let guest_phone = non_empty(request.guest_phone);
        if guest_email.is_none() && guest_phone.is_none() {
            return Err(PassError::InvalidInput(
                "guest email or phone is required".into(),
            ));
        }
        let visit_date = request
            .visit_date
            .ok_or_else(|| PassError::InvalidInput("visit date is required".into()))?;
        if visit_date < today {
            return Err(PassError::InvalidInput("visit date is in the past".into()));
        }

        let guest = GuestIdentity {
            name: non_empty(request.guest_name).unwrap_or_else(|| "Guest".to_string()),
            email: guest_email,
            phone: guest_phone,
        };
        let mut pass = Pass::new(
            session.resident_id.clone(),
            guest,
            visit_date,
            PassStatus::Scheduled,
            now,
        );
        pass.extended.visit = VisitDetails {
            floor: non_empty(request.floor),
            purpose: non_empty(request.purpose),
            special_instructions: non_empty(request.special_instructions),
        };
        let nonce = generate_nonce();
        pass.extended.pending_nonce = Some(nonce.clone());

        let minted = self.deps.codec.mint(
            TokenRequest::new(
                Audience::GuestPrereg,
                pass.id.as_str(),
                now.plus_secs(self.config.prereg_ttl_secs),
            )
            .host(session.resident_id.as_str())
            .nonce(nonce),
            now,
        )?;
        let pass = self.deps.store.insert_pass(&pass)?;
        let link = self.config.link(COMPLETE_PATH, &minted.token);
        info!(pass_id = %pass.id, resident_id = %session.resident_id, %visit_date, "guest invited");

        let delivery = match pass.guest.phone.as_deref() {
            Some(phone) => self.send_link(phone, &pass, &link).await,
            None => Delivery::Link,
        };

        Ok(InviteResult {
            pass_id: pass.id.to_string(),
            link,
            delivery,
            pass: PassView::of(&pass, today),
        })
    }

    /// Host registers a guest who is on site. The pass is created
    /// `registered` with a link straight to the identity check.
    pub async fn register(
        &self,
        session: &Session,
        request: InviteRequest,
    ) -> Result<InviteResult, PassError> {
        self.require_verified_host(session)?;
        let now = self.now();
        let today = self.today_at(now);

        let guest_name = non_empty(request.guest_name)
            .ok_or_else(|| PassError::InvalidInput("guest name is required".into()))?;
        let guest_phone = non_empty(request.guest_phone)
            .ok_or_else(|| PassError::InvalidInput("guest phone is required".into()))?;
        let visit_date = request.visit_date.unwrap_or(today);
        if visit_date < today {
            return Err(PassError::InvalidInput("visit date is in the past".into()));
        }

        let mut pass = Pass::new(
            session.resident_id.clone(),
            GuestIdentity {
                name: guest_name,
                email: non_empty(request.guest_email),
                phone: Some(guest_phone),
            },
            visit_date,
            PassStatus::Registered,
            now,
        );
        pass.extended.visit = VisitDetails {
            floor: non_empty(request.floor),
            purpose: non_empty(request.purpose),
            special_instructions: non_empty(request.special_instructions),
        };
        let nonce = generate_nonce();
        pass.extended.pending_nonce = Some(nonce.clone());

        let minted = self.deps.codec.mint(
            TokenRequest::new(
                Audience::GuestVerification,
                pass.id.as_str(),
                now.plus_secs(self.config.verification_ttl_secs),
            )
            .host(session.resident_id.as_str())
            .nonce(nonce),
            now,
        )?;
        let pass = self.deps.store.insert_pass(&pass)?;
        let link = self.config.link(VERIFY_PATH, &minted.token);
        info!(pass_id = %pass.id, resident_id = %session.resident_id, "guest registered");

        Ok(InviteResult {
            pass_id: pass.id.to_string(),
            link,
            delivery: Delivery::Link,
            pass: PassView::of(&pass, today),
        })
    }

    /// Look up the pass behind a completion link without consuming it.
    pub fn invitation_details(&self, token: &str) -> Result<InvitationDetails, PassError> {
        let now = self.now();
        let claims = self.deps.codec.verify(
            token,
            &[Audience::GuestPrereg, Audience::GuestVerification],
            now,
        )?;
        let pass_id = PassId::parse(&claims.sub)
            .map_err(|e| PassError::TokenInvalid(e.to_string()))?;
        let pass = self.load_pass(&pass_id)?;
        check_token_host(&pass, claims.host.as_deref())?;
        check_nonce(&pass, claims.nonce.as_deref())?;

        let host_name = self
            .deps
            .store
            .get_resident(&pass.resident_id)
            .ok()
            .map(|r| r.name);
        Ok(InvitationDetails {
            pass_id: pass.id.to_string(),
            guest_name: pass.guest.name.clone(),
            guest_email: pass.guest.email.clone(),
            guest_phone: pass.guest.phone.clone(),
            visit_date: pass.visit_date,
            floor: pass.extended.visit.floor.clone(),
            host_name,
            status: pass.effective_status(self.today_at(now)),
        })
    }

    fn require_verified_host(&self, session: &Session) -> Result<(), PassError> {
        let resident = self
            .deps
            .store
            .get_resident(&session.resident_id)
            .map_err(|e| match e {
                StoreError::NotFound(_) => {
                    PassError::Unauthorized("unknown resident".into())
                }
                other => other.into(),
            })?;
        if !resident.verified_member {
            return Err(PassError::Forbidden(
                "host is not a verified resident".into(),
            ));
        }
        Ok(())
    }

    /// SMS the link; a failed or slow delivery falls back to link sharing.
    async fn send_link(&self, phone: &str, pass: &Pass, link: &str) -> Delivery {
        let body = format!(
            "You're invited for {}. Complete your guest registration: {link}",
            pass.visit_date.format("%b %-d")
        );
        match self
            .call("sms delivery", self.deps.notifier.send_sms(phone, &body))
            .await
        {
            Ok(()) => Delivery::Sms,
            Err(e) => {
                warn!(pass_id = %pass.id, error = %e, "sms delivery failed, returning link");
                Delivery::Link
            }
        }
    }
}
