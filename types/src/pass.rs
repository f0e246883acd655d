//! The guest pass record.
//!
//! The open attribute bag of a pass is split into one optional struct per
//! lifecycle stage (visit details, pending nonce, registration, identity
//! verification, wallet issuance). Each stage's data is written by exactly one
//! engine transition.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{PassId, PassStatus, ResidentId, Timestamp};

/// Contact details of the guest. Mutable until registration completes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestIdentity {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    #[default]
    GuestAccess,
    Delivery,
}

/// Visit details captured when the host creates the pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitDetails {
    pub floor: Option<String>,
    pub purpose: Option<String>,
    pub special_instructions: Option<String>,
}

/// What the guest submitted when completing registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub id_country: Option<String>,
    pub id_type: Option<String>,
    pub id_last4: Option<String>,
    pub policy_version: Option<String>,
    pub completed_at: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Pending,
    Verified,
    RequiresInput,
    Canceled,
}

/// The identity-verification session bound to this pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub session_id: String,
    pub outcome: VerificationOutcome,
    pub started_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedWallet {
    pub url: String,
    pub serial: String,
    pub issued_at: Timestamp,
}

/// Wallet issuance is claimed (`requested_at`) before the issuer is called,
/// so it is attempted at most once per pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub requested_at: Timestamp,
    pub issued: Option<IssuedWallet>,
    pub last_error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedData {
    pub visit: VisitDetails,
    /// The single live nonce of the outstanding pre-registration or
    /// verification token. Cleared by the transition that consumes it.
    pub pending_nonce: Option<String>,
    pub registration: Option<RegistrationRecord>,
    pub verification: Option<VerificationRecord>,
    pub wallet: Option<WalletRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pass {
    pub id: PassId,
    pub resident_id: ResidentId,
    pub guest: GuestIdentity,
    pub visit_date: NaiveDate,
    pub kind: PassKind,
    pub status: PassStatus,
    pub extended: ExtendedData,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub checked_in_at: Option<Timestamp>,
    pub checked_out_at: Option<Timestamp>,
    /// Bumped by the store on every successful write; updates are
    /// conditional on the revision that was read.
    pub revision: u64,
}

impl Pass {
    /// A fresh pass at revision zero.
    pub fn new(
        resident_id: ResidentId,
        guest: GuestIdentity,
        visit_date: NaiveDate,
        status: PassStatus,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PassId::generate(),
            resident_id,
            guest,
            visit_date,
            kind: PassKind::GuestAccess,
            status,
            extended: ExtendedData::default(),
            created_at: now,
            updated_at: now,
            checked_in_at: None,
            checked_out_at: None,
            revision: 0,
        }
    }

    /// Status as seen on `today`: pre-entry passes whose visit date has passed
    /// read as `Expired`.
    pub fn effective_status(&self, today: NaiveDate) -> PassStatus {
        if self.status.is_pre_entry() && self.visit_date < today {
            PassStatus::Expired
        } else {
            self.status
        }
    }

    pub fn is_owned_by(&self, resident: &ResidentId) -> bool {
        &self.resident_id == resident
    }

    pub fn registration_completed(&self) -> bool {
        self.extended.registration.is_some()
    }

    pub fn verification_session(&self) -> Option<&str> {
        self.extended
            .verification
            .as_ref()
            .map(|v| v.session_id.as_str())
    }

    pub fn wallet_url(&self) -> Option<&str> {
        self.extended
            .wallet
            .as_ref()
            .and_then(|w| w.issued.as_ref())
            .map(|issued| issued.url.as_str())
    }
}
