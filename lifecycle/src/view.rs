//! Read models handed to the HTTP layer.

use chrono::NaiveDate;
use serde::Serialize;

use guestpass_types::{Pass, PassStatus, Resident, Timestamp};

/// A pass as callers see it. `status` is the effective status, so a pass
/// whose visit day has passed reads as `expired`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassView {
    pub id: String,
    pub resident_id: String,
    pub guest_name: String,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub visit_date: NaiveDate,
    pub status: PassStatus,
    pub floor: Option<String>,
    pub purpose: Option<String>,
    pub special_instructions: Option<String>,
    pub created_at: String,
    pub checked_in_at: Option<String>,
    pub checked_out_at: Option<String>,
    pub wallet_url: Option<String>,
}

impl PassView {
    pub fn of(pass: &Pass, today: NaiveDate) -> Self {
        Self {
            id: pass.id.to_string(),
            resident_id: pass.resident_id.to_string(),
            guest_name: pass.guest.name.clone(),
            guest_email: pass.guest.email.clone(),
            guest_phone: pass.guest.phone.clone(),
            visit_date: pass.visit_date,
            status: pass.effective_status(today),
            floor: pass.extended.visit.floor.clone(),
            purpose: pass.extended.visit.purpose.clone(),
            special_instructions: pass.extended.visit.special_instructions.clone(),
            created_at: pass.created_at.to_rfc3339(),
            checked_in_at: pass.checked_in_at.as_ref().map(Timestamp::to_rfc3339),
            checked_out_at: pass.checked_out_at.as_ref().map(Timestamp::to_rfc3339),
            wallet_url: pass.wallet_url().map(str::to_string),
        }
    }
}

/// What the door operator sees after a scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardView {
    pub guest_name: String,
    pub host_name: Option<String>,
    pub host_unit: Option<String>,
    pub floor: Option<String>,
    pub visit_date: NaiveDate,
    pub status: PassStatus,
}

impl GuardView {
    pub fn of(pass: &Pass, host: Option<&Resident>, today: NaiveDate) -> Self {
        Self {
            guest_name: pass.guest.name.clone(),
            host_name: host.map(|r| r.name.clone()),
            host_unit: host.and_then(|r| r.unit.clone()),
            floor: pass.extended.visit.floor.clone(),
            visit_date: pass.visit_date,
            status: pass.effective_status(today),
        }
    }
}
