//! Host and admin actions on existing passes: approval after identity
//! verification, cancellation and listings.

use chrono::NaiveDate;
use tracing::info;

use guestpass_types::{Pass, PassId, PassStatus};

use crate::guards::{check_owner_or_admin, check_staff};
use crate::state::{next_status, PassEvent};
use crate::{PassEngine, PassError, PassView, Session};

impl PassEngine {
    /// The host confirms (`approve = true`) or rejects a verified guest.
    pub fn approve(
        &self,
        pass_id: &PassId,
        session: &Session,
        approve: bool,
    ) -> Result<PassView, PassError> {
        let event = if approve {
            PassEvent::HostApproved
        } else {
            PassEvent::HostRejected
        };
        let now = self.now();
        let today = self.today_at(now);
        let stored = self.modify_pass(pass_id, |mut pass: Pass| {
            check_owner_or_admin(&pass, session)?;
            pass.status = next_status(pass.effective_status(today), event)?;
            pass.extended.pending_nonce = None;
            Ok(pass)
        })?;
        info!(pass_id = %stored.id, status = %stored.status, by = %session.resident_id, "host decision recorded");
        Ok(PassView::of(&stored, today))
    }

    /// Cancel a pass that has not been used. Canceling twice is a no-op.
    pub fn cancel(&self, pass_id: &PassId, session: &Session) -> Result<PassView, PassError> {
        let now = self.now();
        let today = self.today_at(now);
        let result = self.modify_pass(pass_id, |mut pass: Pass| {
            check_owner_or_admin(&pass, session)?;
            if pass.status == PassStatus::Canceled {
                return Err(PassError::AlreadyProcessed("already canceled".into()));
            }
            pass.status = next_status(pass.effective_status(today), PassEvent::Cancel)?;
            pass.extended.pending_nonce = None;
            Ok(pass)
        });
        let pass = match result {
            Ok(pass) => {
                info!(pass_id = %pass.id, by = %session.resident_id, "pass canceled");
                pass
            }
            Err(PassError::AlreadyProcessed(_)) => self.load_pass(pass_id)?,
            Err(e) => return Err(e),
        };
        Ok(PassView::of(&pass, today))
    }

    /// The caller's own passes, newest first.
    pub fn resident_passes(&self, session: &Session) -> Result<Vec<PassView>, PassError> {
        let today = self.today();
        Ok(self
            .deps
            .store
            .list_passes_for_resident(&session.resident_id)?
            .iter()
            .map(|pass| PassView::of(pass, today))
            .collect())
    }

    /// Every pass, optionally only those visiting `on`. Staff and admins.
    pub fn all_passes(
        &self,
        session: &Session,
        on: Option<NaiveDate>,
    ) -> Result<Vec<PassView>, PassError> {
        check_staff(session)?;
        let today = self.today();
        Ok(self
            .deps
            .store
            .list_passes()?
            .iter()
            .filter(|pass| on.map_or(true, |date| pass.visit_date == date))
            .map(|pass| PassView::of(pass, today))
            .collect())
    }
}
