//! Transition guards. Each returns `Ok(())` or the reason the transition is
//! refused; the engine composes them in a fixed order per operation.

use chrono::NaiveDate;

use guestpass_types::{Pass, PassStatus, Role};

use crate::{PassError, Session};

/// Compare the token's nonce with the one stored on the pass.
///
/// Tokens minted before nonces existed carry none. They are accepted while
/// the pass holds no nonce and no registration has been recorded, which
/// makes them usable once.
pub fn check_nonce(pass: &Pass, presented: Option<&str>) -> Result<(), PassError> {
    match (presented, pass.extended.pending_nonce.as_deref()) {
        (Some(presented), Some(stored)) if constant_time_eq(presented, stored) => Ok(()),
        (Some(_), _) => Err(PassError::InvalidOrUsedToken),
        (None, None) if !pass.registration_completed() => Ok(()),
        (None, _) => Err(PassError::InvalidOrUsedToken),
    }
}

/// The token must name the resident that owns the pass.
pub fn check_token_host(pass: &Pass, host: Option<&str>) -> Result<(), PassError> {
    match host {
        Some(host) if host == pass.resident_id.as_str() => Ok(()),
        Some(_) => Err(PassError::TokenInvalid("token host does not own the pass".into())),
        None => Err(PassError::TokenInvalid("token names no host".into())),
    }
}

/// Registration may be completed once, from a pre-verification status.
pub fn check_registration_open(pass: &Pass, today: NaiveDate) -> Result<(), PassError> {
    if pass.registration_completed() {
        return Err(PassError::InvalidOrUsedToken);
    }
    let status = pass.effective_status(today);
    if !status.accepts_registration() {
        return Err(PassError::InvalidTransition {
            from: status,
            event: "complete registration for",
        });
    }
    Ok(())
}

pub fn check_visit_day(pass: &Pass, today: NaiveDate) -> Result<(), PassError> {
    if pass.visit_date != today {
        return Err(PassError::WrongDay {
            visit_date: pass.visit_date,
            today,
        });
    }
    Ok(())
}

pub fn check_scheduled(pass: &Pass) -> Result<(), PassError> {
    if pass.status != PassStatus::Scheduled {
        return Err(PassError::PassNotScheduled(pass.status));
    }
    Ok(())
}

/// The owning resident, or an admin.
pub fn check_owner_or_admin(pass: &Pass, session: &Session) -> Result<(), PassError> {
    if pass.is_owned_by(&session.resident_id) || session.role == Role::Admin {
        return Ok(());
    }
    Err(PassError::Forbidden("pass belongs to another resident".into()))
}

/// Door staff, or the owning resident.
pub fn check_can_view(pass: &Pass, session: &Session) -> Result<(), PassError> {
    if pass.is_owned_by(&session.resident_id) || session.role.can_scan() {
        return Ok(());
    }
    Err(PassError::Forbidden("pass belongs to another resident".into()))
}

pub fn check_staff(session: &Session) -> Result<(), PassError> {
    if session.role.can_scan() {
        return Ok(());
    }
    Err(PassError::Forbidden("staff role required".into()))
}

/// A wallet payload must bind the pass's own resident and guest email.
pub fn check_wallet_binding(
    pass: &Pass,
    resident_id: &str,
    guest_email: &str,
) -> Result<(), PassError> {
    let bound_email = pass.guest.email.as_deref().unwrap_or_default();
    if resident_id != pass.resident_id.as_str() || guest_email != bound_email {
        return Err(PassError::TokenInvalid(
            "wallet payload does not match the pass".into(),
        ));
    }
    Ok(())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}
