//! The pass state machine.
//!
//! `next_status` is the whole transition table. Guards that depend on more
//! than the status (nonces, visit day, ownership) live in `guards`.

use guestpass_types::PassStatus;

use crate::PassError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassEvent {
    /// Guest submitted personal and ID details.
    RegistrationSubmitted,
    VerificationSucceeded,
    /// Provider reported failure or that more input is needed.
    VerificationFailed,
    VerificationCanceled,
    HostApproved,
    HostRejected,
    CheckIn,
    CheckOut,
    Cancel,
}

impl PassEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegistrationSubmitted => "complete registration for",
            Self::VerificationSucceeded => "approve",
            Self::VerificationFailed => "fail verification of",
            Self::VerificationCanceled => "cancel verification of",
            Self::HostApproved => "schedule",
            Self::HostRejected => "reject",
            Self::CheckIn => "check in",
            Self::CheckOut => "check out",
            Self::Cancel => "cancel",
        }
    }
}

/// Status after `event`, or why the event does not apply to `from`.
///
/// `from` must be the effective status: a pass whose visit day has passed
/// arrives here as `Expired` and accepts nothing.
pub fn next_status(from: PassStatus, event: PassEvent) -> Result<PassStatus, PassError> {
    use PassEvent as E;
    use PassStatus as S;

    let to = match (from, event) {
        (s, E::RegistrationSubmitted) if s.accepts_registration() => S::PendingVerification,
        (S::PendingVerification, E::VerificationSucceeded) => S::Approved,
        (S::PendingVerification, E::VerificationFailed) => S::VerificationFailed,
        (S::PendingVerification, E::VerificationCanceled) => S::VerificationCanceled,
        (S::Approved, E::HostApproved) => S::Scheduled,
        (S::Approved, E::HostRejected) => S::Canceled,
        (S::Scheduled, E::CheckIn) => S::CheckedIn,
        (other, E::CheckIn) => return Err(PassError::PassNotScheduled(other)),
        (S::CheckedIn, E::CheckOut) => S::CheckedOut,
        (s, E::Cancel) if s.is_pre_entry() => S::Canceled,
        (from, event) => {
            return Err(PassError::InvalidTransition {
                from,
                event: event.as_str(),
            })
        }
    };
    Ok(to)
}
