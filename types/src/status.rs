//! Lifecycle status of a guest pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Where a pass is in its lifecycle.
///
/// `Expired` is a read-time classification (see [`crate::Pass::effective_status`])
/// and is never written by the engine; it exists so views can report it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    /// Created by an invitation that predates the scheduled flow.
    Invited,
    /// Host registered the guest; waiting for the guest to confirm details.
    Registered,
    /// Guest submitted personal and ID info; identity check in progress.
    PendingVerification,
    /// Identity check passed; waiting for host approval.
    Approved,
    VerificationFailed,
    VerificationCanceled,
    /// Valid for entry on the visit date.
    Scheduled,
    CheckedIn,
    CheckedOut,
    Canceled,
    Expired,
}

impl PassStatus {
    pub const ALL: [PassStatus; 11] = [
        Self::Invited,
        Self::Registered,
        Self::PendingVerification,
        Self::Approved,
        Self::VerificationFailed,
        Self::VerificationCanceled,
        Self::Scheduled,
        Self::CheckedIn,
        Self::CheckedOut,
        Self::Canceled,
        Self::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invited => "invited",
            Self::Registered => "registered",
            Self::PendingVerification => "pending_verification",
            Self::Approved => "approved",
            Self::VerificationFailed => "verification_failed",
            Self::VerificationCanceled => "verification_canceled",
            Self::Scheduled => "scheduled",
            Self::CheckedIn => "checked_in",
            Self::CheckedOut => "checked_out",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
        }
    }

    /// No further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CheckedOut | Self::Canceled | Self::Expired)
    }

    /// The guest has not entered yet and the pass is still live. These are the
    /// states from which a pass can be canceled or classified as expired.
    pub fn is_pre_entry(&self) -> bool {
        !self.is_terminal() && !matches!(self, Self::CheckedIn)
    }

    /// States from which the guest may submit their registration.
    pub fn accepts_registration(&self) -> bool {
        matches!(self, Self::Invited | Self::Registered | Self::Scheduled)
    }
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| TypesError::UnknownStatus(s.to_string()))
    }
}
