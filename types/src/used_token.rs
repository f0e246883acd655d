//! Used-token ledger entries.

use serde::{Deserialize, Serialize};

use crate::{PassId, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMethod {
    /// Short-lived signed QR shown on the guest's phone.
    SignedQr,
    /// Hash-bound QR embedded in a mobile-wallet pass.
    WalletQr,
}

/// Marks an access token as consumed. `(pass_id, token_id)` is unique.
///
/// Existence of an entry is a replay guard, not a permission grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedToken {
    pub pass_id: PassId,
    pub token_id: String,
    pub method: EntryMethod,
    pub used_at: Timestamp,
}
