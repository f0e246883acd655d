//! Used-token ledger trait.

use crate::StoreError;
use guestpass_types::{Pass, PassId, UsedToken};

pub trait UsedTokenStore {
    fn get_used_token(&self, pass_id: &PassId, token_id: &str)
        -> Result<Option<UsedToken>, StoreError>;

    /// Append `used` to the ledger and write `pass` in one atomic step.
    ///
    /// Nothing is written unless both succeed: `Duplicate` when the ledger
    /// already holds `(pass_id, token_id)`, `Conflict` when the pass
    /// revision moved past `expected_revision`.
    fn record_check_in(
        &self,
        used: &UsedToken,
        pass: &Pass,
        expected_revision: u64,
    ) -> Result<Pass, StoreError>;
}
