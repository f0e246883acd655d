//! LMDB implementation of UsedTokenStore.
//!
//! The ledger entry and the pass update of a check-in share one write
//! transaction, so concurrent scans of the same token serialize on the LMDB
//! writer lock and exactly one of them commits.

use tracing::debug;

use guestpass_store::{StoreError, UsedTokenStore};
use guestpass_types::{Pass, PassId, UsedToken};

use crate::environment::{composite_key, encode};
use crate::{LmdbError, LmdbStore};

impl UsedTokenStore for LmdbStore {
    fn get_used_token(
        &self,
        pass_id: &PassId,
        token_id: &str,
    ) -> Result<Option<UsedToken>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.read(
            &self.used_tokens_db,
            &rtxn,
            &composite_key(pass_id.as_str(), token_id),
        )?)
    }

    fn record_check_in(
        &self,
        used: &UsedToken,
        pass: &Pass,
        expected_revision: u64,
    ) -> Result<Pass, StoreError> {
        if used.pass_id != pass.id {
            return Err(StoreError::Corruption(format!(
                "ledger entry for {} written with pass {}",
                used.pass_id, pass.id
            )));
        }
        let key = composite_key(used.pass_id.as_str(), &used.token_id);
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .used_tokens_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            debug!(pass_id = %used.pass_id, token_id = %used.token_id, "ledger entry exists");
            return Err(StoreError::Duplicate(format!(
                "token {} for pass {}",
                used.token_id, used.pass_id
            )));
        }
        let stored = self.put_pass_conditional(&mut wtxn, pass, expected_revision)?;
        self.used_tokens_db
            .put(&mut wtxn, &key, &encode(used)?)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(stored)
    }
}
