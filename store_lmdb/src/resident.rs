//! LMDB implementation of ResidentStore.

use guestpass_store::{ResidentStore, StoreError};
use guestpass_types::{Resident, ResidentId};

use crate::environment::encode;
use crate::{LmdbError, LmdbStore};

impl ResidentStore for LmdbStore {
    fn get_resident(&self, id: &ResidentId) -> Result<Resident, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        self.read(&self.residents_db, &rtxn, id.as_str().as_bytes())?
            .ok_or_else(|| LmdbError::NotFound(format!("resident {id}")).into())
    }

    fn find_resident_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Resident>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let Some(id) = self
            .residents_by_external_db
            .get(&rtxn, external_id.as_bytes())
            .map_err(LmdbError::from)?
        else {
            return Ok(None);
        };
        Ok(self.read(&self.residents_db, &rtxn, id)?)
    }

    fn put_resident(&self, resident: &Resident) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = resident.id.as_str().as_bytes();
        if let Some(previous) = self.read::<Resident>(&self.residents_db, &wtxn, key)? {
            if previous.external_id != resident.external_id {
                self.residents_by_external_db
                    .delete(&mut wtxn, previous.external_id.as_bytes())
                    .map_err(LmdbError::from)?;
            }
        }
        self.residents_db
            .put(&mut wtxn, key, &encode(resident)?)
            .map_err(LmdbError::from)?;
        self.residents_by_external_db
            .put(&mut wtxn, resident.external_id.as_bytes(), key)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
