//! LMDB implementation of PassStore.
//!
//! Passes are keyed by id. A secondary `resident_passes` database keyed by
//! `resident_id \0 pass_id` makes per-resident listing a prefix scan.

use heed::RwTxn;

use guestpass_store::{PassStore, StoreError};
use guestpass_types::{Pass, PassId, ResidentId};

use crate::environment::{composite_key, decode, encode};
use crate::{LmdbError, LmdbStore};

fn newest_first(passes: &mut [Pass]) {
    passes.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });
}

impl LmdbStore {
    /// Write `pass` at `expected_revision + 1` inside an open transaction.
    pub(crate) fn put_pass_conditional(
        &self,
        wtxn: &mut RwTxn<'_>,
        pass: &Pass,
        expected_revision: u64,
    ) -> Result<Pass, StoreError> {
        let key = pass.id.as_str().as_bytes();
        let current: Pass = self
            .read(&self.passes_db, wtxn, key)?
            .ok_or_else(|| StoreError::NotFound(format!("pass {}", pass.id)))?;
        if current.revision != expected_revision {
            return Err(StoreError::Conflict(format!(
                "pass {} at revision {}, expected {}",
                pass.id, current.revision, expected_revision
            )));
        }
        if current.resident_id != pass.resident_id {
            return Err(StoreError::Corruption(format!(
                "pass {} changed owner",
                pass.id
            )));
        }
        let mut stored = pass.clone();
        stored.revision = expected_revision + 1;
        self.passes_db
            .put(wtxn, key, &encode(&stored)?)
            .map_err(LmdbError::from)?;
        Ok(stored)
    }
}

impl PassStore for LmdbStore {
    fn get_pass(&self, id: &PassId) -> Result<Pass, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        self.read(&self.passes_db, &rtxn, id.as_str().as_bytes())?
            .ok_or_else(|| LmdbError::NotFound(format!("pass {id}")).into())
    }

    fn insert_pass(&self, pass: &Pass) -> Result<Pass, StoreError> {
        let key = pass.id.as_str().as_bytes();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .passes_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!("pass {}", pass.id)));
        }
        let mut stored = pass.clone();
        stored.revision = 1;
        self.passes_db
            .put(&mut wtxn, key, &encode(&stored)?)
            .map_err(LmdbError::from)?;
        self.resident_passes_db
            .put(
                &mut wtxn,
                &composite_key(pass.resident_id.as_str(), pass.id.as_str()),
                &[],
            )
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(stored)
    }

    fn update_pass(&self, pass: &Pass, expected_revision: u64) -> Result<Pass, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let stored = self.put_pass_conditional(&mut wtxn, pass, expected_revision)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(stored)
    }

    fn list_passes_for_resident(&self, resident: &ResidentId) -> Result<Vec<Pass>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = composite_key(resident.as_str(), "");
        let mut passes = Vec::new();
        for entry in self
            .resident_passes_db
            .prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?
        {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let pass_id = &key[prefix.len()..];
            let pass: Pass = self.read(&self.passes_db, &rtxn, pass_id)?.ok_or_else(|| {
                StoreError::Corruption(format!(
                    "index names missing pass {}",
                    String::from_utf8_lossy(pass_id)
                ))
            })?;
            passes.push(pass);
        }
        newest_first(&mut passes);
        Ok(passes)
    }

    fn list_passes(&self) -> Result<Vec<Pass>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut passes = Vec::new();
        for entry in self.passes_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (_, bytes) = entry.map_err(LmdbError::from)?;
            passes.push(decode::<Pass>(bytes)?);
        }
        newest_first(&mut passes);
        Ok(passes)
    }

    fn pass_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.passes_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{open, pass};
    use guestpass_types::PassStatus;

    #[test]
    fn insert_then_get() {
        let (_dir, store) = open();
        let p = pass("res-1", 10);
        let stored = store.insert_pass(&p).unwrap();
        assert_eq!(stored.revision, 1);
        assert_eq!(store.get_pass(&p.id).unwrap(), stored);
        assert!(matches!(
            store.insert_pass(&p),
            Err(StoreError::Duplicate(_))
        ));
    }

    #[test]
    fn missing_pass_is_not_found() {
        let (_dir, store) = open();
        assert!(matches!(
            store.get_pass(&PassId::parse("nope").unwrap()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn update_is_conditional_on_revision() {
        let (_dir, store) = open();
        let stored = store.insert_pass(&pass("res-1", 10)).unwrap();

        let mut first = stored.clone();
        first.status = PassStatus::CheckedIn;
        let written = store.update_pass(&first, stored.revision).unwrap();
        assert_eq!(written.revision, 2);

        let mut stale = stored.clone();
        stale.status = PassStatus::Canceled;
        assert!(matches!(
            store.update_pass(&stale, stored.revision),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(
            store.get_pass(&stored.id).unwrap().status,
            PassStatus::CheckedIn
        );
    }

    #[test]
    fn listings_are_newest_first_and_scoped() {
        let (_dir, store) = open();
        let old = store.insert_pass(&pass("res-1", 10)).unwrap();
        let new = store.insert_pass(&pass("res-1", 20)).unwrap();
        let other = store.insert_pass(&pass("res-10", 30)).unwrap();

        let mine = store
            .list_passes_for_resident(&ResidentId::parse("res-1").unwrap())
            .unwrap();
        assert_eq!(mine, vec![new.clone(), old.clone()]);

        let all = store.list_passes().unwrap();
        assert_eq!(all, vec![other, new, old]);
        assert_eq!(store.pass_count().unwrap(), 3);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = LmdbStore::open(dir.path(), 16 << 20).unwrap();
            store.insert_pass(&pass("res-1", 10)).unwrap().id
        };
        let store = LmdbStore::open(dir.path(), 16 << 20).unwrap();
        assert_eq!(store.get_pass(&id).unwrap().revision, 1);
    }
}
