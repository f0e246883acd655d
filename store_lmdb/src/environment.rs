//! LMDB environment setup.
//!
//! All records live in one environment so that a check-in can append to the
//! used-token ledger and rewrite the pass inside a single write transaction.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::LmdbError;

const MAX_DBS: u32 = 8;

pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Handle to the environment and every database in it. Cheap to clone.
#[derive(Clone)]
pub struct LmdbStore {
    pub(crate) env: Arc<Env>,
    /// pass id -> bincode `Pass`
    pub(crate) passes_db: Database<Bytes, Bytes>,
    /// `resident_id \0 pass_id` -> empty
    pub(crate) resident_passes_db: Database<Bytes, Bytes>,
    /// resident id -> bincode `Resident`
    pub(crate) residents_db: Database<Bytes, Bytes>,
    /// membership external id -> resident id
    pub(crate) residents_by_external_db: Database<Bytes, Bytes>,
    /// `pass_id \0 token_id` -> bincode `UsedToken`
    pub(crate) used_tokens_db: Database<Bytes, Bytes>,
}

impl LmdbStore {
    /// Open or create an LMDB environment at the given directory.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Heed(e.to_string()))?;
        // SAFETY: the environment is opened once per process and the
        // directory is not shared with other LMDB users.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let passes_db = env.create_database(&mut wtxn, Some("passes"))?;
        let resident_passes_db = env.create_database(&mut wtxn, Some("resident_passes"))?;
        let residents_db = env.create_database(&mut wtxn, Some("residents"))?;
        let residents_by_external_db =
            env.create_database(&mut wtxn, Some("residents_by_external"))?;
        let used_tokens_db = env.create_database(&mut wtxn, Some("used_tokens"))?;
        wtxn.commit()?;

        info!(path = %path.display(), map_size, "opened LMDB store");

        Ok(Self {
            env: Arc::new(env),
            passes_db,
            resident_passes_db,
            residents_db,
            residents_by_external_db,
            used_tokens_db,
        })
    }

    pub(crate) fn read<T: DeserializeOwned>(
        &self,
        db: &Database<Bytes, Bytes>,
        rtxn: &RoTxn<'_>,
        key: &[u8],
    ) -> Result<Option<T>, LmdbError> {
        match db.get(rtxn, key)? {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Composite key `a ++ \0 ++ b`. Ids never contain NUL.
pub(crate) fn composite_key(a: &str, b: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(a.len() + b.len() + 1);
    key.extend_from_slice(a.as_bytes());
    key.push(0);
    key.extend_from_slice(b.as_bytes());
    key
}
