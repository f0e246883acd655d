//! LMDB storage backend for the guest pass service.
//!
//! Implements every trait from `guestpass-store` using the `heed` LMDB
//! bindings. Each logical store maps to one or more LMDB databases within a
//! single environment.

pub mod environment;
pub mod error;
pub mod pass;
pub mod resident;
pub mod used_token;

pub use environment::{LmdbStore, DEFAULT_MAP_SIZE};
pub use error::LmdbError;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use guestpass_types::{GuestIdentity, Pass, PassStatus, ResidentId, Timestamp};

    use crate::LmdbStore;

    pub fn open() -> (tempfile::TempDir, LmdbStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbStore::open(dir.path(), 16 << 20).unwrap();
        (dir, store)
    }

    pub fn pass(resident: &str, created: u64) -> Pass {
        Pass::new(
            ResidentId::parse(resident).unwrap(),
            GuestIdentity {
                name: "Ada".into(),
                email: Some("ada@example.com".into()),
                phone: None,
            },
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            PassStatus::Scheduled,
            Timestamp::new(created),
        )
    }
}
