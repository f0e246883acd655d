//! Pass storage trait.

use crate::StoreError;
use guestpass_types::{Pass, PassId, ResidentId};

/// Pass records keyed by id.
///
/// Writes are conditional on `Pass::revision`. The store owns the counter:
/// a successful write stores and returns the record with the next revision.
pub trait PassStore {
    fn get_pass(&self, id: &PassId) -> Result<Pass, StoreError>;

    /// Insert a new pass at revision 1. `Duplicate` if the id is taken.
    fn insert_pass(&self, pass: &Pass) -> Result<Pass, StoreError>;

    /// Replace the pass if its stored revision still equals
    /// `expected_revision`, otherwise `Conflict`.
    fn update_pass(&self, pass: &Pass, expected_revision: u64) -> Result<Pass, StoreError>;

    /// Passes owned by `resident`, newest first.
    fn list_passes_for_resident(&self, resident: &ResidentId) -> Result<Vec<Pass>, StoreError>;

    /// All passes, newest first.
    fn list_passes(&self) -> Result<Vec<Pass>, StoreError>;

    fn pass_count(&self) -> Result<u64, StoreError> {
        self.list_passes().map(|v| v.len() as u64)
    }
}
