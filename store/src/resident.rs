//! Resident storage trait.

use crate::StoreError;
use guestpass_types::{Resident, ResidentId};

pub trait ResidentStore {
    fn get_resident(&self, id: &ResidentId) -> Result<Resident, StoreError>;

    /// Look up by the membership provider's identifier.
    fn find_resident_by_external_id(&self, external_id: &str)
        -> Result<Option<Resident>, StoreError>;

    /// Insert or replace.
    fn put_resident(&self, resident: &Resident) -> Result<(), StoreError>;
}
