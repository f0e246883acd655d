//! Record store interface for the guest pass service.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod error;
pub mod pass;
pub mod resident;
pub mod used_token;

pub use error::StoreError;
pub use pass::PassStore;
pub use resident::ResidentStore;
pub use used_token::UsedTokenStore;

/// Everything the lifecycle engine needs from a backend.
pub trait GuestPassStore: PassStore + ResidentStore + UsedTokenStore + Send + Sync {}

impl<T> GuestPassStore for T where T: PassStore + ResidentStore + UsedTokenStore + Send + Sync {}
