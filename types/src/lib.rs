//! Fundamental types for the guest pass service.
//!
//! This crate defines the records shared across every other crate in the
//! workspace: pass and resident identifiers, the `Pass` record with its
//! per-stage extended data, the used-token ledger entry, timestamps and the
//! lifecycle status enum.

pub mod calendar;
pub mod error;
pub mod ids;
pub mod pass;
pub mod resident;
pub mod status;
pub mod time;
pub mod used_token;

pub use calendar::BuildingCalendar;
pub use error::TypesError;
pub use ids::{PassId, ResidentId};
pub use pass::{
    ExtendedData, GuestIdentity, IssuedWallet, Pass, PassKind, RegistrationRecord,
    VerificationOutcome, VerificationRecord, VisitDetails, WalletRecord,
};
pub use resident::{Resident, Role};
pub use status::PassStatus;
pub use time::Timestamp;
pub use used_token::{EntryMethod, UsedToken};
