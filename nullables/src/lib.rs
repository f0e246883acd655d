//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the engine (clock, storage, identity
//! provider, SMS, wallet signing, membership) is abstracted behind a trait.
//! This crate provides implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Record what they were asked to do
//! - Never touch the filesystem or network
//!
//! The in-memory store also backs the service's `memory` storage mode.

pub mod clock;
pub mod gateways;
pub mod store;

pub use clock::NullClock;
pub use gateways::{NullMembership, NullNotifier, NullVerificationGateway, NullWalletIssuer};
pub use store::NullStore;
