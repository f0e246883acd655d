//! HTTP API for the guest pass service.
//!
//! - Resident sessions (`/api/auth/session`) and bearer authentication
//! - Host actions: invite, register, approve, cancel, door QR
//! - Guest completion and verification polling
//! - Door staff check-in and check-out
//! - The signed identity-provider webhook

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;
pub mod webhook;

pub use auth::AuthSession;
pub use error::RpcError;
pub use handlers::Envelope;
pub use server::{create_app, RpcServer};
pub use state::{AppState, WebhookSettings};
