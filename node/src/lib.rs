//! Guest pass service wiring.
//!
//! Turns a [`ServiceConfig`] into a running service:
//! - Opens the pass store (LMDB or in-memory)
//! - Loads token, wallet and webhook secrets from the environment
//! - Connects the identity, SMS, wallet and membership gateways
//! - Serves the HTTP API until shutdown

pub mod config;
pub mod error;
pub mod gateways;
pub mod logging;
pub mod secrets;
pub mod service;
pub mod shutdown;

pub use config::{GatewayMode, ServiceConfig, StorageBackend};
pub use error::NodeError;
pub use gateways::Gateways;
pub use logging::{init_logging, LogFormat};
pub use secrets::{EnvSecrets, SecretSource};
pub use service::GuestPassService;
pub use shutdown::ShutdownController;
