use std::sync::Arc;

use guestpass_crypto::DEFAULT_TOLERANCE_SECS;
use guestpass_lifecycle::PassEngine;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PassEngine>,
    pub webhook: Arc<WebhookSettings>,
}

#[derive(Clone, Debug)]
pub struct WebhookSettings {
    /// `None` when the secret is not configured; deliveries are then refused.
    pub secret: Option<Vec<u8>>,
    pub tolerance_secs: u64,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            secret: None,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }
}

impl AppState {
    pub fn new(engine: Arc<PassEngine>, webhook: WebhookSettings) -> Self {
        Self {
            engine,
            webhook: Arc::new(webhook),
        }
    }
}
