use std::time::Duration;

use guestpass_crypto::Audience;
use guestpass_types::BuildingCalendar;

/// Engine tunables. Token lifetimes are in seconds.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Base of the links sent to guests, without a trailing slash.
    pub public_base_url: String,
    pub building_code: Option<String>,
    pub calendar: BuildingCalendar,
    pub door_ttl_secs: u64,
    pub prereg_ttl_secs: u64,
    pub verification_ttl_secs: u64,
    pub session_ttl_secs: u64,
    /// Upper bound on every call to an external collaborator.
    pub call_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8080".to_string(),
            building_code: None,
            calendar: BuildingCalendar::utc(),
            door_ttl_secs: Audience::DoorScanner.default_ttl_secs(),
            prereg_ttl_secs: Audience::GuestPrereg.default_ttl_secs(),
            verification_ttl_secs: Audience::GuestVerification.default_ttl_secs(),
            session_ttl_secs: Audience::ResidentSession.default_ttl_secs(),
            call_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    pub fn link(&self, path: &str, token: &str) -> String {
        format!(
            "{}/{}?token={}",
            self.public_base_url.trim_end_matches('/'),
            path.trim_start_matches('/'),
            token
        )
    }
}
